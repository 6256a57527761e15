//! Strategy planning: turn a content profile, document length and quality
//! mode into the parameters of one pipeline run.

use docagent_core::{QualityMode, SummarizerSettings};
use docagent_text::{ContentProfile, ContentType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    /// One extraction and one generation over the whole document.
    Direct,
    /// Per-chunk passes followed by hierarchical re-summarization.
    Chunked,
}

impl std::fmt::Display for Approach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Chunked => write!(f, "chunked"),
        }
    }
}

/// Parameters of one summarization run. Derived deterministically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStrategy {
    pub approach: Approach,
    /// Chunk budget in characters.
    pub chunk_size: usize,
    /// Planned chunk count (1 on the direct path).
    pub num_chunks: usize,
    /// Sentences requested from each extractive pass.
    pub extractive_sentence_count: usize,
    /// Widen the extraction when it yields too little text.
    pub refine: bool,
    /// Try keyword-constrained decoding first.
    pub use_constrained: bool,
    pub quality_mode: QualityMode,
}

/// Plan a run over a cleaned document of `text_len` characters.
pub fn plan(
    profile: &ContentProfile,
    text_len: usize,
    mode: QualityMode,
    use_chunking: bool,
    settings: &SummarizerSettings,
) -> ProcessingStrategy {
    let chunk_size = settings.max_chunk_size.max(1);
    let chunked = use_chunking && text_len > settings.chunking_threshold();

    // Academic text packs more per sentence; ask for one fewer
    let (low, high) = mode.sentence_bounds();
    let base = mode.extractive_sentences();
    let count = match profile.content_type {
        ContentType::Academic => base.saturating_sub(1),
        _ => base,
    }
    .clamp(low, high);

    ProcessingStrategy {
        approach: if chunked { Approach::Chunked } else { Approach::Direct },
        chunk_size,
        num_chunks: if chunked { (text_len / chunk_size).max(2) } else { 1 },
        extractive_sentence_count: count,
        refine: mode.refine(),
        use_constrained: mode.constrained(),
        quality_mode: mode,
    }
}
