//! Sentence-aligned text chunking.
//!
//! Chunks never split a sentence. `DocumentChunker` packs sentences greedily
//! under a character budget for the summarizer; `OverlappingChunker` builds
//! larger chunks for question answering and repeats the trailing sentences
//! of each chunk at the start of the next so answers spanning a boundary
//! are still found.

use serde::Serialize;

use crate::sentences::{sentence_spans, SentenceSpan};

/// Default summarizer chunk budget (characters).
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default question-answering chunk budget (characters).
pub const DEFAULT_QA_CHUNK_SIZE: usize = 1500;
/// Sentences repeated between consecutive QA chunks.
pub const DEFAULT_OVERLAP_SENTENCES: usize = 2;

/// A contiguous run of whole sentences.
///
/// `text` is the source slice `[start_offset, end_offset)`, so byte offsets
/// found inside a chunk map back to the source by adding `start_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub sentence_count: usize,
}

impl Chunk {
    fn from_spans(source: &str, spans: &[SentenceSpan<'_>]) -> Option<Self> {
        let (first, last) = (spans.first()?, spans.last()?);
        Some(Self {
            text: source[first.start..last.end].to_string(),
            start_offset: first.start,
            end_offset: last.end,
            sentence_count: spans.len(),
        })
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn span_chars(source: &str, first: &SentenceSpan<'_>, last: &SentenceSpan<'_>) -> usize {
    source[first.start..last.end].chars().count()
}

/// Greedy sentence packer for the summarization pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentChunker;

impl DocumentChunker {
    pub fn new() -> Self {
        Self
    }

    /// Pack sentences in order, closing a chunk when the next sentence would
    /// push it past `max_chars`. A sentence longer than the budget becomes a
    /// chunk of its own.
    pub fn chunk(&self, text: &str, max_chars: usize) -> Vec<Chunk> {
        let spans = sentence_spans(text);
        let mut chunks = Vec::new();
        let mut run_start = 0;

        for i in 0..spans.len() {
            if i > run_start && span_chars(text, &spans[run_start], &spans[i]) > max_chars {
                chunks.extend(Chunk::from_spans(text, &spans[run_start..i]));
                run_start = i;
            }
        }
        chunks.extend(Chunk::from_spans(text, &spans[run_start..]));

        tracing::debug!(
            "Chunked {} sentences into {} chunks (max {} chars)",
            spans.len(),
            chunks.len(),
            max_chars
        );
        chunks
    }
}

/// Sentence-aligned chunker with sentence overlap, for question answering.
#[derive(Debug, Clone, Copy)]
pub struct OverlappingChunker {
    pub chunk_size: usize,
    pub overlap_sentences: usize,
}

impl OverlappingChunker {
    pub fn new(chunk_size: usize, overlap_sentences: usize) -> Self {
        Self {
            chunk_size,
            overlap_sentences,
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let spans = sentence_spans(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < spans.len() {
            let mut end = start + 1;
            while end < spans.len()
                && span_chars(text, &spans[start], &spans[end]) <= self.chunk_size
            {
                end += 1;
            }
            chunks.extend(Chunk::from_spans(text, &spans[start..end]));
            if end >= spans.len() {
                break;
            }
            // Always advance by at least one sentence
            start = end.saturating_sub(self.overlap_sentences).max(start + 1);
        }
        chunks
    }
}

impl Default for OverlappingChunker {
    fn default() -> Self {
        Self::new(DEFAULT_QA_CHUNK_SIZE, DEFAULT_OVERLAP_SENTENCES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentences::split_sentences;

    fn sample(n: usize) -> String {
        (0..n)
            .map(|i| format!("Sentence number {} talks about a separate idea.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = DocumentChunker::new().chunk("Hello, world! Bye.", 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world! Bye.");
        assert_eq!(chunks[0].sentence_count, 2);
    }

    #[test]
    fn test_empty_text() {
        assert!(DocumentChunker::new().chunk("   ", 100).is_empty());
        assert!(OverlappingChunker::default().chunk("").is_empty());
    }

    #[test]
    fn test_sentences_partitioned_in_order() {
        let text = sample(40);
        let chunks = DocumentChunker::new().chunk(&text, 200);
        assert!(chunks.len() > 1);

        let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| split_sentences(&c.text)).collect();
        assert_eq!(rebuilt, split_sentences(&text));

        for c in &chunks {
            assert!(c.len() <= 200);
            assert_eq!(&text[c.start_offset..c.end_offset], c.text);
        }
    }

    #[test]
    fn test_oversized_sentence_is_own_chunk() {
        let long = format!("{} end.", "word ".repeat(60));
        let text = format!("Short one. {} Short two.", long);
        let chunks = DocumentChunker::new().chunk(&text, 50);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].sentence_count, 1);
        assert!(chunks[1].len() > 50);
    }

    #[test]
    fn test_overlap_repeats_trailing_sentences() {
        let text = sample(30);
        let chunker = OverlappingChunker::new(300, 2);
        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev = split_sentences(&pair[0].text);
            let next = split_sentences(&pair[1].text);
            assert_eq!(&prev[prev.len() - 2..], &next[..2]);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.end_offset, text.len());
    }

    #[test]
    fn test_overlap_always_progresses() {
        let text = format!("{}. {}. Tail.", "a".repeat(500), "b".repeat(500));
        let chunks = OverlappingChunker::new(100, 2).chunk(&text);
        assert_eq!(chunks.len(), 3);
    }
}
