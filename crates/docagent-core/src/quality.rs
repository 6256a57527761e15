//! Quality mode: the single externally tunable knob of the summarizer.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Speed/quality tradeoff requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Few extracted sentences, no refinement pass.
    Fast,
    /// Default tradeoff.
    #[default]
    Balanced,
    /// More extracted sentences, refinement and keyword-constrained decoding.
    High,
}

impl QualityMode {
    /// Number of sentences the extractive pass is asked for.
    pub fn extractive_sentences(self) -> usize {
        match self {
            Self::Fast => 3,
            Self::Balanced => 5,
            Self::High => 8,
        }
    }

    /// Whether the extraction-expansion refinement pass runs.
    pub fn refine(self) -> bool {
        !matches!(self, Self::Fast)
    }

    /// Whether generation attempts keyword-constrained decoding first.
    pub fn constrained(self) -> bool {
        matches!(self, Self::High)
    }

    /// Inclusive bounds any requested extractive sentence count must respect.
    pub fn sentence_bounds(self) -> (usize, usize) {
        match self {
            Self::Fast => (1, 3),
            Self::Balanced => (4, 6),
            Self::High => (7, usize::MAX),
        }
    }
}

impl std::fmt::Display for QualityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Balanced => write!(f, "balanced"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for QualityMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" | "" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            other => Err(crate::Error::Input(format!("unknown quality mode: {}", other))),
        }
    }
}
