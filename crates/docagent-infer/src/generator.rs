//! Sequence-to-sequence generation collaborator.

use docagent_core::Result;
use serde::{Deserialize, Serialize};

/// Decoding parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Maximum generated tokens.
    pub max_length: usize,
    /// Minimum generated tokens before end-of-sequence is allowed.
    pub min_length: usize,
    pub num_beams: usize,
    /// Exponent applied to hypothesis length when ranking finished beams.
    pub length_penalty: f32,
    /// Forbid repeating any n-gram of this size (0 disables).
    pub no_repeat_ngram_size: usize,
    /// Words every finished hypothesis must contain. Empty for free decoding.
    pub force_words: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, min_length: usize, max_length: usize) -> Self {
        Self {
            prompt: prompt.into(),
            max_length: max_length.max(1),
            min_length: min_length.min(max_length),
            num_beams: 4,
            length_penalty: 2.0,
            no_repeat_ngram_size: 3,
            force_words: Vec::new(),
        }
    }

    pub fn is_constrained(&self) -> bool {
        !self.force_words.is_empty()
    }
}

/// Trait for text generation backends.
pub trait GeneratorBackend: Send + Sync {
    /// Generate text for the request. Constrained requests that the backend
    /// cannot honor must fail rather than silently ignore the constraints.
    fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Short backend label for logs.
    fn name(&self) -> &str;
}
