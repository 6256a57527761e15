//! Sentence embedding trait and the model-free fallback.
//!
//! Implementations:
//! - `OnnxEmbedder`: ONNX Runtime sentence-transformer (requires `onnx` feature)
//! - `HashingEmbedder`: deterministic hashed bag-of-words vectors, used when no
//!   model is installed

use docagent_core::Result;
use ndarray::Array1;
use sha2::{Digest, Sha256};

use crate::cache::BoundedCache;

/// Result of an embedding operation.
pub struct EmbeddingResult {
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    fn embed(&self, text: &str) -> Result<EmbeddingResult>;

    /// Generate embeddings for a batch of texts. Each text fails independently.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Result<EmbeddingResult>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Whether a trained model backs this embedder.
    fn is_available(&self) -> bool;
}

/// Default dimension of the hashing fallback.
pub const HASHING_DIM: usize = 256;

/// Feature-hashing embedder over lowercased word unigrams and bigrams.
///
/// Sentences sharing vocabulary get high cosine similarity, which is enough
/// for centrality and connectivity scoring without a neural model.
pub struct HashingEmbedder {
    dim: usize,
    cache: BoundedCache<Array1<f32>>,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            cache: BoundedCache::new(1000),
        }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let idx = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]);
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        ((idx % self.dim as u64) as usize, sign)
    }

    fn vectorize(&self, text: &str) -> Array1<f32> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut v = Array1::<f32>::zeros(self.dim);
        for t in &tokens {
            let (i, s) = self.bucket(t);
            v[i] += s;
        }
        for pair in tokens.windows(2) {
            let (i, s) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            v[i] += 0.5 * s;
        }

        let norm = v.dot(&v).sqrt();
        if norm > 0.0 {
            v / norm
        } else {
            v
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(HASHING_DIM)
    }
}

impl EmbedderBackend for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(EmbeddingResult {
                embedding: cached,
                cached: true,
            });
        }
        let embedding = self.vectorize(text);
        self.cache.put(text.to_string(), embedding.clone());
        Ok(EmbeddingResult {
            embedding,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let na = a.dot(a).sqrt();
    let nb = b.dot(b).sqrt();
    if na == 0.0 || nb == 0.0 || a.len() != b.len() {
        return 0.0;
    }
    a.dot(b) / (na * nb)
}
