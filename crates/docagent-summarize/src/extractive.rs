//! Extractive Selector — scores sentences and keeps the best ones in
//! document order.
//!
//! Each sentence gets a weighted sum of six signals: position, length fit,
//! semantic centrality (embedding similarity to the centroid), lexical
//! diversity, entity density and connectivity to its neighbours.

use std::sync::Arc;

use docagent_core::{Error, Result};
use docagent_infer::{cosine_similarity, EmbedderBackend};
use docagent_text::keywords::{rank_keywords, DEFAULT_KEYWORD_COUNT};
use docagent_text::lexical::{entity_density, lexical_diversity};
use docagent_text::split_sentences;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sentence length (in words) that gets the full length-fit score.
pub const OPTIMAL_SENTENCE_WORDS: f64 = 17.5;

/// Over-extraction never hands the generator fewer sentences than this.
pub const DEFAULT_MIN_CONTEXT_SENTENCES: usize = 5;

/// Weights of the six sentence-scoring signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub position: f64,
    pub length: f64,
    pub centrality: f64,
    pub lexical: f64,
    pub entity: f64,
    pub connectivity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            position: 0.25,
            length: 0.15,
            centrality: 0.35,
            lexical: 0.12,
            entity: 0.13,
            connectivity: 0.10,
        }
    }
}

/// Output of one extractive pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Selected sentences joined in document order.
    pub text: String,
    /// Keywords ranked over the selected sentences.
    pub keywords: Vec<String>,
    /// Indices of the selected sentences, ascending.
    pub selected_indices: Vec<usize>,
    pub total_sentences: usize,
    /// True when the document was short enough to pass through unscored.
    pub short_circuited: bool,
}

pub struct ExtractiveSelector {
    embedder: Arc<dyn EmbedderBackend>,
    weights: ScoringWeights,
    keyword_count: usize,
    min_context: usize,
}

impl ExtractiveSelector {
    pub fn new(embedder: Arc<dyn EmbedderBackend>) -> Self {
        Self {
            embedder,
            weights: ScoringWeights::default(),
            keyword_count: DEFAULT_KEYWORD_COUNT,
            min_context: DEFAULT_MIN_CONTEXT_SENTENCES,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_keyword_count(mut self, keyword_count: usize) -> Self {
        self.keyword_count = keyword_count.max(1);
        self
    }

    pub fn with_min_context(mut self, min_context: usize) -> Self {
        self.min_context = min_context;
        self
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Select about `target` sentences from `text`.
    ///
    /// With `over_extract`, up to twice the target (and at least
    /// `min_context` sentences) are kept so the generator sees enough
    /// material. Documents with at most `target` sentences are returned
    /// verbatim.
    pub fn select(&self, text: &str, target: usize, over_extract: bool) -> Result<ExtractionResult> {
        let sentences = split_sentences(text);
        let n = sentences.len();
        if n == 0 {
            return Err(Error::Input("no sentences to extract from".into()));
        }
        let target = target.max(1);

        if n <= target {
            debug!("Extraction short-circuit: {} sentences <= target {}", n, target);
            return Ok(ExtractionResult {
                text: text.to_string(),
                keywords: rank_keywords(&sentences, self.keyword_count),
                selected_indices: (0..n).collect(),
                total_sentences: n,
                short_circuited: true,
            });
        }

        let embeddings = self.embed_sentences(&sentences);
        let scores = self.score(&sentences, &embeddings);

        let extract_count = if over_extract {
            (target * 2).min(n).max(self.min_context.min(n))
        } else {
            target
        };

        let mut ranked: Vec<usize> = (0..n).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        let mut selected: Vec<usize> = ranked.into_iter().take(extract_count).collect();
        selected.sort_unstable();

        // Keep the opening sentence when it scored above average
        let mean = scores.iter().sum::<f64>() / n as f64;
        if n > 3 && !selected.contains(&0) && scores[0] > mean {
            selected.insert(0, 0);
        }

        let chosen: Vec<&str> = selected.iter().map(|&i| sentences[i]).collect();
        debug!("Extracted {}/{} sentences", chosen.len(), n);

        Ok(ExtractionResult {
            text: chosen.join(" "),
            keywords: rank_keywords(&chosen, self.keyword_count),
            selected_indices: selected,
            total_sentences: n,
            short_circuited: false,
        })
    }

    fn embed_sentences(&self, sentences: &[&str]) -> Vec<Array1<f32>> {
        let dim = self.embedder.dimension();
        self.embedder
            .embed_batch(sentences)
            .into_iter()
            .enumerate()
            .map(|(i, result)| match result {
                Ok(r) if r.embedding.len() == dim => r.embedding,
                Ok(r) => {
                    warn!(
                        "Sentence {} embedding has dimension {} (expected {}); using zero vector",
                        i,
                        r.embedding.len(),
                        dim
                    );
                    Array1::zeros(dim)
                }
                Err(e) => {
                    warn!("Embedding failed for sentence {}: {}; using zero vector", i, e);
                    Array1::zeros(dim)
                }
            })
            .collect()
    }

    /// Weighted score of every sentence.
    pub fn score(&self, sentences: &[&str], embeddings: &[Array1<f32>]) -> Vec<f64> {
        let n = sentences.len();
        let w = &self.weights;
        let centrality = centrality_scores(embeddings);
        let connectivity = connectivity_scores(embeddings);

        (0..n)
            .map(|i| {
                position_score(i, n) * w.position
                    + length_score(sentences[i]) * w.length
                    + centrality[i] * w.centrality
                    + lexical_diversity(sentences[i]) * w.lexical
                    + entity_density(sentences[i]) * w.entity
                    + connectivity[i] * w.connectivity
            })
            .collect()
    }
}

/// 1.2 for the opening sentence, 1.1 for the closing one, otherwise a
/// Gaussian centred on the middle of the document.
pub fn position_score(i: usize, n: usize) -> f64 {
    if i == 0 {
        return 1.2;
    }
    if i + 1 == n {
        return 1.1;
    }
    let center = (n / 2) as f64;
    let spread = (n / 3).max(1) as f64;
    let z = (i as f64 - center) / spread;
    (-0.5 * z * z).exp()
}

/// Linear decay with distance from [`OPTIMAL_SENTENCE_WORDS`], clipped to
/// `[0.1, 1]`.
pub fn length_score(sentence: &str) -> f64 {
    let words = sentence.split_whitespace().count() as f64;
    (1.0 - (words - OPTIMAL_SENTENCE_WORDS).abs() / OPTIMAL_SENTENCE_WORDS).clamp(0.1, 1.0)
}

fn centrality_scores(embeddings: &[Array1<f32>]) -> Vec<f64> {
    let n = embeddings.len();
    let Some(first) = embeddings.first() else {
        return Vec::new();
    };
    let mut centroid = Array1::<f32>::zeros(first.len());
    for e in embeddings {
        centroid += e;
    }
    centroid /= n as f32;

    let to_centroid: Vec<f64> = embeddings
        .iter()
        .map(|e| cosine_similarity(e, &centroid) as f64)
        .collect();
    if n <= 2 {
        return to_centroid;
    }

    let last = &embeddings[n - 1];
    embeddings
        .iter()
        .zip(to_centroid)
        .map(|(e, c)| {
            c * 0.6
                + cosine_similarity(e, first) as f64 * 0.2
                + cosine_similarity(e, last) as f64 * 0.2
        })
        .collect()
}

fn connectivity_scores(embeddings: &[Array1<f32>]) -> Vec<f64> {
    let n = embeddings.len();
    if n < 3 {
        return vec![0.5; n];
    }
    let mut scores = vec![0.0f64; n];
    for i in 0..n - 1 {
        let sim = cosine_similarity(&embeddings[i], &embeddings[i + 1]) as f64;
        scores[i] += sim * 0.6;
        scores[i + 1] += sim * 0.4;
    }
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        for s in &mut scores {
            *s /= max;
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use docagent_infer::{EmbeddingResult, HashingEmbedder};

    struct BrokenEmbedder;

    impl EmbedderBackend for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<EmbeddingResult> {
            Err(Error::Inference("degenerate tensor".into()))
        }
        fn dimension(&self) -> usize {
            8
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    fn selector() -> ExtractiveSelector {
        ExtractiveSelector::new(Arc::new(HashingEmbedder::default()))
    }

    fn document(n: usize) -> String {
        (0..n)
            .map(|i| format!("Glaciers in region {} retreat as summer melting accelerates each decade.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_document_passes_through() {
        let text = "Photosynthesis converts light into chemical energy. Chlorophyll absorbs light.";
        let result = selector().select(text, 5, true).unwrap();
        assert!(result.short_circuited);
        assert_eq!(result.text, text);
        assert!(!result.keywords.is_empty());
        assert_eq!(result.selected_indices, vec![0, 1]);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(selector().select("   ", 3, false), Err(Error::Input(_))));
    }

    #[test]
    fn test_selection_keeps_document_order() {
        let text = document(20);
        let result = selector().select(&text, 4, false).unwrap();
        assert!(!result.short_circuited);
        assert!(result.selected_indices.windows(2).all(|w| w[0] < w[1]));

        let sentences = split_sentences(&text);
        let expected: Vec<&str> = result.selected_indices.iter().map(|&i| sentences[i]).collect();
        assert_eq!(result.text, expected.join(" "));
    }

    #[test]
    fn test_extraction_counts() {
        let text = document(20);
        let exact = selector().select(&text, 4, false).unwrap();
        assert!(exact.selected_indices.len() == 4 || exact.selected_indices.len() == 5);

        // Over-extraction doubles the request
        let over = selector().select(&text, 4, true).unwrap();
        assert!(over.selected_indices.len() >= 8);

        // ...and never goes below the context minimum
        let small = selector().select(&text, 1, true).unwrap();
        assert!(small.selected_indices.len() >= DEFAULT_MIN_CONTEXT_SENTENCES);
    }

    #[test]
    fn test_embedding_failure_uses_zero_vectors() {
        let selector = ExtractiveSelector::new(Arc::new(BrokenEmbedder));
        let result = selector.select(&document(10), 3, false).unwrap();
        assert!(!result.text.is_empty());
        assert_eq!(result.total_sentences, 10);
    }

    #[test]
    fn test_position_score_shape() {
        assert_eq!(position_score(0, 10), 1.2);
        assert_eq!(position_score(9, 10), 1.1);
        assert!((position_score(5, 10) - 1.0).abs() < 1e-9);
        assert!(position_score(2, 10) < position_score(4, 10));
        // Tiny documents do not divide by zero
        assert!(position_score(1, 2) > 0.0);
        assert!(position_score(1, 3).is_finite());
    }

    #[test]
    fn test_length_score_clipped() {
        let optimal = vec!["word"; 17].join(" ") + " end";
        assert!(length_score(&optimal) > 0.95);
        assert_eq!(length_score("one"), 0.1);
        let long = vec!["word"; 60].join(" ");
        assert_eq!(length_score(&long), 0.1);
    }

    /// Scores sentences by length fit alone.
    fn length_only() -> ExtractiveSelector {
        selector().with_weights(ScoringWeights {
            position: 0.0,
            length: 1.0,
            centrality: 0.0,
            lexical: 0.0,
            entity: 0.0,
            connectivity: 0.0,
        })
    }

    /// A sentence of exactly `words` words.
    fn sentence_of(words: usize) -> String {
        let mut w = vec!["Meltwater"];
        w.extend(std::iter::repeat("flows").take(words - 1));
        format!("{}.", w.join(" "))
    }

    #[test]
    fn test_opening_sentence_above_mean_is_kept() {
        // Lengths score 0.69, 0.97, 0.97, 0.1, 0.1: the opener misses the
        // top two but beats the mean.
        let text = [12, 18, 18, 2, 2].map(sentence_of).join(" ");
        let result = length_only().select(&text, 2, false).unwrap();

        assert_eq!(result.selected_indices, vec![0, 1, 2]);
        assert!(result.text.starts_with(&sentence_of(12)));
        assert!(result.text.ends_with(&sentence_of(18)));
    }

    #[test]
    fn test_opening_sentence_below_mean_is_not_forced() {
        let text = [2, 18, 18, 12, 12].map(sentence_of).join(" ");
        let result = length_only().select(&text, 2, false).unwrap();

        assert_eq!(result.selected_indices, vec![1, 2]);
        assert!(!result.text.starts_with(&sentence_of(2)));
    }

    #[test]
    fn test_weights_deserialize_partially() {
        let w: ScoringWeights = serde_json::from_str(r#"{"centrality": 0.5}"#).unwrap();
        assert_eq!(w.centrality, 0.5);
        assert_eq!(w.position, 0.25);
    }
}
