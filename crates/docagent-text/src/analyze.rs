//! Content analysis — document type, complexity and topic keywords.
//!
//! Pure heuristics, no model inference. The profile is computed once per
//! summarization request and parameterizes planning and post-processing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::sentences::{is_stopword, words};

/// Phrases whose occurrences mark research writing.
pub const ACADEMIC_INDICATORS: &[&str] = &[
    "research",
    "methodology",
    "abstract",
    "hypothesis",
    "analysis",
    "findings",
    "literature",
    "empirical",
    "experiment",
    "results",
    "conclusion",
    "et al",
    "journal",
    "study",
];

/// Phrases whose occurrences mark instructional material.
pub const EDUCATIONAL_INDICATORS: &[&str] = &[
    "chapter",
    "lesson",
    "exercise",
    "students",
    "learning",
    "objectives",
    "example",
    "definition",
    "practice",
    "quiz",
    "homework",
    "lecture",
    "course",
    "tutorial",
];

/// Number of topic keywords kept by [`analyze`].
pub const DEFAULT_TOPIC_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Academic,
    Educational,
    #[default]
    General,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Academic => write!(f, "academic"),
            Self::Educational => write!(f, "educational"),
            Self::General => write!(f, "general"),
        }
    }
}

/// Structured description of a document used to parameterize the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentProfile {
    pub content_type: ContentType,
    /// Crude difficulty proxy in `[0, 1]`, not a readability metric.
    pub complexity: f64,
    /// Most frequent content words, most frequent first.
    pub topics: Vec<String>,
    pub avg_word_length: f64,
    /// Words per sentence.
    pub avg_sentence_length: f64,
    pub num_sentences: usize,
}

impl ContentProfile {
    pub fn primary_topic(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }
}

/// Analyze text with the default topic count.
pub fn analyze(text: &str) -> ContentProfile {
    analyze_with(text, DEFAULT_TOPIC_COUNT)
}

/// Analyze text, keeping `topic_count` topic keywords.
pub fn analyze_with(text: &str, topic_count: usize) -> ContentProfile {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return ContentProfile::default();
    }

    let num_sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();

    let avg_word_length =
        tokens.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / tokens.len() as f64;
    let avg_sentence_length = tokens.len() as f64 / num_sentences.max(1) as f64;
    let complexity = (avg_word_length * avg_sentence_length / 1000.0).min(1.0);

    ContentProfile {
        content_type: classify(text),
        complexity,
        topics: top_topics(text, topic_count),
        avg_word_length,
        avg_sentence_length,
        num_sentences,
    }
}

/// Strictly higher indicator count wins; ties and zero counts are general.
pub fn classify(text: &str) -> ContentType {
    let lower = text.to_lowercase();
    let count = |list: &[&str]| -> usize { list.iter().map(|p| lower.matches(p).count()).sum() };
    let academic = count(ACADEMIC_INDICATORS);
    let educational = count(EDUCATIONAL_INDICATORS);

    if academic > educational {
        ContentType::Academic
    } else if educational > academic {
        ContentType::Educational
    } else {
        ContentType::General
    }
}

/// Top words (length > 3, not stopwords, not numbers) by raw frequency;
/// ties keep first-occurrence order.
pub fn top_topics(text: &str, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, w) in words(text).into_iter().enumerate() {
        if w.chars().count() <= 3 || is_stopword(&w) || w.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        counts.entry(w).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(n).map(|(w, _)| w).collect()
}
