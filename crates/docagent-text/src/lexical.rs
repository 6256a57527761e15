//! Per-sentence lexical signals used by extractive scoring.

use std::collections::HashSet;

/// Function words excluded from the diversity ratio.
const DIVERSITY_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Unique-word ratio over non-function words. Sentences under three words score 0.
pub fn lexical_diversity(sentence: &str) -> f64 {
    let lower = sentence.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() < 3 {
        return 0.0;
    }
    let content: Vec<&str> = words
        .into_iter()
        .filter(|w| !DIVERSITY_STOPWORDS.contains(w))
        .collect();
    if content.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&str> = content.iter().copied().collect();
    (unique.len() as f64 / content.len() as f64).min(1.0)
}

/// Proper-noun density: +1 per capitalized word longer than three characters,
/// +0.5 when a capitalized word is followed by another one. Capped at 1.
pub fn entity_density(sentence: &str) -> f64 {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let capitalized = |w: &str| w.chars().next().is_some_and(char::is_uppercase);

    let mut indicators = 0.0;
    for (i, word) in words.iter().enumerate() {
        if !capitalized(word) {
            continue;
        }
        if word.chars().count() > 3 {
            indicators += 1.0;
        }
        if words.get(i + 1).is_some_and(|next| capitalized(next)) {
            indicators += 0.5;
        }
    }
    (indicators / words.len() as f64).min(1.0)
}
