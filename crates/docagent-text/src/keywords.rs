//! Ranked keyword extraction over a set of sentences.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::sentences::{is_stopword, words};

/// Number of keywords returned by default.
pub const DEFAULT_KEYWORD_COUNT: usize = 20;

/// Discourse connectives that carry no topical signal.
static CONNECTIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "also", "however", "therefore", "thus", "hence", "accordingly", "consequently",
        "similarly", "likewise", "moreover", "furthermore", "additionally", "besides",
        "further", "then", "after", "before",
    ]
    .into_iter()
    .collect()
});

fn is_candidate(word: &str) -> bool {
    word.chars().count() > 2
        && !word.chars().any(|c| c.is_ascii_digit())
        && !is_stopword(word)
        && !CONNECTIVES.contains(word)
}

/// Rank keywords of `sentences` by a TF-IDF-like score:
/// `tf * 0.5 + ln(n / (1 + sentences_containing)) * 0.2
///  + min(len / 10, 1) * 0.2 + first_or_last_sentence * 0.2 * 0.1`.
///
/// Equal scores keep first-occurrence order.
pub fn rank_keywords<S: AsRef<str>>(sentences: &[S], top_n: usize) -> Vec<String> {
    if sentences.is_empty() {
        return Vec::new();
    }
    let lowered: Vec<String> = sentences.iter().map(|s| s.as_ref().to_lowercase()).collect();

    let mut order: Vec<String> = Vec::new();
    let mut freq: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    for sentence in &lowered {
        for w in words(sentence) {
            if !is_candidate(&w) {
                continue;
            }
            total += 1;
            let count = freq.entry(w.clone()).or_insert(0);
            if *count == 0 {
                order.push(w);
            }
            *count += 1;
        }
    }
    if total == 0 {
        return Vec::new();
    }

    let n = lowered.len() as f64;
    let first = &lowered[0];
    let last = if lowered.len() > 1 { lowered.last() } else { None };

    let mut scored: Vec<(String, f64)> = order
        .into_iter()
        .map(|w| {
            let tf = freq[&w] as f64 / total as f64;
            // Substring containment, so "model" also counts inside "models"
            let containing = lowered.iter().filter(|s| s.contains(w.as_str())).count();
            let df_penalty = (n / (1.0 + containing as f64)).ln();
            let length_bonus = (w.chars().count() as f64 / 10.0).min(1.0);
            let in_edge = first.contains(w.as_str()) || last.is_some_and(|l| l.contains(w.as_str()));
            let position_bonus = if in_edge { 0.2 } else { 0.0 };
            let score = tf * 0.5 + df_penalty * 0.2 + length_bonus * 0.2 + position_bonus * 0.1;
            (w, score)
        })
        .collect();

    // Stable sort keeps first-occurrence order among ties
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(top_n).map(|(w, _)| w).collect()
}
