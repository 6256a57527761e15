//! Question-to-sentence relevance by word overlap.

use std::collections::HashSet;

use crate::sentences::{is_stopword, sentence_spans, words, SentenceSpan};

/// Minimum overlap ratio for a sentence to count as relevant.
pub const MIN_RELEVANCE: f64 = 0.1;

/// Content words of a question (lowercased, stopwords removed).
pub fn question_terms(question: &str) -> HashSet<String> {
    words(question)
        .into_iter()
        .filter(|w| !is_stopword(w))
        .collect()
}

/// Share of question terms present in `sentence`.
pub fn overlap_score(terms: &HashSet<String>, sentence: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let sentence_words: HashSet<String> = words(sentence).into_iter().collect();
    terms.intersection(&sentence_words).count() as f64 / terms.len() as f64
}

/// Most relevant sentences of `text` for `question`, returned in document
/// order and limited to roughly `max_words` words in total.
pub fn relevant_sentences<'a>(
    question: &str,
    text: &'a str,
    max_words: usize,
) -> Vec<(SentenceSpan<'a>, f64)> {
    let terms = question_terms(question);
    let mut scored: Vec<(usize, SentenceSpan<'a>, f64)> = sentence_spans(text)
        .into_iter()
        .enumerate()
        .map(|(i, span)| (i, span, overlap_score(&terms, span.text)))
        .filter(|(_, _, score)| *score > MIN_RELEVANCE)
        .collect();
    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut picked = Vec::new();
    let mut budget = 0;
    for (i, span, score) in scored {
        let n = span.text.split_whitespace().count();
        if budget + n <= max_words {
            budget += n;
            picked.push((i, span, score));
        }
    }
    picked.sort_by_key(|(i, _, _)| *i);
    picked.into_iter().map(|(_, span, score)| (span, score)).collect()
}
