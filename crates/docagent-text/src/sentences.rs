//! Sentence segmentation and word tokenization.
//!
//! Sentences end at `.`, `!` or `?` followed by whitespace (or end of text).
//! The regex crate has no lookbehind, so the scan is done over bytes and the
//! token in front of a period is checked against a list of abbreviations
//! that never end a sentence.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Abbreviations common in academic and technical writing. Lowercase,
/// compared against the lowercased token ending at the period.
pub const ABBREVIATIONS: &[&str] = &[
    "al.", "i.e.", "e.g.", "cf.", "vs.", "etc.", "dr.", "prof.", "fig.", "figs.", "eq.",
    "mr.", "mrs.", "ms.", "no.", "vol.", "pp.", "approx.", "sec.",
];

/// Function words ignored by keyword, topic and overlap heuristics.
pub static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor",
        "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
        "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
        "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
        "why", "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// A sentence and its byte range in the source text (trimmed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSpan<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Split text into sentence spans. Empty pieces are dropped; nothing else is
/// filtered, so every non-whitespace byte of the input lands in exactly one span.
pub fn sentence_spans(text: &str) -> Vec<SentenceSpan<'_>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if !matches!(b, b'.' | b'!' | b'?') {
            continue;
        }
        // Let closing quotes and brackets ride along with the terminator
        let mut end = i + 1;
        while end < bytes.len() && matches!(bytes[end], b'"' | b'\'' | b')' | b']') {
            end += 1;
        }
        let at_boundary = end >= bytes.len() || bytes[end].is_ascii_whitespace();
        if !at_boundary || end <= start {
            continue;
        }
        if b == b'.' && is_abbreviation(&text[start..=i]) {
            continue;
        }
        push_span(text, start, end, &mut spans);
        start = end;
    }
    push_span(text, start, text.len(), &mut spans);
    spans
}

/// Split text into trimmed sentence slices.
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_spans(text).into_iter().map(|s| s.text).collect()
}

fn push_span<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<SentenceSpan<'a>>) {
    if start >= end {
        return;
    }
    let raw = &text[start..end];
    let trimmed_start = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let s = start + trimmed_start;
    out.push(SentenceSpan {
        text: trimmed,
        start: s,
        end: s + trimmed.len(),
    });
}

/// Whether the token ending at the period in `piece` is a known abbreviation
/// or a single-letter initial ("J. Smith").
fn is_abbreviation(piece: &str) -> bool {
    let token = piece
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    let lower = token.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.'), None) if c.is_uppercase()
    )
}

/// Lowercased `\w+` tokens.
pub fn words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}
