//! Text normalization before summarization and after generation.
//!
//! `clean_for_summarization` strips document noise (citations, page numbers,
//! figure/table captions, control characters) and normalizes spacing.
//! Digits are kept: dates and measurements matter to summaries and answers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::sentences::sentence_spans;

static BRACKET_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s?\[\d+(?:\s*[,\-–]\s*\d+)*\]").unwrap());
static AUTHOR_YEAR_CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s?\((?:[A-Z][A-Za-z\-]+)(?: et al\.)?(?:\s(?:and|&)\s[A-Z][A-Za-z\-]+)?,?\s\d{4}[a-z]?\)")
        .unwrap()
});
static PAGE_NUMBER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:page\s+)?\d+(?:\s+of\s+\d+)?\s*$").unwrap());
static CAPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:figure|fig\.|table)\s*\d+\s*[.:\-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());
static MISSING_SPACE_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([,;!?])([A-Za-z])").unwrap());
static GLUED_SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z]{2})\.([A-Z][a-z])").unwrap());

/// Clean raw document text for the summarization pipeline.
pub fn clean_for_summarization(text: &str) -> String {
    let kept_lines: Vec<&str> = text
        .lines()
        .filter(|line| !PAGE_NUMBER_LINE.is_match(line) && !CAPTION_LINE.is_match(line))
        .collect();
    let joined = kept_lines.join("\n");

    let no_control: String = joined
        .chars()
        .map(|c| if c.is_control() && c != '\n' { ' ' } else { c })
        .collect();

    let no_citations = BRACKET_CITATION.replace_all(&no_control, "");
    let no_citations = AUTHOR_YEAR_CITATION.replace_all(&no_citations, "");

    polish_spacing(&no_citations)
        .map(|s| capitalize_sentences(&s))
        .unwrap_or_default()
}

/// Collapse whitespace and fix spacing around punctuation. `None` if nothing
/// but whitespace remains.
fn polish_spacing(text: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let tight = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
    let spaced = MISSING_SPACE_AFTER.replace_all(&tight, "$1 $2");
    let spaced = GLUED_SENTENCE.replace_all(&spaced, "$1. $2");
    let trimmed = spaced.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Characters skipped before the letter that starts a sentence.
const OPENERS: &[char] = &['"', '\'', '\u{201C}', '\u{2018}', '(', '['];

/// Normalize generated text: whitespace, punctuation spacing, sentence-start
/// capitalization and terminal punctuation.
pub fn polish(text: &str) -> String {
    match polish_spacing(text) {
        Some(s) => ensure_terminal_punctuation(&capitalize_sentences(&s)),
        None => String::new(),
    }
}

/// Uppercase the first letter of every sentence.
pub fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in sentence_spans(text) {
        out.push_str(&text[last..span.start]);
        out.push_str(&capitalize_first(span.text));
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Uppercase the first character if it is a lowercase letter. Leading
/// whitespace and opening quotes or brackets are skipped; text starting with
/// a digit or any other symbol is returned unchanged.
pub fn capitalize_first(text: &str) -> String {
    let first = text
        .char_indices()
        .find(|(_, c)| !c.is_whitespace() && !OPENERS.contains(c));
    match first {
        Some((i, c)) if c.is_lowercase() => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..i]);
            out.extend(c.to_uppercase());
            out.push_str(&text[i + c.len_utf8()..]);
            out
        }
        _ => text.to_string(),
    }
}

/// Append a period unless the text already ends in `.`, `!` or `?`.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
        return trimmed.to_string();
    }
    let base = trimmed.trim_end_matches([',', ';', ':', '-']);
    format!("{}.", base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_citations_keeps_digits() {
        let text = "Sea levels rose 3.2 mm per year [12]. This was confirmed (Smith et al., 2020) in 2021.";
        let cleaned = clean_for_summarization(text);
        assert_eq!(
            cleaned,
            "Sea levels rose 3.2 mm per year. This was confirmed in 2021."
        );
    }

    #[test]
    fn test_drops_page_numbers_and_captions() {
        let text = "The model converges.\n12\nFigure 3: Loss curve over epochs\nTraining is stable.";
        let cleaned = clean_for_summarization(text);
        assert_eq!(cleaned, "The model converges. Training is stable.");
    }

    #[test]
    fn test_punctuation_spacing_and_capitals() {
        let cleaned = clean_for_summarization("first point ,second point.Third point");
        assert_eq!(cleaned, "First point, second point. Third point");
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(clean_for_summarization(" \n\t "), "");
        assert_eq!(polish("   "), "");
    }

    #[test]
    fn test_polish_generated_text() {
        assert_eq!(
            polish("the  summary says x .  it ends here"),
            "The summary says x. It ends here."
        );
        assert_eq!(ensure_terminal_punctuation("Done!"), "Done!");
        assert_eq!(ensure_terminal_punctuation("trailing,"), "trailing.");
        assert_eq!(capitalize_first("\"quoted\""), "\"Quoted\"");
    }

    #[test]
    fn test_capitalize_first_leaves_numbers_and_symbols() {
        assert_eq!(capitalize_first("4 million dollars"), "4 million dollars");
        assert_eq!(capitalize_first("2023 was a dry year"), "2023 was a dry year");
        assert_eq!(capitalize_first("$5 per ticket"), "$5 per ticket");
        assert_eq!(capitalize_first("  (see above)"), "  (See above)");
        assert_eq!(capitalize_first("already Upper"), "Already Upper");
        assert_eq!(
            capitalize_sentences("2023 was dry. rain returned."),
            "2023 was dry. Rain returned."
        );
    }
}
