//! Answer refinement and confidence calibration heuristics.
//!
//! These rules nudge a raw span score by answer length, repetition in the
//! context, question type and genericness. They are deliberately simple; the
//! floor/ceiling clamp is applied by the caller.

use docagent_text::cleaning::capitalize_first;

/// Boilerplate some models put in front of an answer.
pub const BOILERPLATE_PREFIXES: &[&str] = &[
    "the answer is",
    "according to the text",
    "based on the context",
    "the text states that",
    "it says that",
];

const WH_WORDS: &[&str] = &["what", "who", "where", "when", "which", "how", "why"];
const EXPLAIN_WORDS: &[&str] = &["define", "explain", "describe"];
const GENERIC_ANSWERS: &[&str] = &["yes", "no", "maybe", "perhaps", "it depends"];

/// Answers with at least this many words read as sentences and get a period.
pub const SENTENCE_ANSWER_WORDS: usize = 4;

/// Clean up a raw answer span for display.
pub fn refine_answer(answer: &str) -> String {
    let mut refined = answer.trim().to_string();

    loop {
        let lower = refined.to_lowercase();
        let Some(prefix) = BOILERPLATE_PREFIXES.iter().find(|p| lower.starts_with(*p)) else {
            break;
        };
        refined = refined[prefix.len()..]
            .trim_start_matches(['.', ',', ':', ';', '-', ' '])
            .to_string();
    }

    let refined = collapse_repeats(&capitalize_first(&refined));
    let words = refined.split_whitespace().count();
    if words >= SENTENCE_ANSWER_WORDS && !refined.ends_with(['.', '!', '?', ':']) {
        format!("{}.", refined.trim_end_matches([',', ';']))
    } else {
        refined
    }
}

/// Drop immediately repeated words ("the the"), case-insensitively.
fn collapse_repeats(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        if out.last().map_or(true, |prev| !prev.eq_ignore_ascii_case(word)) {
            out.push(word);
        }
    }
    out.join(" ")
}

/// Adjust a raw span score. The result is in `[0, 1]`.
pub fn calibrate(raw: f64, question: &str, answer: &str, context: &str) -> f64 {
    let mut score = raw;
    let answer_lower = answer.trim().to_lowercase();
    let question_lower = question.to_lowercase();

    let words = answer_lower.split_whitespace().count();
    if (2..=20).contains(&words) {
        score += 0.08;
    } else if words > 25 {
        score -= 0.05;
    }

    if !answer_lower.is_empty() {
        let occurrences = context.to_lowercase().matches(answer_lower.as_str()).count();
        if occurrences > 1 {
            score += (occurrences as f64 * 0.03).min(0.15);
        }
    }

    let question_words: Vec<&str> = question_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if !answer_lower.is_empty() && question_words.iter().any(|w| WH_WORDS.contains(w)) {
        score += 0.12;
    }
    if question_words.iter().any(|w| EXPLAIN_WORDS.contains(w)) {
        score += 0.1;
    }

    let bare = answer_lower.trim_end_matches(['.', '!', '?']);
    if GENERIC_ANSWERS.contains(&bare) {
        score -= 0.08;
    }

    score.clamp(0.0, 1.0)
}
