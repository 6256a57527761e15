//! Final coherence pass over a generated summary.

use docagent_text::cleaning::{capitalize_sentences, ensure_terminal_punctuation};
use docagent_text::sentences::{is_stopword, word_count};
use docagent_text::{split_sentences, ContentProfile, ContentType};

/// Sentence openers that already connect to the previous sentence.
pub const TRANSITIONS: &[&str] = &[
    "furthermore",
    "additionally",
    "finally",
    "moreover",
    "however",
    "in addition",
    "also",
    "overall",
    "therefore",
];

/// Capitalize, frame a too-short opening with the document's type and main
/// topic, add one content-type transition and terminate the text.
pub fn finalize(summary: &str, profile: &ContentProfile, short_sentence_words: usize) -> String {
    let capitalized = capitalize_sentences(summary.trim());
    let framed = frame_opening(&capitalized, profile, short_sentence_words);
    let connected = insert_transition(&framed, profile.content_type);
    ensure_terminal_punctuation(&connected)
}

fn frame_opening(text: &str, profile: &ContentProfile, short_sentence_words: usize) -> String {
    let (Some(topic), Some(first)) = (profile.primary_topic(), split_sentences(text).first().copied())
    else {
        return text.to_string();
    };
    if word_count(first) >= short_sentence_words {
        return text.to_string();
    }
    format!("This {} text centers on {}. {}", profile.content_type, topic, text)
}

/// Insert the content type's transition at its slot unless the summary
/// already uses it or the slot sentence opens with a transition.
pub fn insert_transition(text: &str, content_type: ContentType) -> String {
    let mut sentences: Vec<String> = split_sentences(text).into_iter().map(str::to_string).collect();
    let n = sentences.len();
    let (word, slot) = match content_type {
        ContentType::Academic if n >= 2 => ("Furthermore", 1),
        ContentType::Educational if n >= 3 => ("Finally", n - 1),
        ContentType::General if n >= 3 => ("Additionally", 2),
        _ => return text.to_string(),
    };

    let lower = text.to_lowercase();
    if lower.contains(&word.to_lowercase()) || opens_with_transition(&sentences[slot]) {
        return text.to_string();
    }
    sentences[slot] = prefix_transition(word, &sentences[slot], text);
    sentences.join(" ")
}

fn opens_with_transition(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    TRANSITIONS.iter().any(|t| {
        lower.starts_with(t)
            && lower[t.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// "The ice melts." -> "Furthermore, the ice melts." Acronyms, "I" and
/// words capitalized mid-sentence elsewhere in `text` keep their capital.
fn prefix_transition(word: &str, sentence: &str, text: &str) -> String {
    let first = sentence.split_whitespace().next().unwrap_or("");
    if keeps_capital(first, text) {
        return format!("{}, {}", word, sentence);
    }
    let mut out = format!("{}, ", word);
    let mut it = sentence.chars();
    if let Some(c) = it.next() {
        out.extend(c.to_lowercase());
    }
    out.push_str(it.as_str());
    out
}

fn keeps_capital(first: &str, text: &str) -> bool {
    let bare = first.trim_matches(|c: char| !c.is_alphanumeric());
    let mut chars = bare.chars();
    match chars.next() {
        Some(c) if c.is_uppercase() => {}
        _ => return true,
    }
    if bare == "I" || chars.any(char::is_uppercase) {
        return true;
    }
    if is_stopword(&bare.to_lowercase()) {
        return false;
    }
    // Proper nouns show up capitalized after a non-terminal word
    text.split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| {
            !w[0].ends_with(['.', '!', '?', ':'])
                && w[1].trim_matches(|c: char| !c.is_alphanumeric()) == bare
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(content_type: ContentType, topics: &[&str]) -> ContentProfile {
        ContentProfile {
            content_type,
            topics: topics.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_academic_transition_after_opening() {
        let p = profile(ContentType::Academic, &[]);
        let out = finalize(
            "the study measured glacier retreat. The results show rapid loss",
            &p,
            8,
        );
        assert_eq!(
            out,
            "The study measured glacier retreat. Furthermore, the results show rapid loss."
        );
    }

    #[test]
    fn test_educational_transition_on_last_sentence() {
        let p = profile(ContentType::Educational, &[]);
        let out = insert_transition("Read the lesson. Do the exercise. You check answers.", p.content_type);
        assert_eq!(out, "Read the lesson. Do the exercise. Finally, you check answers.");

        // Needs three sentences
        let two = insert_transition("Read the lesson. Check answers.", p.content_type);
        assert_eq!(two, "Read the lesson. Check answers.");
    }

    #[test]
    fn test_general_transition_on_third_sentence() {
        let out = insert_transition("A rose. B fell. NASA reported it. D ended.", ContentType::General);
        assert_eq!(out, "A rose. B fell. Additionally, NASA reported it. D ended.");
    }

    #[test]
    fn test_transition_lowercases_common_opener() {
        let out = insert_transition(
            "Temperatures climbed all decade. Glaciers retreated up the valleys.",
            ContentType::Academic,
        );
        assert_eq!(
            out,
            "Temperatures climbed all decade. Furthermore, glaciers retreated up the valleys."
        );
    }

    #[test]
    fn test_transition_keeps_proper_noun_capital() {
        let out = insert_transition(
            "Researchers surveyed the Alps in 2020. Switzerland lost ten glaciers. Teams then visited Switzerland again.",
            ContentType::General,
        );
        assert_eq!(
            out,
            "Researchers surveyed the Alps in 2020. Switzerland lost ten glaciers. Additionally, teams then visited Switzerland again."
        );

        let out = insert_transition(
            "Researchers surveyed Switzerland in 2020. Switzerland lost ten glaciers.",
            ContentType::Academic,
        );
        assert!(out.contains("Furthermore, Switzerland lost"));
    }

    #[test]
    fn test_existing_transition_kept() {
        let text = "Ice melts. Seas rise. Moreover, coasts erode.";
        assert_eq!(insert_transition(text, ContentType::General), text);
        let text = "Ice melts. Additionally, seas rise. Coasts erode.";
        assert_eq!(insert_transition(text, ContentType::General), text);
    }

    #[test]
    fn test_short_opening_framed_with_topic() {
        let p = profile(ContentType::General, &["glaciers", "melting"]);
        let out = finalize("Ice melts.", &p, 8);
        assert_eq!(out, "This general text centers on glaciers. Ice melts.");
    }

    #[test]
    fn test_long_opening_not_framed() {
        let p = profile(ContentType::Academic, &["glaciers"]);
        let text = "Mountain glaciers across the Alps lost a third of their volume since 1990.";
        assert_eq!(finalize(text, &p, 8), text);
    }

    #[test]
    fn test_terminal_punctuation() {
        let p = profile(ContentType::General, &[]);
        assert_eq!(finalize("ice melts", &p, 8), "Ice melts.");
    }
}
