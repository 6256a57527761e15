//! Extractive question-answering collaborator.
//!
//! A backend returns the best answer span of a context with a raw score in
//! `[0, 1]`. `LexicalQaBackend` is the model-free fallback: it picks the
//! context sentence sharing the most content words with the question.

use docagent_core::{Error, Result};
use docagent_text::relevance::{question_terms, relevant_sentences};
use docagent_text::sentences::{sentence_spans, SentenceSpan};
use serde::{Deserialize, Serialize};

/// Answer span with byte offsets into the context it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaSpan {
    pub answer: String,
    pub score: f64,
    pub start: usize,
    pub end: usize,
}

/// Trait for extractive QA backends.
pub trait QaBackend: Send + Sync {
    /// Find the answer to `question` in `context`. `max_answer_len` bounds the
    /// span length in model tokens (words for lexical backends).
    fn answer(&self, question: &str, context: &str, max_answer_len: usize) -> Result<QaSpan>;

    /// Whether a trained model backs this backend.
    fn is_available(&self) -> bool;
}

/// Pick the best `(start, end)` token pair with `start <= end` and
/// `end - start < max_len`, scoring `p_start * p_end` after a softmax over
/// the allowed positions. Positions outside `allowed` are ignored.
pub fn best_span(
    start_logits: &[f32],
    end_logits: &[f32],
    allowed: &[bool],
    max_len: usize,
) -> Option<(usize, usize, f64)> {
    let n = start_logits.len().min(end_logits.len()).min(allowed.len());
    let start_p = masked_softmax(&start_logits[..n], &allowed[..n]);
    let end_p = masked_softmax(&end_logits[..n], &allowed[..n]);

    let mut best: Option<(usize, usize, f64)> = None;
    for s in (0..n).filter(|&i| allowed[i]) {
        for e in (s..n.min(s + max_len.max(1))).filter(|&i| allowed[i]) {
            let score = start_p[s] * end_p[e];
            if best.map_or(true, |(_, _, b)| score > b) {
                best = Some((s, e, score));
            }
        }
    }
    best
}

fn masked_softmax(logits: &[f32], allowed: &[bool]) -> Vec<f64> {
    let max = logits
        .iter()
        .zip(allowed)
        .filter(|(_, &a)| a)
        .map(|(&l, _)| l as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f64> = logits
        .iter()
        .zip(allowed)
        .map(|(&l, &a)| if a { (l as f64 - max).exp() } else { 0.0 })
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Copulas after which the rest of a definitional sentence is the answer.
const COPULAS: &[&str] = &[" is ", " are ", " was ", " were ", " means ", " refers to "];

/// Word-overlap QA used when no QA model is installed. Only sentences
/// relevant to the question are candidates; without any, the opening
/// sentence is returned with the minimum score.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalQaBackend;

impl QaBackend for LexicalQaBackend {
    fn answer(&self, question: &str, context: &str, max_answer_len: usize) -> Result<QaSpan> {
        let terms = question_terms(question);
        let best = relevant_sentences(question, context, usize::MAX)
            .into_iter()
            .fold(None, |acc: Option<(SentenceSpan<'_>, f64)>, (span, score)| match acc {
                Some((_, b)) if b >= score => acc,
                _ => Some((span, score)),
            })
            .or_else(|| sentence_spans(context).first().map(|span| (*span, 0.0)));

        let (span, overlap) =
            best.ok_or_else(|| Error::Inference("context has no sentences".into()))?;

        // Narrow "X is Y." to "Y" when the question term precedes the copula
        let lower = span.text.to_lowercase();
        let (mut start, mut end) = (span.start, span.end);
        for cop in COPULAS.iter().filter(|_| lower.len() == span.text.len()) {
            if let Some(pos) = lower.find(cop) {
                let head = &lower[..pos];
                if terms.iter().any(|t| head.contains(t.as_str())) {
                    start = span.start + pos + cop.len();
                    break;
                }
            }
        }
        let tail = context[start..end].trim_end_matches(['.', '!', '?']);
        end = start + tail.len();

        // Respect the span budget in words
        let words: Vec<(usize, &str)> = word_offsets(&context[start..end]);
        if words.len() > max_answer_len.max(1) {
            let (off, w) = words[max_answer_len.max(1) - 1];
            end = start + off + w.len();
        }

        // Offsets track the trimmed answer
        let raw = &context[start..end];
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            start += raw.len() - raw.trim_start().len();
            end = start + trimmed.len();
        }
        Ok(QaSpan {
            answer: context[start..end].to_string(),
            score: (overlap * 0.9).clamp(0.05, 0.9),
            start,
            end,
        })
    }

    fn is_available(&self) -> bool {
        false
    }
}

fn word_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_span_respects_order_and_length() {
        let start = [0.0, 5.0, 0.0, 0.0];
        let end = [0.0, 0.0, 0.0, 4.0];
        let allowed = [true; 4];
        let (s, e, score) = best_span(&start, &end, &allowed, 10).unwrap();
        assert_eq!((s, e), (1, 3));
        assert!(score > 0.0 && score <= 1.0);

        // Span of 3 tokens not allowed with max_len 2
        let (s, e, _) = best_span(&start, &end, &allowed, 2).unwrap();
        assert_eq!(s, 1);
        assert!(e - s < 2);
    }

    #[test]
    fn test_best_span_mask() {
        let logits = [9.0, 1.0, 1.0];
        let allowed = [false, true, true];
        let (s, _, _) = best_span(&logits, &logits, &allowed, 5).unwrap();
        assert_ne!(s, 0);
        assert!(best_span(&logits, &logits, &[false; 3], 5).is_none());
    }

    #[test]
    fn test_lexical_definition() {
        let context = "Cells divide often. Mitochondria is the powerhouse of the cell. Plants grow.";
        let span = LexicalQaBackend
            .answer("What is mitochondria?", context, 100)
            .unwrap();
        assert_eq!(span.answer, "the powerhouse of the cell");
        assert_eq!(&context[span.start..span.end], span.answer);
        assert!(span.score > 0.0);
    }

    #[test]
    fn test_lexical_budget() {
        let context = "Rivers carry sediment from distant mountains toward the sea.";
        let span = LexicalQaBackend.answer("What do rivers carry?", context, 3).unwrap();
        assert_eq!(span.answer, "Rivers carry sediment");
    }

    #[test]
    fn test_lexical_offsets_exclude_padding() {
        let context = "Maps help. The capital of France is   Paris  . Trains run.";
        let span = LexicalQaBackend
            .answer("What is the capital of France?", context, 100)
            .unwrap();
        assert_eq!(span.answer, "Paris");
        assert_eq!(&context[span.start..span.end], span.answer);
    }

    #[test]
    fn test_lexical_empty_context() {
        assert!(LexicalQaBackend.answer("why?", "   ", 10).is_err());
    }
}
