//! Question Answerer — chunked span search over a summary, fallback to the
//! original document, refinement, calibration and a bounded answer cache.

use std::sync::Arc;

use docagent_core::{QaSettings, Result};
use docagent_infer::{BoundedCache, QaBackend, QaSpan};
use docagent_text::sentences::word_count;
use docagent_text::OverlappingChunker;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::calibrate::{calibrate, refine_answer};
use crate::types::{AnswerResult, AnswerStrategy, QaErrorCode, QuestionAnswer};

/// Best span found in one text.
#[derive(Debug, Clone)]
struct Candidate {
    span: QaSpan,
    /// Raw score plus the chunk-context boost.
    score: f64,
    strategy: AnswerStrategy,
}

pub struct QuestionAnswerer {
    backend: Arc<dyn QaBackend>,
    settings: QaSettings,
    chunker: OverlappingChunker,
    cache: BoundedCache<AnswerResult>,
}

impl QuestionAnswerer {
    pub fn new(backend: Arc<dyn QaBackend>, settings: QaSettings) -> Self {
        let chunker = OverlappingChunker::new(settings.chunk_size, settings.chunk_overlap_sentences);
        let cache = BoundedCache::new(settings.cache_capacity);
        info!(
            "Question answerer initialized: model={}, cache={}",
            if backend.is_available() { "onnx" } else { "lexical" },
            settings.cache_capacity
        );
        Self {
            backend,
            settings,
            chunker,
            cache,
        }
    }

    pub fn settings(&self) -> &QaSettings {
        &self.settings
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Answer `question` from `context`, searching `original_text` as well
    /// when the context answer is weak.
    ///
    /// Never fails: empty inputs and backend errors come back as
    /// zero-confidence results with an error code. Every answer the backend
    /// produced is reported at or above the confidence floor.
    pub fn answer(&self, question: &str, context: &str, original_text: Option<&str>) -> AnswerResult {
        let question = question.trim();
        if question.is_empty() {
            return AnswerResult::failure(QaErrorCode::EmptyQuestion, "question is empty");
        }
        if context.trim().is_empty() {
            return AnswerResult::failure(QaErrorCode::EmptyContext, "context is empty");
        }

        let key = self.cache_key(question, context);
        if let Some(mut hit) = self.cache.get(&key) {
            debug!("QA cache hit");
            hit.cached = true;
            hit.confidence = hit.confidence.max(self.settings.confidence_floor);
            return hit;
        }

        let candidate = match self.find_answer(question, context, original_text) {
            Ok(c) => c,
            Err(e) => {
                warn!("Question answering failed: {}", e);
                return AnswerResult::failure(QaErrorCode::InferenceFailed, e.to_string());
            }
        };

        // A span made only of boilerplate refines to nothing; keep it verbatim
        let refined = refine_answer(&candidate.span.answer);
        let answer = if refined.is_empty() {
            candidate.span.answer.trim().to_string()
        } else {
            refined
        };

        let source = match candidate.strategy {
            AnswerStrategy::OriginalText => original_text.unwrap_or(context),
            _ => context,
        };
        let calibrated = calibrate(candidate.score, question, &candidate.span.answer, source);
        let confidence = round3(
            calibrated.clamp(self.settings.confidence_floor, self.settings.confidence_ceiling),
        );

        let result = AnswerResult {
            answer,
            confidence,
            span_start: candidate.span.start,
            span_end: candidate.span.end,
            cached: false,
            strategy: candidate.strategy,
            error: None,
            message: None,
            snippet: None,
        };
        debug!(
            "Answered via {:?}: raw={:.3}, confidence={:.3}",
            result.strategy, candidate.score, result.confidence
        );
        if result.answer.is_empty() {
            warn!("Backend returned an empty span for {:?}", question);
        } else {
            self.cache.put(key, result.clone());
        }
        result
    }

    /// Answer several questions over the same context.
    pub fn answer_many<S: AsRef<str>>(
        &self,
        questions: &[S],
        context: &str,
        original_text: Option<&str>,
    ) -> Vec<QuestionAnswer> {
        questions
            .iter()
            .map(|q| QuestionAnswer {
                question: q.as_ref().to_string(),
                result: self.answer(q.as_ref(), context, original_text),
            })
            .collect()
    }

    /// Answer and attach `window` bytes of surrounding text. Weak answers
    /// (confidence <= 0.1) get no snippet.
    pub fn answer_with_snippet(
        &self,
        question: &str,
        context: &str,
        original_text: Option<&str>,
        window: usize,
    ) -> AnswerResult {
        let result = self.answer(question, context, original_text);
        if result.confidence <= 0.1 {
            return result;
        }
        let source = match (result.strategy, original_text) {
            (AnswerStrategy::OriginalText, Some(original)) => original,
            _ => context,
        };
        result.with_snippet(source, window)
    }

    fn find_answer(&self, question: &str, context: &str, original_text: Option<&str>) -> Result<Candidate> {
        let best = self.search(question, context)?;
        if best.score >= self.settings.low_confidence_threshold {
            return Ok(best);
        }

        let Some(original) = original_text.filter(|t| !t.trim().is_empty()) else {
            return Ok(best);
        };
        debug!("Low confidence ({:.3}); searching the original text", best.score);
        let fallback = self.search(question, original)?;
        if fallback.score > best.score + self.settings.fallback_margin {
            Ok(Candidate {
                strategy: AnswerStrategy::OriginalText,
                ..fallback
            })
        } else {
            Ok(best)
        }
    }

    /// Best span of `text`: one call for short texts, otherwise the best of
    /// the overlapping chunks with a small boost for chunks with more
    /// sentences.
    fn search(&self, question: &str, text: &str) -> Result<Candidate> {
        let max_len = self.settings.max_answer_len;
        if text.chars().count() <= self.settings.chunk_threshold {
            let span = self.backend.answer(question, text, max_len)?;
            return Ok(Candidate {
                score: span.score,
                span,
                strategy: AnswerStrategy::Direct,
            });
        }

        let mut best: Option<Candidate> = None;
        for chunk in self.chunker.chunk(text) {
            if word_count(&chunk.text) < self.settings.min_chunk_words {
                continue;
            }
            let mut span = self.backend.answer(question, &chunk.text, max_len)?;
            span.start += chunk.start_offset;
            span.end += chunk.start_offset;
            let score = span.score + (chunk.sentence_count as f64 * 0.02).min(0.1);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Candidate {
                    span,
                    score,
                    strategy: AnswerStrategy::ChunkedSummary,
                });
            }
        }

        match best {
            Some(c) => Ok(c),
            None => {
                let span = self.backend.answer(question, text, max_len)?;
                Ok(Candidate {
                    score: span.score,
                    span,
                    strategy: AnswerStrategy::Direct,
                })
            }
        }
    }

    /// SHA-256 of the question and context prefixes.
    fn cache_key(&self, question: &str, context: &str) -> String {
        let q: String = question.chars().take(self.settings.question_key_chars).collect();
        let c: String = context.chars().take(self.settings.context_key_chars).collect();
        hex::encode(Sha256::digest(format!("{}|{}", q, c).as_bytes()))
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
