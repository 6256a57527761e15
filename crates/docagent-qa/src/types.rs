//! QA result types.

use serde::{Deserialize, Serialize};

/// Machine-readable reason a question could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaErrorCode {
    EmptyQuestion,
    EmptyContext,
    InferenceFailed,
}

impl std::fmt::Display for QaErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuestion => write!(f, "empty_question"),
            Self::EmptyContext => write!(f, "empty_context"),
            Self::InferenceFailed => write!(f, "inference_failed"),
        }
    }
}

/// Where the answer was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    /// One model call over the whole context.
    Direct,
    /// Best of the overlapping context chunks.
    ChunkedSummary,
    /// The summary answer was weak; the original document gave a better one.
    OriginalText,
    /// No answer was produced.
    None,
}

/// Text around an answer span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub confidence: f64,
    /// Byte offsets of the span in the text it was taken from: the context,
    /// or the original document when `strategy` is `original_text`.
    pub span_start: usize,
    pub span_end: usize,
    pub cached: bool,
    pub strategy: AnswerStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<QaErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<ContextSnippet>,
}

impl AnswerResult {
    /// Zero-confidence result carrying an error code.
    pub fn failure(code: QaErrorCode, message: impl Into<String>) -> Self {
        Self {
            answer: String::new(),
            confidence: 0.0,
            span_start: 0,
            span_end: 0,
            cached: false,
            strategy: AnswerStrategy::None,
            error: Some(code),
            message: Some(message.into()),
            snippet: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Attach up to `window / 2` bytes of `source` on each side of the span.
    /// Error results and spans outside `source` are returned unchanged.
    pub fn with_snippet(mut self, source: &str, window: usize) -> Self {
        if self.is_error() || self.span_end > source.len() || self.span_start > self.span_end {
            return self;
        }
        let mut start = self.span_start.saturating_sub(window / 2);
        while !source.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (self.span_end + window / 2).min(source.len());
        while !source.is_char_boundary(end) {
            end += 1;
        }
        self.snippet = Some(ContextSnippet {
            text: source[start..end].to_string(),
            start,
            end,
        });
        self
    }
}

/// One entry of a batch answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAnswer {
    pub question: String,
    #[serde(flatten)]
    pub result: AnswerResult,
}
