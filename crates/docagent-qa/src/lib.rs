//! DocAgent QA — question answering over a summary with original-text fallback.

pub mod answerer;
pub mod calibrate;
pub mod types;

pub use answerer::QuestionAnswerer;
pub use calibrate::{calibrate, refine_answer};
pub use types::{AnswerResult, AnswerStrategy, ContextSnippet, QaErrorCode, QuestionAnswer};
