//! Error types for DocAgent.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Empty or unreadable input text. Raised before any pipeline stage runs.
    #[error("Invalid input: {0}")]
    Input(String),

    /// A text-extraction collaborator could not produce text.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// An embedding, generation or QA model call failed.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Terminal failure of a `summarize` request.
    #[error("Summarization failed: {0}")]
    Summarization(String),

    /// A model could not be loaded at initialization time.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code, used by callers that surface failures.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Input(_) => "invalid_input",
            Self::Extraction(_) => "extraction_failed",
            Self::Inference(_) => "inference_failed",
            Self::Summarization(_) => "summarization_failed",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config_error",
            Self::Http(_) => "http_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_message() {
        let err = Error::Summarization("generator exploded".into());
        assert_eq!(err.to_string(), "Summarization failed: generator exploded");
        assert_eq!(err.code(), "summarization_failed");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.code(), "io_error");
    }
}
