//! DocAgent Core — error taxonomy, quality modes, configuration.

pub mod config;
pub mod error;
pub mod quality;

pub use config::{AgentConfig, DataPaths, QaSettings, ServiceSettings, SummarizerSettings};
pub use error::{Error, Result};
pub use quality::QualityMode;
