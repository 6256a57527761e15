//! DocAgent Service — composition root: model initialization, summary cache,
//! session-keyed question answering.

pub mod agent;

pub use agent::{DocumentAgent, QaContext, SessionSummary, SummaryMetrics};
