//! DocAgent Summarize — extractive selection, abstractive generation and the
//! hybrid orchestrator that sequences them.

pub mod abstractive;
pub mod extractive;
pub mod orchestrator;
pub mod planner;
pub mod postprocess;
pub mod trace;

pub use abstractive::AbstractiveGenerator;
pub use extractive::{ExtractionResult, ExtractiveSelector, ScoringWeights, OPTIMAL_SENTENCE_WORDS};
pub use orchestrator::{HybridSummarizer, SummarizeOptions, SummaryOutput};
pub use planner::{plan, Approach, ProcessingStrategy};
pub use trace::SummaryTrace;
