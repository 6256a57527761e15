//! Human-readable record of one pipeline run.

use std::time::Instant;

use tracing::debug;

/// Ordered stage log. Recording never affects pipeline behavior.
#[derive(Debug)]
pub struct SummaryTrace {
    started: Instant,
    lines: Vec<String>,
}

impl SummaryTrace {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            lines: Vec::new(),
        }
    }

    pub fn record(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("{}", line);
        self.lines.push(format!("[{} ms] {}", self.elapsed_ms(), line));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl Default for SummaryTrace {
    fn default() -> Self {
        Self::new()
    }
}
