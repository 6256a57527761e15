//! Hybrid Orchestrator — perception → planning → extract/generate (direct
//! or chunked with hierarchical re-summarization) → post-processing.

use std::sync::Arc;

use docagent_core::{Error, QualityMode, Result, SummarizerSettings};
use docagent_infer::{EmbedderBackend, GeneratorBackend};
use docagent_text::analyze::analyze_with;
use docagent_text::cleaning::clean_for_summarization;
use docagent_text::sentences::word_count;
use docagent_text::{ContentProfile, DocumentChunker};
use serde::Serialize;
use tracing::{debug, info};

use crate::abstractive::AbstractiveGenerator;
use crate::extractive::{ExtractionResult, ExtractiveSelector, ScoringWeights};
use crate::planner::{plan, Approach, ProcessingStrategy};
use crate::postprocess::finalize;
use crate::trace::SummaryTrace;

/// Generated tokens per extracted word before complexity scaling.
const SUMMARY_RATIO: f64 = 0.6;

/// Per-request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummarizeOptions {
    pub quality_mode: QualityMode,
    pub use_chunking: bool,
    /// Return the stage trace alongside the summary.
    pub verbose: bool,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            quality_mode: QualityMode::Balanced,
            use_chunking: true,
            verbose: false,
        }
    }
}

/// Result of one `summarize` call.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    pub summary: String,
    /// Stage log, present only for verbose requests.
    pub trace: Option<Vec<String>>,
    pub strategy: ProcessingStrategy,
    pub profile: ContentProfile,
    /// Keywords of the final extractive pass.
    pub keywords: Vec<String>,
    /// Chunks actually summarized (0 on the direct path).
    pub chunk_count: usize,
    pub elapsed_ms: u64,
}

/// Top-level summarizer that sequences the pipeline stages.
pub struct HybridSummarizer {
    selector: ExtractiveSelector,
    generator: AbstractiveGenerator,
    chunker: DocumentChunker,
    settings: SummarizerSettings,
}

impl HybridSummarizer {
    pub fn new(
        embedder: Arc<dyn EmbedderBackend>,
        generator: Arc<dyn GeneratorBackend>,
        settings: SummarizerSettings,
    ) -> Self {
        let selector = ExtractiveSelector::new(embedder)
            .with_keyword_count(settings.keyword_count)
            .with_min_context(settings.min_context_sentences);
        let generator = AbstractiveGenerator::new(generator, &settings);

        info!(
            "Summarizer initialized: generator={}, max_chunk_size={}",
            generator.backend_name(),
            settings.max_chunk_size
        );

        Self {
            selector,
            generator,
            chunker: DocumentChunker::new(),
            settings,
        }
    }

    /// Replace the sentence-scoring weights.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.selector = self.selector.with_weights(weights);
        self
    }

    pub fn settings(&self) -> &SummarizerSettings {
        &self.settings
    }

    /// Summarize `text`.
    ///
    /// Empty input fails with `Error::Input` before any model is called. Any
    /// failure after planning is reported as `Error::Summarization`; no
    /// partial summary is returned.
    pub fn summarize(&self, text: &str, options: &SummarizeOptions) -> Result<SummaryOutput> {
        let mut trace = SummaryTrace::new();

        // Perception
        if text.trim().is_empty() {
            return Err(Error::Input("input text is empty".into()));
        }
        let cleaned = clean_for_summarization(text);
        if cleaned.is_empty() {
            return Err(Error::Input("no readable text after cleaning".into()));
        }
        let text_len = cleaned.chars().count();
        let profile = analyze_with(&cleaned, self.settings.topic_count);
        trace.record(format!(
            "Perception: {} chars ({} cleaned), {} sentences, type={}, complexity={:.2}, topics=[{}]",
            text.chars().count(),
            text_len,
            profile.num_sentences,
            profile.content_type,
            profile.complexity,
            profile.topics.join(", ")
        ));

        // Planning
        let strategy = plan(
            &profile,
            text_len,
            options.quality_mode,
            options.use_chunking,
            &self.settings,
        );
        trace.record(format!(
            "Planning: mode={}, approach={}, sentences={}, chunks={}, refine={}, constrained={}",
            strategy.quality_mode,
            strategy.approach,
            strategy.extractive_sentence_count,
            strategy.num_chunks,
            strategy.refine,
            strategy.use_constrained
        ));

        // Action
        let action = match strategy.approach {
            Approach::Direct => self.run_direct(&cleaned, &profile, &strategy, &mut trace),
            Approach::Chunked => self.run_chunked(&cleaned, &profile, &strategy, &mut trace),
        };
        let (draft, keywords, chunk_count) =
            action.map_err(|e| Error::Summarization(e.to_string()))?;

        // Post-processing
        let summary = finalize(&draft, &profile, self.settings.short_sentence_words);
        trace.record(format!(
            "Post-processing: {} words, {:.1}% of input",
            word_count(&summary),
            summary.chars().count() as f64 * 100.0 / text_len as f64
        ));

        let elapsed_ms = trace.elapsed_ms();
        info!(
            "Summarized {} chars via {} path in {} ms",
            text_len, strategy.approach, elapsed_ms
        );

        Ok(SummaryOutput {
            summary,
            trace: options.verbose.then(|| trace.into_lines()),
            strategy,
            profile,
            keywords,
            chunk_count,
            elapsed_ms,
        })
    }

    fn run_direct(
        &self,
        cleaned: &str,
        profile: &ContentProfile,
        strategy: &ProcessingStrategy,
        trace: &mut SummaryTrace,
    ) -> Result<(String, Vec<String>, usize)> {
        let count = strategy.extractive_sentence_count;
        let mut extraction = self.selector.select(cleaned, count, true)?;
        record_extraction(trace, "Extraction", &extraction);

        if strategy.refine
            && !extraction.short_circuited
            && word_count(&extraction.text) < self.settings.min_extracted_words
        {
            extraction = self.selector.select(cleaned, count * 2, true)?;
            record_extraction(trace, "Refined extraction", &extraction);
        }

        let (min_len, max_len) = length_bounds(
            word_count(&extraction.text),
            profile.complexity,
            self.settings.min_summary_tokens,
            self.settings.max_summary_tokens,
        );
        trace.record(format!("Generation: {}..{} tokens", min_len, max_len));
        let summary = self.generator.generate(
            &extraction.text,
            &extraction.keywords,
            max_len,
            min_len,
            strategy.use_constrained,
        )?;
        Ok((summary, extraction.keywords, 0))
    }

    fn run_chunked(
        &self,
        cleaned: &str,
        profile: &ContentProfile,
        strategy: &ProcessingStrategy,
        trace: &mut SummaryTrace,
    ) -> Result<(String, Vec<String>, usize)> {
        let chunks = self.chunker.chunk(cleaned, strategy.chunk_size);
        trace.record(format!("Chunking: {} chunks of <= {} chars", chunks.len(), strategy.chunk_size));
        if chunks.is_empty() {
            return Err(Error::Summarization("chunker produced no chunks".into()));
        }

        let count = strategy.extractive_sentence_count;
        let mut summaries = Vec::with_capacity(chunks.len());
        let mut last_keywords = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let extraction = self.selector.select(&chunk.text, count, true)?;
            let (min_len, max_len) = length_bounds(
                word_count(&extraction.text),
                profile.complexity,
                self.settings.min_summary_tokens,
                self.settings.max_summary_tokens,
            );
            let summary = self.generator.generate(
                &extraction.text,
                &extraction.keywords,
                max_len,
                min_len,
                strategy.use_constrained,
            )?;
            debug!("Chunk {}/{}: {} chars -> {} chars", i + 1, chunks.len(), chunk.len(), summary.len());
            summaries.push(summary);
            last_keywords = extraction.keywords;
        }
        trace.record(format!("Chunk summaries: {}", summaries.len()));

        if summaries.len() == 1 {
            let summary = summaries.remove(0);
            return Ok((summary, last_keywords, 1));
        }

        // Hierarchical re-summarization over the joined chunk summaries
        let combined = summaries.join(" ");
        let extraction = self
            .selector
            .select(&combined, count.max(chunks.len()), true)?;
        record_extraction(trace, "Re-summarization extraction", &extraction);

        let (min_len, max_len) = length_bounds(
            word_count(&extraction.text),
            profile.complexity,
            self.settings.final_min_summary_tokens,
            self.settings.final_max_summary_tokens,
        );
        trace.record(format!("Final generation: {}..{} tokens", min_len, max_len));
        let summary = self.generator.generate(
            &extraction.text,
            &extraction.keywords,
            max_len,
            min_len,
            strategy.use_constrained,
        )?;
        Ok((summary, extraction.keywords, chunks.len()))
    }
}

fn record_extraction(trace: &mut SummaryTrace, stage: &str, extraction: &ExtractionResult) {
    let preview: Vec<&str> = extraction.keywords.iter().take(5).map(String::as_str).collect();
    trace.record(format!(
        "{}: {}/{} sentences, {} words{}, keywords=[{}]",
        stage,
        extraction.selected_indices.len(),
        extraction.total_sentences,
        word_count(&extraction.text),
        if extraction.short_circuited { " (whole text)" } else { "" },
        preview.join(", ")
    ));
}

/// Generation bounds `(min, max)` in tokens for `words` extracted words.
///
/// The maximum grows with the extracted length and with complexity, staying
/// within `[2 * min_tokens, max_tokens]`.
pub fn length_bounds(words: usize, complexity: f64, min_tokens: usize, max_tokens: usize) -> (usize, usize) {
    let floor = min_tokens * 2;
    let ceiling = max_tokens.max(floor);
    let scaled = (words as f64 * SUMMARY_RATIO * (1.0 + complexity.clamp(0.0, 1.0))).round() as usize;
    let max_len = scaled.clamp(floor, ceiling);
    (min_tokens.min(max_len / 2), max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds_scale() {
        assert_eq!(length_bounds(10, 0.0, 30, 200), (30, 60));
        let (_, simple) = length_bounds(150, 0.0, 30, 200);
        let (_, complex) = length_bounds(150, 0.8, 30, 200);
        assert!(complex > simple);
        assert_eq!(length_bounds(5000, 1.0, 30, 200), (30, 200));
    }

    #[test]
    fn test_default_options() {
        let options = SummarizeOptions::default();
        assert_eq!(options.quality_mode, QualityMode::Balanced);
        assert!(options.use_chunking);
        assert!(!options.verbose);
    }
}
