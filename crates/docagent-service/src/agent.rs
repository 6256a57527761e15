//! Document agent — owns the models, the summarizer, the answerer, the
//! summary cache and the session store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docagent_core::{AgentConfig, Error, Result};
use docagent_infer::{
    create_embedder, create_generator, create_qa, BoundedCache, EmbedderBackend, GeneratorBackend,
    QaBackend, RemoteLlmConfig,
};
use docagent_qa::{AnswerResult, QuestionAnswer, QuestionAnswerer};
use docagent_summarize::{HybridSummarizer, SummarizeOptions, SummaryOutput};
use docagent_text::{ExtractedDocument, PlainTextExtractor, TextExtractor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Text a session's questions are answered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaContext {
    pub summary: String,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    /// Characters in the submitted text.
    pub original_length: usize,
    pub summary_length: usize,
    /// `summary_length / original_length`, rounded to 3 decimals.
    pub compression_ratio: f64,
    pub processing_ms: u64,
}

/// Summary plus the session id for follow-up questions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Served from the summary cache.
    pub cached: bool,
    pub metrics: SummaryMetrics,
    #[serde(flatten)]
    pub output: SummaryOutput,
}

pub struct DocumentAgent {
    config: AgentConfig,
    summarizer: HybridSummarizer,
    answerer: QuestionAnswerer,
    extractor: Box<dyn TextExtractor>,
    summaries: BoundedCache<SummaryOutput>,
    sessions: BoundedCache<QaContext>,
}

impl DocumentAgent {
    /// Load every model once. A missing generator is fatal; the embedder and
    /// QA model fall back to their heuristic backends.
    pub fn initialize(config: AgentConfig) -> Result<Self> {
        let paths = &config.data_paths;
        let embedder = create_embedder(&paths.embedder_dir());
        let remote = RemoteLlmConfig::load(&paths.llm_config_file);
        let generator = create_generator(&paths.generator_dir(), &remote)?;
        let qa = create_qa(&paths.qa_dir());
        Ok(Self::with_backends(config, embedder, generator, qa))
    }

    /// Build an agent around already-constructed backends.
    pub fn with_backends(
        config: AgentConfig,
        embedder: Arc<dyn EmbedderBackend>,
        generator: Arc<dyn GeneratorBackend>,
        qa: Arc<dyn QaBackend>,
    ) -> Self {
        let summarizer = HybridSummarizer::new(embedder, generator, config.summarizer.clone());
        let answerer = QuestionAnswerer::new(qa, config.qa.clone());
        let summaries = BoundedCache::new(config.service.summary_cache_capacity);
        let sessions = BoundedCache::with_ttl(
            config.service.session_capacity,
            Duration::from_secs(config.service.session_ttl_secs),
        );
        info!(
            "Document agent ready: sessions={} (ttl {}s), summary cache={}",
            config.service.session_capacity,
            config.service.session_ttl_secs,
            config.service.summary_cache_capacity
        );
        Self {
            config,
            summarizer,
            answerer,
            extractor: Box::new(PlainTextExtractor),
            summaries,
            sessions,
        }
    }

    /// Replace the document text extractor.
    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Summarize `text` and open a QA session over the result.
    pub fn summarize_text(&self, text: &str, options: &SummarizeOptions) -> Result<SessionSummary> {
        let key = summary_key(text, options);
        let (output, cached) = match self.summaries.get(&key) {
            Some(output) => {
                debug!("Summary cache hit");
                (output, true)
            }
            None => {
                let output = self.summarizer.summarize(text, options)?;
                self.summaries.put(key, output.clone());
                (output, false)
            }
        };

        let original_length = text.chars().count();
        let summary_length = output.summary.chars().count();
        let metrics = SummaryMetrics {
            original_length,
            summary_length,
            compression_ratio: ((summary_length as f64 / original_length.max(1) as f64) * 1000.0)
                .round()
                / 1000.0,
            processing_ms: output.elapsed_ms,
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions.put(
            session_id.clone(),
            QaContext {
                summary: output.summary.clone(),
                original_text: text.to_string(),
                created_at: Utc::now(),
            },
        );
        info!(
            "Session {} opened: {} -> {} chars{}",
            session_id,
            original_length,
            summary_length,
            if cached { " (cached)" } else { "" }
        );

        Ok(SessionSummary {
            session_id,
            title: None,
            cached,
            metrics,
            output,
        })
    }

    /// Extract text from an uploaded document and summarize it.
    pub fn summarize_document(
        &self,
        bytes: &[u8],
        filename: &str,
        options: &SummarizeOptions,
    ) -> Result<SessionSummary> {
        let doc = self.extractor.extract(bytes, filename)?;
        self.summarize_extracted(doc, options)
    }

    pub fn summarize_file(&self, path: &Path, options: &SummarizeOptions) -> Result<SessionSummary> {
        let doc = self.extractor.extract_path(path)?;
        self.summarize_extracted(doc, options)
    }

    fn summarize_extracted(&self, doc: ExtractedDocument, options: &SummarizeOptions) -> Result<SessionSummary> {
        let mut result = self.summarize_text(&doc.text, options)?;
        result.title = doc.metadata.title;
        Ok(result)
    }

    /// Answer a question against a session's summary, falling back to the
    /// session's original text.
    pub fn ask(&self, session_id: &str, question: &str) -> Result<AnswerResult> {
        let ctx = self.session(session_id)?;
        Ok(self
            .answerer
            .answer(question, &ctx.summary, Some(&ctx.original_text)))
    }

    /// Answer with a window of surrounding text attached.
    pub fn ask_with_context(&self, session_id: &str, question: &str, window: usize) -> Result<AnswerResult> {
        let ctx = self.session(session_id)?;
        Ok(self
            .answerer
            .answer_with_snippet(question, &ctx.summary, Some(&ctx.original_text), window))
    }

    pub fn ask_many<S: AsRef<str>>(&self, session_id: &str, questions: &[S]) -> Result<Vec<QuestionAnswer>> {
        let ctx = self.session(session_id)?;
        Ok(self
            .answerer
            .answer_many(questions, &ctx.summary, Some(&ctx.original_text)))
    }

    /// Close a session. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.take(session_id).is_some()
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired_sessions(&self) -> usize {
        let removed = self.sessions.purge_expired();
        if removed > 0 {
            debug!("Purged {} expired sessions", removed);
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, session_id: &str) -> Result<QaContext> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
    }
}

fn summary_key(text: &str, options: &SummarizeOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}|{}|{}|",
            options.quality_mode, options.use_chunking, options.verbose
        )
        .as_bytes(),
    );
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docagent_core::QualityMode;

    #[test]
    fn test_summary_key_depends_on_options() {
        let balanced = SummarizeOptions::default();
        let fast = SummarizeOptions {
            quality_mode: QualityMode::Fast,
            ..Default::default()
        };
        assert_eq!(summary_key("text", &balanced), summary_key("text", &balanced));
        assert_ne!(summary_key("text", &balanced), summary_key("text", &fast));
        assert_ne!(summary_key("text", &balanced), summary_key("other", &balanced));
    }
}
