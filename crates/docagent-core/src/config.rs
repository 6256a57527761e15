//! Configuration and data directory management.
//!
//! Every heuristic constant the pipeline depends on lives in one of the
//! settings structs below so it can be inspected and overridden (from
//! `docagent.json` or the environment) instead of being an inline literal.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Paths to all DocAgent data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Model directory (`data/models/`), one subdirectory per model.
    pub models: PathBuf,
    /// Pipeline settings (`data/docagent.json`).
    pub config_file: PathBuf,
    /// Remote LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            models: root.join("models"),
            config_file: root.join("docagent.json"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.models)?;
        Ok(())
    }

    /// Directory holding the sentence-embedding model.
    pub fn embedder_dir(&self) -> PathBuf {
        self.models.join("embedder")
    }

    /// Directory holding the seq2seq generation model.
    pub fn generator_dir(&self) -> PathBuf {
        self.models.join("generator")
    }

    /// Directory holding the extractive QA model.
    pub fn qa_dir(&self) -> PathBuf {
        self.models.join("qa")
    }
}

/// Summarization pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Character budget of one chunk in the chunked path.
    pub max_chunk_size: usize,
    /// Documents longer than `chunking_multiple * max_chunk_size` are chunked.
    pub chunking_multiple: usize,
    /// Minimum sentences the direct path hands to the generator.
    pub min_context_sentences: usize,
    /// Below this many extracted words the direct path widens its request.
    pub min_extracted_words: usize,
    /// Number of topic keywords kept in a content profile.
    pub topic_count: usize,
    /// Number of ranked keywords returned by the extractive pass.
    pub keyword_count: usize,
    /// Keywords named in the prompt / forced during constrained decoding.
    pub constrained_keyword_count: usize,
    pub num_beams: usize,
    pub constrained_num_beams: usize,
    pub length_penalty: f32,
    pub no_repeat_ngram_size: usize,
    /// Generation length bounds (tokens) for one chunk / direct pass.
    pub min_summary_tokens: usize,
    pub max_summary_tokens: usize,
    /// Generation length bounds (tokens) for the hierarchical final pass.
    pub final_min_summary_tokens: usize,
    pub final_max_summary_tokens: usize,
    /// First sentences shorter than this get a contextualizing lead-in.
    pub short_sentence_words: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            chunking_multiple: 2,
            min_context_sentences: 5,
            min_extracted_words: 50,
            topic_count: 5,
            keyword_count: 20,
            constrained_keyword_count: 5,
            num_beams: 4,
            constrained_num_beams: 6,
            length_penalty: 2.0,
            no_repeat_ngram_size: 3,
            min_summary_tokens: 30,
            max_summary_tokens: 200,
            final_min_summary_tokens: 60,
            final_max_summary_tokens: 320,
            short_sentence_words: 8,
        }
    }
}

impl SummarizerSettings {
    /// Cleaned-text length above which the chunked path is taken.
    pub fn chunking_threshold(&self) -> usize {
        self.max_chunk_size * self.chunking_multiple
    }
}

/// Question-answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    /// Minimum confidence ever reported for a successful answer. This is a
    /// product decision (never display a "low confidence" label), not a
    /// calibrated probability; set to 0.0 to report raw calibrated scores.
    pub confidence_floor: f64,
    pub confidence_ceiling: f64,
    /// Below this raw score the original document is searched as well.
    pub low_confidence_threshold: f64,
    /// The original-text answer must beat the summary answer by this much.
    pub fallback_margin: f64,
    /// Contexts longer than this (chars) are searched chunk by chunk.
    pub chunk_threshold: usize,
    /// Target size (chars) of one QA chunk.
    pub chunk_size: usize,
    /// Sentences carried over from one QA chunk into the next.
    pub chunk_overlap_sentences: usize,
    /// Chunks with fewer words are skipped.
    pub min_chunk_words: usize,
    /// Maximum answer span length (tokens).
    pub max_answer_len: usize,
    /// Capacity of the answer cache.
    pub cache_capacity: usize,
    /// Prefix lengths (chars) hashed into the cache key.
    pub question_key_chars: usize,
    pub context_key_chars: usize,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            confidence_ceiling: 0.95,
            low_confidence_threshold: 0.4,
            fallback_margin: 0.15,
            chunk_threshold: 600,
            chunk_size: 1500,
            chunk_overlap_sentences: 2,
            min_chunk_words: 5,
            max_answer_len: 100,
            cache_capacity: 50,
            question_key_chars: 100,
            context_key_chars: 500,
        }
    }
}

/// Service-level cache and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Summaries cached by content hash.
    pub summary_cache_capacity: usize,
    /// Maximum live QA sessions.
    pub session_capacity: usize,
    /// Seconds a QA session context stays available.
    pub session_ttl_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            summary_cache_capacity: 64,
            session_capacity: 256,
            session_ttl_secs: 3600,
        }
    }
}

/// Settings persisted in `docagent.json`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    summarizer: SummarizerSettings,
    qa: QaSettings,
    service: ServiceSettings,
}

/// Top-level DocAgent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub data_paths: DataPaths,
    pub summarizer: SummarizerSettings,
    pub qa: QaSettings,
    pub service: ServiceSettings,
}

impl AgentConfig {
    /// Create configuration from the settings file, environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> crate::Result<Self> {
        let data_paths = DataPaths::new(data_dir)?;

        let file: SettingsFile = match std::fs::read_to_string(&data_paths.config_file) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(_) => SettingsFile::default(),
        };

        let mut config = Self {
            data_paths,
            summarizer: file.summarizer,
            qa: file.qa,
            service: file.service,
        };
        config.apply_env_overrides();
        config.validate()?;

        info!(
            "Configuration loaded: max_chunk_size={}, confidence_floor={}",
            config.summarizer.max_chunk_size, config.qa.confidence_floor
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(size) = env_parse::<usize>("DOCAGENT_MAX_CHUNK_SIZE") {
            self.summarizer.max_chunk_size = size;
        }
        if let Some(floor) = env_parse::<f64>("DOCAGENT_CONFIDENCE_FLOOR") {
            self.qa.confidence_floor = floor;
        }
    }

    /// Reject settings that would break pipeline invariants.
    pub fn validate(&self) -> crate::Result<()> {
        if self.summarizer.max_chunk_size == 0 {
            return Err(crate::Error::Config("max_chunk_size must be > 0".into()));
        }
        if self.summarizer.chunking_multiple == 0 {
            return Err(crate::Error::Config("chunking_multiple must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.qa.confidence_floor)
            || self.qa.confidence_floor > self.qa.confidence_ceiling
        {
            return Err(crate::Error::Config(format!(
                "confidence floor {} must lie in [0, ceiling={}]",
                self.qa.confidence_floor, self.qa.confidence_ceiling
            )));
        }
        if self.qa.cache_capacity == 0 || self.service.session_capacity == 0 {
            return Err(crate::Error::Config("cache capacities must be > 0".into()));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}
