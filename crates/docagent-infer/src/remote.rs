//! Remote generation over OpenAI-compatible chat completion APIs.
//!
//! Used when no local seq2seq model is installed. OpenAI, Groq and any
//! server speaking the same protocol (set `base_url`) are supported.

use std::path::Path;
use std::time::Duration;

use docagent_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::generator::{GenerationRequest, GeneratorBackend};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You write concise, factually faithful summaries. \
Use only information present in the provided text.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Groq,
    /// Any OpenAI-compatible server at `base_url`.
    Custom,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::Groq => write!(f, "groq"),
            LlmProvider::Custom => write!(f, "custom"),
        }
    }
}

/// Stored remote LLM configuration (`llm-config.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    /// Chat completions URL of a self-hosted server.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub custom_model: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}
fn default_timeout() -> u64 {
    60
}

impl Default for RemoteLlmConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            groq_model: default_groq_model(),
            base_url: None,
            custom_model: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Provider chosen for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub provider: LlmProvider,
    pub model: String,
    pub url: String,
    pub api_key: Option<String>,
}

impl RemoteLlmConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: RemoteLlmConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        if config.openai_api_key.is_none() {
            config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if config.groq_api_key.is_none() {
            config.groq_api_key = std::env::var("GROQ_API_KEY").ok();
        }
        if config.base_url.is_none() {
            config.base_url = std::env::var("DOCAGENT_LLM_BASE_URL").ok();
        }
        config
    }

    /// Resolve which provider and model to use.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        let openai = || {
            self.openai_api_key.as_ref().map(|k| ResolvedProvider {
                provider: LlmProvider::OpenAI,
                model: self.openai_model.clone(),
                url: OPENAI_URL.into(),
                api_key: Some(k.clone()),
            })
        };
        let groq = || {
            self.groq_api_key.as_ref().map(|k| ResolvedProvider {
                provider: LlmProvider::Groq,
                model: self.groq_model.clone(),
                url: GROQ_URL.into(),
                api_key: Some(k.clone()),
            })
        };
        let custom = || {
            self.base_url.as_ref().map(|url| ResolvedProvider {
                provider: LlmProvider::Custom,
                model: self
                    .custom_model
                    .clone()
                    .unwrap_or_else(|| self.openai_model.clone()),
                url: url.clone(),
                api_key: self.openai_api_key.clone(),
            })
        };

        match self.preferred_provider.as_str() {
            "openai" => openai(),
            "groq" => groq(),
            "custom" => custom(),
            // Auto mode: custom server > Groq > OpenAI
            "auto" => custom().or_else(groq).or_else(openai),
            _ => None,
        }
    }
}

/// Generator backed by a remote chat completions endpoint.
pub struct RemoteGenerator {
    client: reqwest::blocking::Client,
    target: ResolvedProvider,
    temperature: f64,
}

impl RemoteGenerator {
    pub fn new(config: &RemoteLlmConfig) -> Result<Self> {
        let target = config.resolve_provider().ok_or_else(|| {
            Error::ModelUnavailable("no remote LLM provider configured".into())
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        info!("Remote generator: provider={}, model={}", target.provider, target.model);
        Ok(Self {
            client,
            target,
            temperature: 0.2,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.target.provider
    }
}

impl GeneratorBackend for RemoteGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if request.is_constrained() {
            // Chat APIs cannot force tokens; let the caller fall back
            return Err(Error::Inference(
                "remote generation does not support forced-word decoding".into(),
            ));
        }

        let body = json!({
            "model": self.target.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": self.temperature,
            "max_tokens": request.max_length,
        });

        debug!("Requesting completion from {} with model {}", self.target.url, self.target.model);

        let mut req = self.client.post(&self.target.url).json(&body);
        if let Some(key) = &self.target.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        let response = req
            .send()
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(Error::Http(format!("API error {}: {}", status, text)));
        }

        let parsed: serde_json::Value = response
            .json()
            .map_err(|e| Error::Http(format!("Invalid response body: {}", e)))?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::Inference("completion response had no content".into()))
    }

    fn name(&self) -> &str {
        "remote-chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(
            &path,
            r#"{"preferred_provider": "groq", "groq_api_key": "gk", "groq_model": "llama-3.1-8b-instant"}"#,
        )
        .unwrap();

        let config = RemoteLlmConfig::load(&path);
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LlmProvider::Groq);
        assert_eq!(resolved.model, "llama-3.1-8b-instant");
        assert_eq!(resolved.api_key.as_deref(), Some("gk"));
    }

    #[test]
    fn test_auto_prefers_custom_server() {
        let config = RemoteLlmConfig {
            openai_api_key: Some("ok".into()),
            base_url: Some("http://localhost:8080/v1/chat/completions".into()),
            custom_model: Some("local-t5".into()),
            ..Default::default()
        };
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LlmProvider::Custom);
        assert_eq!(resolved.model, "local-t5");
    }

    #[test]
    fn test_explicit_provider_without_key() {
        let config = RemoteLlmConfig {
            preferred_provider: "openai".into(),
            ..Default::default()
        };
        assert!(config.resolve_provider().is_none());
        assert!(matches!(
            RemoteGenerator::new(&config),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_constrained_request_rejected() {
        let config = RemoteLlmConfig {
            preferred_provider: "custom".into(),
            base_url: Some("http://127.0.0.1:9/none".into()),
            ..Default::default()
        };
        let generator = RemoteGenerator::new(&config).unwrap();
        let mut request = GenerationRequest::new("Summarize: text", 5, 50);
        request.force_words = vec!["text".into()];
        assert!(matches!(generator.generate(&request), Err(Error::Inference(_))));
    }
}
