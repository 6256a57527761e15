//! Abstractive Generator — prompt construction, beam-search parameters,
//! constrained-decoding fallback and output polishing.

use std::sync::Arc;

use docagent_core::{Error, Result, SummarizerSettings};
use docagent_infer::{GenerationRequest, GeneratorBackend};
use docagent_text::cleaning::polish;
use docagent_text::split_sentences;
use tracing::{debug, warn};

pub struct AbstractiveGenerator {
    backend: Arc<dyn GeneratorBackend>,
    num_beams: usize,
    constrained_num_beams: usize,
    length_penalty: f32,
    no_repeat_ngram_size: usize,
    keyword_count: usize,
}

impl AbstractiveGenerator {
    pub fn new(backend: Arc<dyn GeneratorBackend>, settings: &SummarizerSettings) -> Self {
        Self {
            backend,
            num_beams: settings.num_beams,
            constrained_num_beams: settings.constrained_num_beams,
            length_penalty: settings.length_penalty,
            no_repeat_ngram_size: settings.no_repeat_ngram_size,
            keyword_count: settings.constrained_keyword_count,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Build the generation prompt, naming up to `keyword_count` keywords.
    pub fn prompt(&self, text: &str, keywords: &[String]) -> String {
        let named = &keywords[..keywords.len().min(self.keyword_count)];
        if named.is_empty() {
            format!(
                "Summarize the following text comprehensively, staying faithful to its facts: {}",
                text
            )
        } else {
            format!(
                "Summarize the following text comprehensively, staying faithful to its facts \
                 and covering key concepts such as {}: {}",
                named.join(", "),
                text
            )
        }
    }

    /// Generate a polished summary of `text`.
    ///
    /// With `use_constrained` and keywords present, decoding first forces the
    /// top keywords into the output; if that fails, one unconstrained attempt
    /// with the same lengths follows. Never returns an empty string.
    pub fn generate(
        &self,
        text: &str,
        keywords: &[String],
        max_length: usize,
        min_length: usize,
        use_constrained: bool,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Input("nothing to summarize".into()));
        }

        let mut request = GenerationRequest::new(self.prompt(text, keywords), min_length, max_length);
        request.num_beams = self.num_beams;
        request.length_penalty = self.length_penalty;
        request.no_repeat_ngram_size = self.no_repeat_ngram_size;

        let forced: Vec<String> = keywords.iter().take(self.keyword_count).cloned().collect();
        let raw = if use_constrained && !forced.is_empty() {
            let constrained = GenerationRequest {
                num_beams: self.constrained_num_beams,
                force_words: forced,
                ..request.clone()
            };
            match self.backend.generate(&constrained) {
                Ok(out) => out,
                Err(e) => {
                    warn!("Constrained decoding failed, falling back to standard generation: {}", e);
                    self.run(&request)?
                }
            }
        } else {
            self.run(&request)?
        };

        let summary = polish(&raw);
        if !summary.is_empty() {
            debug!(
                "Generated {} chars with {} ({}..{} tokens)",
                summary.len(),
                self.backend.name(),
                request.min_length,
                request.max_length
            );
            return Ok(summary);
        }

        warn!("Generator returned empty output; using the lead sentence");
        let lead = split_sentences(text).first().copied().unwrap_or(text);
        Ok(polish(lead))
    }

    fn run(&self, request: &GenerationRequest) -> Result<String> {
        self.backend.generate(request).map_err(|e| match e {
            Error::Inference(_) => e,
            other => Error::Inference(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records requests; fails constrained calls when asked to.
    struct Recorder {
        reply: String,
        fail_constrained: bool,
        fail_all: bool,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl Recorder {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail_constrained: false,
                fail_all: false,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl GeneratorBackend for Recorder {
        fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_all || (self.fail_constrained && request.is_constrained()) {
                return Err(Error::Inference("forced tokens not in vocabulary".into()));
            }
            Ok(self.reply.clone())
        }
        fn name(&self) -> &str {
            "recorder"
        }
    }

    fn generator(backend: Arc<Recorder>) -> AbstractiveGenerator {
        AbstractiveGenerator::new(backend, &SummarizerSettings::default())
    }

    fn keywords() -> Vec<String> {
        ["glacier", "melting", "climate", "ice", "sea", "level"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_output_is_polished() {
        let backend = Arc::new(Recorder::new("glaciers  are retreating ,fast"));
        let out = generator(backend).generate("Glaciers retreat.", &[], 100, 10, false).unwrap();
        assert_eq!(out, "Glaciers are retreating, fast.");
    }

    #[test]
    fn test_prompt_names_top_keywords() {
        let backend = Arc::new(Recorder::new("ok"));
        let g = generator(backend.clone());
        g.generate("Glaciers retreat.", &keywords(), 100, 10, false).unwrap();
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("glacier, melting, climate, ice, sea:"));
        assert!(!requests[0].prompt.contains("level"));
        assert!(!requests[0].is_constrained());
        assert_eq!(requests[0].num_beams, 4);
    }

    #[test]
    fn test_constrained_request_parameters() {
        let backend = Arc::new(Recorder::new("ok"));
        generator(backend.clone())
            .generate("Glaciers retreat.", &keywords(), 120, 20, true)
            .unwrap();
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].num_beams, 6);
        assert_eq!(requests[0].force_words.len(), 5);
        assert_eq!(requests[0].no_repeat_ngram_size, 3);
    }

    #[test]
    fn test_constrained_failure_falls_back_once() {
        let mut recorder = Recorder::new("the ice sheet shrinks");
        recorder.fail_constrained = true;
        let backend = Arc::new(recorder);
        let out = generator(backend.clone())
            .generate("Glaciers retreat.", &keywords(), 120, 20, true)
            .unwrap();
        assert_eq!(out, "The ice sheet shrinks.");

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].is_constrained());
        assert!(!requests[1].is_constrained());
        assert_eq!(
            (requests[0].min_length, requests[0].max_length),
            (requests[1].min_length, requests[1].max_length)
        );
    }

    #[test]
    fn test_unconstrained_failure_propagates() {
        let mut recorder = Recorder::new("unused");
        recorder.fail_all = true;
        let err = generator(Arc::new(recorder))
            .generate("Glaciers retreat.", &keywords(), 120, 20, true)
            .unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_empty_output_uses_lead_sentence() {
        let backend = Arc::new(Recorder::new("   "));
        let out = generator(backend)
            .generate("glaciers retreat quickly. Seas rise.", &[], 100, 10, false)
            .unwrap();
        assert_eq!(out, "Glaciers retreat quickly.");
    }

    #[test]
    fn test_empty_input_rejected() {
        let backend = Arc::new(Recorder::new("x"));
        assert!(matches!(
            generator(backend).generate("  ", &[], 100, 10, false),
            Err(Error::Input(_))
        ));
    }
}
