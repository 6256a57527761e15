//! ONNX seq2seq generator (T5-style encoder/decoder export).
//!
//! Expects `encoder_model.onnx`, `decoder_model.onnx` and `tokenizer.json`
//! in the model directory, plus an optional `config.json` carrying
//! `decoder_start_token_id` / `eos_token_id`. Decoding runs the decoder
//! without a KV cache under [`crate::beam::beam_search`]. Requires the
//! `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use docagent_core::{Error, Result};
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use crate::beam::{beam_search, BeamSearchConfig, DecoderStep};
    use crate::generator::{GenerationRequest, GeneratorBackend};

    const MAX_INPUT_TOKENS: usize = 512;

    #[derive(Debug, Deserialize)]
    struct ModelConfig {
        #[serde(default)]
        decoder_start_token_id: Option<u32>,
        #[serde(default)]
        eos_token_id: Option<u32>,
        #[serde(default)]
        pad_token_id: Option<u32>,
    }

    pub struct OnnxGenerator {
        encoder: Mutex<Session>,
        decoder: Mutex<Session>,
        tokenizer: Tokenizer,
        decoder_start_token_id: u32,
        eos_token_id: u32,
    }

    impl OnnxGenerator {
        pub fn load(model_dir: &Path) -> Result<Self> {
            let encoder_path = model_dir.join("encoder_model.onnx");
            let decoder_path = model_dir.join("decoder_model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            crate::require_files(&[&encoder_path, &decoder_path, &tokenizer_path])?;

            let config: Option<ModelConfig> = std::fs::read_to_string(model_dir.join("config.json"))
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok());
            let (start, eos) = match &config {
                Some(c) => (
                    c.decoder_start_token_id.or(c.pad_token_id).unwrap_or(0),
                    c.eos_token_id.unwrap_or(1),
                ),
                None => (0, 1),
            };

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::ModelUnavailable(format!("Failed to load tokenizer: {}", e)))?;

            let generator = Self {
                encoder: Mutex::new(crate::onnx_session(&encoder_path)?),
                decoder: Mutex::new(crate::onnx_session(&decoder_path)?),
                tokenizer,
                decoder_start_token_id: start,
                eos_token_id: eos,
            };
            info!("ONNX generator loaded from {}", model_dir.display());
            Ok(generator)
        }

        fn encode(&self, prompt: &str) -> Result<(Vec<f32>, Vec<i64>, usize, usize)> {
            let encoding = self
                .tokenizer
                .encode(prompt, true)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;
            let seq_len = encoding.get_ids().len().min(MAX_INPUT_TOKENS);
            if seq_len == 0 {
                return Err(Error::Inference("empty prompt after tokenization".into()));
            }
            let ids: Vec<i64> = encoding.get_ids()[..seq_len].iter().map(|&i| i as i64).collect();
            let mask = vec![1i64; seq_len];

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids)).map_err(crate::ort_err)?;
            let mask_tensor =
                Tensor::from_array(([1usize, seq_len], mask.clone())).map_err(crate::ort_err)?;

            let mut encoder = self.encoder.lock();
            let outputs = encoder
                .run(ort::inputs![
                    "input_ids" => ids_tensor,
                    "attention_mask" => mask_tensor,
                ])
                .map_err(crate::ort_err)?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(crate::ort_err)?;
            let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
                [_, _, h] => *h as usize,
                other => {
                    return Err(Error::Inference(format!(
                        "Unexpected encoder output shape: {:?}",
                        other
                    )))
                }
            };
            Ok((data.to_vec(), mask, seq_len, hidden_dim))
        }

        /// Token ids of a forced word, without special tokens.
        fn word_ids(&self, word: &str) -> Result<Vec<u32>> {
            let encoding = self
                .tokenizer
                .encode(word, false)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;
            Ok(encoding
                .get_ids()
                .iter()
                .copied()
                .filter(|&id| id != self.eos_token_id)
                .collect())
        }
    }

    struct DecoderRun<'a> {
        decoder: &'a Mutex<Session>,
        hidden: &'a [f32],
        mask: &'a [i64],
        seq_len: usize,
        hidden_dim: usize,
    }

    impl DecoderStep for DecoderRun<'_> {
        fn next_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
            let batch = prefixes.len();
            let cur = prefixes.first().map(Vec::len).unwrap_or(0);
            if batch == 0 || prefixes.iter().any(|p| p.len() != cur) {
                return Err(Error::Inference("beam prefixes must share one length".into()));
            }

            let ids: Vec<i64> = prefixes.iter().flatten().map(|&t| t as i64).collect();
            let hidden: Vec<f32> = self.hidden.repeat(batch);
            let mask: Vec<i64> = self.mask.repeat(batch);

            let ids_tensor = Tensor::from_array(([batch, cur], ids)).map_err(crate::ort_err)?;
            let mask_tensor =
                Tensor::from_array(([batch, self.seq_len], mask)).map_err(crate::ort_err)?;
            let hidden_tensor = Tensor::from_array(([batch, self.seq_len, self.hidden_dim], hidden))
                .map_err(crate::ort_err)?;

            let mut decoder = self.decoder.lock();
            let outputs = decoder
                .run(ort::inputs![
                    "input_ids" => ids_tensor,
                    "encoder_attention_mask" => mask_tensor,
                    "encoder_hidden_states" => hidden_tensor,
                ])
                .map_err(crate::ort_err)?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(crate::ort_err)?;
            let vocab = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
                [_, _, v] => *v as usize,
                other => {
                    return Err(Error::Inference(format!(
                        "Unexpected decoder output shape: {:?}",
                        other
                    )))
                }
            };

            // Logits of the last position of each row
            Ok((0..batch)
                .map(|b| {
                    let offset = (b * cur + cur - 1) * vocab;
                    data[offset..offset + vocab].to_vec()
                })
                .collect())
        }
    }

    impl GeneratorBackend for OnnxGenerator {
        fn generate(&self, request: &GenerationRequest) -> Result<String> {
            let (hidden, mask, seq_len, hidden_dim) = self.encode(&request.prompt)?;

            let constraints = request
                .force_words
                .iter()
                .map(|w| self.word_ids(w))
                .collect::<Result<Vec<_>>>()?;

            let config = BeamSearchConfig {
                num_beams: request.num_beams,
                min_length: request.min_length,
                max_length: request.max_length,
                length_penalty: request.length_penalty,
                no_repeat_ngram_size: request.no_repeat_ngram_size,
                decoder_start_token_id: self.decoder_start_token_id,
                eos_token_id: self.eos_token_id,
                constraints,
            };

            let mut run = DecoderRun {
                decoder: &self.decoder,
                hidden: &hidden,
                mask: &mask,
                seq_len,
                hidden_dim,
            };
            let tokens = beam_search(&mut run, &config)?;
            debug!("Generated {} tokens", tokens.len());

            self.tokenizer
                .decode(&tokens, true)
                .map_err(|e| Error::Inference(format!("Detokenization failed: {}", e)))
        }

        fn name(&self) -> &str {
            "onnx-seq2seq"
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxGenerator;
