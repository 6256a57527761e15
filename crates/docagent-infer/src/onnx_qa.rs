//! ONNX extractive QA (SQuAD-style start/end logits).
//!
//! Expects `model.onnx` and `tokenizer.json`; `config.json` is read for
//! `model_type` to decide whether the model takes `token_type_ids`
//! (BERT does, DistilBERT does not). Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use docagent_core::{Error, Result};
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::info;

    use crate::qa::{best_span, QaBackend, QaSpan};

    const MAX_SEQ_LEN: usize = 512;

    pub struct OnnxQaBackend {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        uses_token_types: bool,
    }

    impl OnnxQaBackend {
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            crate::require_files(&[&model_path, &tokenizer_path])?;

            let model_type = std::fs::read_to_string(model_dir.join("config.json"))
                .ok()
                .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
                .and_then(|v| v.get("model_type").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_default();
            let uses_token_types = !matches!(model_type.as_str(), "distilbert" | "roberta");

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::ModelUnavailable(format!("Failed to load tokenizer: {}", e)))?;

            info!(
                "ONNX QA model loaded: type={}, model={}",
                if model_type.is_empty() { "unknown" } else { &model_type },
                model_path.display()
            );
            Ok(Self {
                session: Mutex::new(crate::onnx_session(&model_path)?),
                tokenizer,
                uses_token_types,
            })
        }
    }

    impl QaBackend for OnnxQaBackend {
        fn answer(&self, question: &str, context: &str, max_answer_len: usize) -> Result<QaSpan> {
            let encoding = self
                .tokenizer
                .encode((question, context), true)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            let ids: Vec<i64> = encoding.get_ids()[..seq_len].iter().map(|&i| i as i64).collect();
            let mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
                .iter()
                .map(|&m| m as i64)
                .collect();
            let type_ids: Vec<i64> = encoding.get_type_ids()[..seq_len]
                .iter()
                .map(|&t| t as i64)
                .collect();
            // Only context tokens may start or end an answer
            let allowed: Vec<bool> = encoding.get_sequence_ids()[..seq_len]
                .iter()
                .map(|s| *s == Some(1))
                .collect();

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids)).map_err(crate::ort_err)?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask)).map_err(crate::ort_err)?;

            let mut session = self.session.lock();
            let outputs = if self.uses_token_types {
                let type_tensor =
                    Tensor::from_array(([1usize, seq_len], type_ids)).map_err(crate::ort_err)?;
                session.run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
            } else {
                session.run(ort::inputs![ids_tensor, mask_tensor])
            }
            .map_err(crate::ort_err)?;

            let (_, start_logits) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(crate::ort_err)?;
            let (_, end_logits) = outputs[1]
                .try_extract_tensor::<f32>()
                .map_err(crate::ort_err)?;

            let (s, e, score) = best_span(start_logits, end_logits, &allowed, max_answer_len)
                .ok_or_else(|| Error::Inference("no answer span in context".into()))?;

            let offsets = encoding.get_offsets();
            let start = offsets[s].0;
            let end = offsets[e].1.max(start);
            let answer = context
                .get(start..end)
                .ok_or_else(|| Error::Inference("answer offsets out of range".into()))?
                .to_string();

            Ok(QaSpan {
                answer,
                score,
                start,
                end,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxQaBackend;
