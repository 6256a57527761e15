//! ONNX sentence embedder.
//!
//! Loads a sentence-transformers ONNX export and its tokenizer, mean-pools
//! token embeddings with the attention mask. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;
    use std::sync::Arc;

    use docagent_core::{Error, Result};
    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::info;

    use crate::cache::BoundedCache;
    use crate::embedder::{EmbedderBackend, EmbeddingResult};

    const MAX_SEQ_LEN: usize = 512;

    pub struct OnnxEmbedder {
        session: Arc<Mutex<Session>>,
        tokenizer: Tokenizer,
        cache: BoundedCache<Array1<f32>>,
        dimension: usize,
    }

    impl OnnxEmbedder {
        /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            crate::require_files(&[&model_path, &tokenizer_path])?;

            let session = crate::onnx_session(&model_path)?;
            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::ModelUnavailable(format!("Failed to load tokenizer: {}", e)))?;

            let mut embedder = Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer,
                cache: BoundedCache::new(1000),
                dimension: 0,
            };
            // Probe once to learn the output dimension
            embedder.dimension = embedder.infer("dimension probe")?.len();

            info!(
                "ONNX embedder loaded: dim={}, model={}",
                embedder.dimension,
                model_path.display()
            );
            Ok(embedder)
        }

        fn infer(&self, text: &str) -> Result<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            let ids: Vec<i64> = encoding.get_ids()[..seq_len].iter().map(|&id| id as i64).collect();
            let mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
                .iter()
                .map(|&m| m as i64)
                .collect();
            let type_ids = vec![0i64; seq_len];

            let mask_f32: Vec<f32> = mask.iter().map(|&m| m as f32).collect();
            let mask_sum: f32 = mask_f32.iter().sum();
            if mask_sum < 1e-9 {
                return Err(Error::Inference("empty attention mask".into()));
            }

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids)).map_err(crate::ort_err)?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask)).map_err(crate::ort_err)?;
            let type_tensor =
                Tensor::from_array(([1usize, seq_len], type_ids)).map_err(crate::ort_err)?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(crate::ort_err)?;

            // Either token embeddings [1, seq, dim] or pooled [1, dim]
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(crate::ort_err)?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            match dims.as_slice() {
                [_, _, dim] => {
                    let dim = *dim as usize;
                    let mut pooled = Array1::<f32>::zeros(dim);
                    for (i, &m) in mask_f32.iter().enumerate() {
                        if m > 0.0 {
                            let offset = i * dim;
                            for d in 0..dim {
                                pooled[d] += data[offset + d] * m;
                            }
                        }
                    }
                    Ok(pooled / mask_sum)
                }
                [_, dim] => Ok(Array1::from_vec(data[..*dim as usize].to_vec())),
                other => Err(Error::Inference(format!("Unexpected output shape: {:?}", other))),
            }
        }
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<EmbeddingResult> {
            if let Some(cached) = self.cache.get(text) {
                return Ok(EmbeddingResult {
                    embedding: cached,
                    cached: true,
                });
            }

            let embedding = self.infer(text)?;
            self.cache.put(text.to_string(), embedding.clone());
            Ok(EmbeddingResult {
                embedding,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
