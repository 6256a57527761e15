//! DocAgent Infer — model collaborators, beam search, bounded caches.
//!
//! Provides the `EmbedderBackend`, `GeneratorBackend` and `QaBackend`
//! traits. When the `onnx` feature is enabled and model files are present,
//! ONNX Runtime backends are loaded from the model directories; otherwise
//! embedding and QA fall back to model-free heuristics and generation goes
//! to a configured remote provider.

pub mod beam;
pub mod cache;
pub mod embedder;
pub mod generator;
pub mod onnx_embedder;
pub mod onnx_generator;
pub mod onnx_qa;
pub mod qa;
pub mod remote;

pub use cache::BoundedCache;
pub use embedder::{cosine_similarity, EmbedderBackend, EmbeddingResult, HashingEmbedder};
pub use generator::{GenerationRequest, GeneratorBackend};
pub use qa::{LexicalQaBackend, QaBackend, QaSpan};
pub use remote::{RemoteGenerator, RemoteLlmConfig};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;
#[cfg(feature = "onnx")]
pub use onnx_generator::OnnxGenerator;
#[cfg(feature = "onnx")]
pub use onnx_qa::OnnxQaBackend;

use std::path::Path;
use std::sync::Arc;

use docagent_core::{Error, Result};

/// Create the best available embedder for the given model directory.
///
/// Tries ONNX first (if feature enabled and model files present),
/// falls back to `HashingEmbedder`.
pub fn create_embedder(model_dir: &Path) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(embedder);
            }
            Err(e) => {
                tracing::warn!("ONNX embedder unavailable: {}. Falling back to hashing embedder.", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::warn!("ONNX feature disabled. Using hashing embedder.");
    }

    Arc::new(HashingEmbedder::default())
}

/// Create the best available QA backend, falling back to `LexicalQaBackend`.
pub fn create_qa(model_dir: &Path) -> Arc<dyn QaBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxQaBackend::load(model_dir) {
            Ok(qa) => {
                tracing::info!("Using ONNX QA model");
                return Arc::new(qa);
            }
            Err(e) => {
                tracing::warn!("ONNX QA model unavailable: {}. Falling back to lexical QA.", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::warn!("ONNX feature disabled. Using lexical QA.");
    }

    Arc::new(LexicalQaBackend)
}

/// Create the generation backend: local ONNX model first, then a remote
/// provider. Generation has no heuristic fallback, so failure here is fatal.
pub fn create_generator(
    model_dir: &Path,
    remote: &RemoteLlmConfig,
) -> Result<Arc<dyn GeneratorBackend>> {
    #[cfg(feature = "onnx")]
    {
        match OnnxGenerator::load(model_dir) {
            Ok(generator) => {
                tracing::info!("Using ONNX generator");
                return Ok(Arc::new(generator));
            }
            Err(e) => {
                tracing::warn!("ONNX generator unavailable: {}", e);
            }
        }
    }

    match RemoteGenerator::new(remote) {
        Ok(generator) => Ok(Arc::new(generator)),
        Err(e) => Err(Error::ModelUnavailable(format!(
            "no generation model in {} and no remote provider ({})",
            model_dir.display(),
            e
        ))),
    }
}

/// Fail with `ModelUnavailable` naming the first missing file.
pub(crate) fn require_files(paths: &[&Path]) -> Result<()> {
    match paths.iter().find(|p| !p.exists()) {
        Some(missing) => Err(Error::ModelUnavailable(format!(
            "Model file not found: {}",
            missing.display()
        ))),
        None => Ok(()),
    }
}

/// Build an ONNX Runtime session for a model file.
///
/// With the load-dynamic feature, ORT_DYLIB_PATH must point to libonnxruntime.
#[cfg(feature = "onnx")]
pub(crate) fn onnx_session(model_path: &Path) -> Result<ort::session::Session> {
    ort::init().commit();
    ort::session::Session::builder()
        .map_err(|e| Error::ModelUnavailable(format!("Failed to create session builder: {}", e)))?
        .with_intra_threads(2)
        .map_err(|e| Error::ModelUnavailable(format!("Failed to set threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| {
            Error::ModelUnavailable(format!("Failed to load {}: {}", model_path.display(), e))
        })
}

#[cfg(feature = "onnx")]
pub(crate) fn ort_err(e: ort::Error) -> Error {
    Error::Inference(format!("ONNX Runtime error: {}", e))
}
