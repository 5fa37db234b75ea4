//! Local embedding generation via fastembed (ONNX, 100% local inference).
//!
//! Follows the reference crate's global-singleton-with-lazy-init pattern:
//! the ONNX model is loaded once into a process-wide `OnceLock`, guarded by
//! a `Mutex` for fastembed's `&mut self` API, and the cache directory
//! honors `FASTEMBED_CACHE_PATH` before falling back through
//! `directories::ProjectDirs`/`BaseDirs`.

#[cfg(feature = "embeddings")]
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
#[cfg(feature = "embeddings")]
use std::sync::{Mutex, OnceLock};

use super::traits::{l2_normalize, Embedder, EmbeddingError};

/// Dimensionality after Matryoshka truncation (768 → 256): the first N
/// dimensions of Nomic Embed Text v1.5's output are themselves a valid
/// N-dimensional embedding, at ~2% quality loss on MTEB for N=256.
pub const EMBEDDING_DIMENSIONS: usize = 256;

pub const MAX_TEXT_LENGTH: usize = 8192;

#[cfg(feature = "embeddings")]
const BATCH_SIZE: usize = 32;

#[cfg(feature = "embeddings")]
static EMBEDDING_MODEL_RESULT: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

#[cfg(feature = "embeddings")]
fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("dev", "hippograph", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/hippograph/fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

#[cfg(feature = "embeddings")]
fn get_model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = EMBEDDING_MODEL_RESULT.get_or_init(|| {
        let dir = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(error = %e, path = ?dir, "failed to create fastembed cache directory");
        }

        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
            .with_show_download_progress(true)
            .with_cache_dir(dir);

        TextEmbedding::try_new(options)
            .map(Mutex::new)
            .map_err(|e| format!("failed to initialize nomic-embed-text-v1.5: {e}"))
    });

    match result {
        Ok(model) => model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

/// Truncate to [`EMBEDDING_DIMENSIONS`] and re-normalize (Matryoshka
/// representation learning).
#[cfg(feature = "embeddings")]
fn matryoshka_truncate(mut vector: Vec<f32>) -> Vec<f32> {
    if vector.len() > EMBEDDING_DIMENSIONS {
        vector.truncate(EMBEDDING_DIMENSIONS);
    }
    l2_normalize(&mut vector);
    vector
}

/// The default [`Embedder`]: a local ONNX model via fastembed. When the
/// `embeddings` feature is disabled at compile time, every method reports
/// unavailable, matching [`super::NullEmbedder`]'s behavior exactly so
/// downstream code does not need to special-case the feature flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalEmbedder;

impl LocalEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Force model initialization (downloads on first call). Call this
    /// during startup, not on the hot path or in tests.
    #[cfg(feature = "embeddings")]
    pub fn init(&self) -> Result<(), EmbeddingError> {
        get_model().map(|_| ())
    }

    #[cfg(not(feature = "embeddings"))]
    pub fn init(&self) -> Result<(), EmbeddingError> {
        Err(EmbeddingError::Unavailable)
    }
}

impl Embedder for LocalEmbedder {
    #[cfg(feature = "embeddings")]
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".into()));
        }

        let mut model = get_model()?;
        let text = if text.len() > MAX_TEXT_LENGTH {
            &text[..MAX_TEXT_LENGTH]
        } else {
            text
        };

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .map(matryoshka_truncate)
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("no embedding produced".into()))
    }

    #[cfg(not(feature = "embeddings"))]
    fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    #[cfg(feature = "embeddings")]
    fn is_available(&self) -> bool {
        get_model().is_ok()
    }

    #[cfg(not(feature = "embeddings"))]
    fn is_available(&self) -> bool {
        false
    }
}

/// Batch variant used during bulk re-embedding (e.g. after a dimension
/// change forces a full rebuild). Not part of the `Embedder` trait since
/// batching is an optimization, not a contract requirement.
#[cfg(feature = "embeddings")]
pub fn encode_batch(texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(vec![]);
    }
    let mut model = get_model()?;
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(BATCH_SIZE) {
        let truncated: Vec<&str> = chunk
            .iter()
            .map(|t| if t.len() > MAX_TEXT_LENGTH { &t[..MAX_TEXT_LENGTH] } else { t })
            .collect();
        let embeddings = model
            .embed(truncated, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
        out.extend(embeddings.into_iter().map(matryoshka_truncate));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_match_constant() {
        assert_eq!(LocalEmbedder::new().dimensions(), EMBEDDING_DIMENSIONS);
    }

    #[cfg(not(feature = "embeddings"))]
    #[test]
    fn without_feature_flag_encode_is_unavailable() {
        let embedder = LocalEmbedder::new();
        assert!(!embedder.is_available());
        assert!(matches!(embedder.encode("hi"), Err(EmbeddingError::Unavailable)));
    }
}
