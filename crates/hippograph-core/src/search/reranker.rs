//! Cross-encoder reranking.
//!
//! The retriever keeps a blended score from ANN/spreading/BM25/temporal
//! signals (§4.6) and optionally refines the top-M candidates with a
//! cross-encoder pass. The cross-encoder is a narrow external capability:
//! represented here as the [`Reranker`] trait with a `Null` variant rather
//! than an `Option<Box<dyn Reranker>>` scattered through call sites, so the
//! retriever always has something to call and branches on `is_available()`
//! instead of matching on `Some`/`None`.

#[cfg(feature = "embeddings")]
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
#[cfg(feature = "embeddings")]
use std::sync::Mutex;

/// Default number of candidates handed to the reranker (§6 `rerank.top_n`).
pub const DEFAULT_RETRIEVAL_COUNT: usize = 50;

/// Default number of results kept after reranking.
pub const DEFAULT_RERANK_COUNT: usize = 20;

/// Default blend weight for the reranked score (§4.6 step 9, `rerank.weight`).
pub const DEFAULT_RERANK_WEIGHT: f32 = 0.3;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RerankError {
    #[error("reranker unavailable")]
    Unavailable,
    #[error("reranker model failed to initialize: {0}")]
    ModelInit(String),
    #[error("reranking failed: {0}")]
    RerankFailed(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub weight: f32,
    pub top_n: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: DEFAULT_RERANK_WEIGHT,
            top_n: DEFAULT_RETRIEVAL_COUNT,
        }
    }
}

/// A narrow cross-encoder capability: score `(query, text)` pairs.
///
/// §9: "represent each as an interface abstraction with a disabled variant;
/// the retriever branches on presence, not on subtype."
pub trait Reranker: Send + Sync {
    /// Score each text against the query. Higher is more relevant.
    /// The returned vector has exactly `texts.len()` entries, same order.
    fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError>;

    /// Whether this reranker can actually produce scores right now.
    fn is_available(&self) -> bool;
}

/// The disabled variant. Always reports unavailable; the retriever's
/// degrade-not-fail policy (§4.6.3) handles this uniformly with a model
/// that failed to load.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReranker;

impl Reranker for NullReranker {
    fn score(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>, RerankError> {
        Err(RerankError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Jina Reranker v1 Turbo (fastembed, ONNX, local inference). Construction
/// does not load the model eagerly; call [`CrossEncoderReranker::load`]
/// once during startup, not on the hot path or in tests.
#[cfg(feature = "embeddings")]
pub struct CrossEncoderReranker {
    model: Mutex<Option<TextRerank>>,
}

#[cfg(feature = "embeddings")]
impl CrossEncoderReranker {
    pub fn new() -> Self {
        Self {
            model: Mutex::new(None),
        }
    }

    /// Load the cross-encoder model. Downloads on first call. Failure here
    /// is not fatal to the process: the reranker simply stays unavailable
    /// and the retriever skips the rerank phase.
    pub fn load(&self) {
        let options = RerankInitOptions::new(RerankerModel::JINARerankerV1TurboEn)
            .with_show_download_progress(true);

        match TextRerank::try_new(options) {
            Ok(model) => {
                tracing::info!("cross-encoder reranker loaded (Jina Reranker v1 Turbo)");
                *self.model.lock().expect("reranker mutex poisoned") = Some(model);
            }
            Err(e) => {
                tracing::warn!(error = %e, "cross-encoder unavailable, rerank phase will be skipped");
            }
        }
    }
}

#[cfg(feature = "embeddings")]
impl Default for CrossEncoderReranker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embeddings")]
impl Reranker for CrossEncoderReranker {
    fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError> {
        if query.is_empty() {
            return Err(RerankError::InvalidInput("query cannot be empty".into()));
        }
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut guard = self.model.lock().expect("reranker mutex poisoned");
        let Some(model) = guard.as_mut() else {
            return Err(RerankError::Unavailable);
        };

        let documents: Vec<&str> = texts.iter().map(String::as_str).collect();
        let results = model
            .rerank(query, &documents, false, None)
            .map_err(|e| RerankError::RerankFailed(e.to_string()))?;

        let mut scores = vec![0.0f32; texts.len()];
        for r in results {
            if let Some(slot) = scores.get_mut(r.index) {
                *slot = r.score;
            }
        }
        Ok(scores)
    }

    fn is_available(&self) -> bool {
        self.model
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

/// Min-max normalize rerank scores to `[0, 1]` before blending (§4.6 step 9:
/// `normalized(rerank)`). All-equal inputs normalize to `1.0` (no signal to
/// discriminate on, so they should not be penalized relative to each other).
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return vec![];
    }
    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reranker_is_unavailable() {
        let r = NullReranker;
        assert!(!r.is_available());
        assert!(matches!(
            r.score("q", &["a".to_string()]),
            Err(RerankError::Unavailable)
        ));
    }

    #[test]
    fn normalize_handles_empty_and_flat_inputs() {
        assert_eq!(normalize(&[]), Vec::<f32>::new());
        assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalize_maps_min_max_to_0_1() {
        let out = normalize(&[1.0, 2.0, 4.0]);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[2] - 1.0).abs() < 1e-6);
        assert!(out[1] > 0.0 && out[1] < 1.0);
    }
}
