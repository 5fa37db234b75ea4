//! Retrieval signal layer (§4.2, §4.4, §4.5, §4.6 step 9).
//!
//! Each module here produces one signal the retriever blends: dense vector
//! similarity (`vector`), keyword relevance (`keyword`), recency/event-time
//! overlap (`temporal`), and optional cross-encoder refinement (`reranker`).
//! The orchestration that combines them lives in [`crate::retriever`].

pub mod keyword;
pub mod reranker;
pub mod temporal;
pub mod vector;

pub use keyword::{normalize_bm25_scores, sanitize_fts5_query};
pub use reranker::{
    NullReranker, RerankError, Reranker, RerankerConfig, DEFAULT_RERANK_COUNT,
    DEFAULT_RERANK_WEIGHT, DEFAULT_RETRIEVAL_COUNT,
};
#[cfg(feature = "embeddings")]
pub use reranker::CrossEncoderReranker;
pub use temporal::{decompose_query, directional_scores, has_temporal_signal, recency_factor, temporal_score, Direction};
pub use vector::{
    VectorIndex, VectorIndexConfig, VectorIndexStats, VectorSearchError, DEFAULT_CONNECTIVITY,
    DEFAULT_DIMENSIONS,
};
