//! # HippoGraph Core
//!
//! A personal, single-user associative memory store for AI assistants.
//! Memories are notes (`Node`s) connected by typed edges — semantic
//! similarity, shared entities, explicit relations, consolidation links,
//! and temporal chains — forming a graph that is both stored and searched
//! the way an assistant's own working memory might be: a hybrid of dense
//! vector similarity, keyword relevance, spreading activation across the
//! graph, and temporal recency, blended and reranked into a single ranked
//! result set.
//!
//! ## Architecture
//!
//! - [`model`] — the data model: nodes, edges, entities, versions, search
//!   log entries. Plain data keyed by integer id; no type holds an owning
//!   reference to another.
//! - [`storage`] — SQLite persistence (`rusqlite`, WAL mode, a split
//!   writer/reader connection pair) with FTS5 backing keyword search and
//!   the online backup API backing snapshots.
//! - [`embeddings`] — the `Embedder` contract and a local fastembed-backed
//!   implementation (feature `embeddings`).
//! - [`search`] — the individual retrieval signals: dense vector search
//!   (`search::vector`, feature `vector-search`), BM25 keyword search
//!   (`search::keyword`), temporal decomposition and recency
//!   (`search::temporal`), and cross-encoder reranking (`search::reranker`).
//! - [`graph`] — an in-memory adjacency cache used for spreading
//!   activation, PageRank, and community detection.
//! - [`entities`] — entity-linking edge derivation.
//! - [`extractor`] — the `EntityExtractor` and `RelationExtractor`
//!   contracts (external NLP collaborators per the narrow-interface
//!   pattern used throughout this crate).
//! - [`date_resolver`] — the `DateResolver` contract for resolving natural
//!   language date references to event time ranges.
//! - [`retriever`] — the pure scoring functions the search pipeline blends:
//!   spreading activation, hub penalties, signal blending, decay.
//! - [`sleep`] — background maintenance: PageRank recomputation, community
//!   detection, duplicate scanning, stale-edge decay, anchor protection.
//! - [`engine`] — [`Engine`], the orchestrator that ties the above into the
//!   crate's public surface: ingest, update, search, maintenance.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hippograph_core::{Engine, AddInput, SearchRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = Engine::new(
//!     store, vector_index, graph, embedder, reranker,
//!     entity_extractor, date_resolver, relation_extractor,
//!     config, snapshot_dir,
//! );
//!
//! let added = engine.add(AddInput {
//!     content: "Paid the Q3 invoice for Acme Corp".to_string(),
//!     category: "fact".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let results = engine.search(
//!     SearchRequest { query: "Acme invoice".to_string(), ..Default::default() },
//!     &CancellationToken::new(),
//! )?;
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings` (default): local embedding generation via fastembed.
//! - `vector-search` (default): HNSW vector search via usearch.
//! - `bundled-sqlite` (default): statically link SQLite rather than
//!   requiring a system library.
//! - `full`: all optional features.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod date_resolver;
pub mod engine;
pub mod entities;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod model;
pub mod retriever;
pub mod sleep;
pub mod storage;

#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub mod embeddings;

#[cfg(feature = "vector-search")]
#[cfg_attr(docsrs, doc(cfg(feature = "vector-search")))]
pub mod search;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use config::Config;
pub use date_resolver::{DateResolver, EventRange, NullDateResolver};
pub use engine::{
    AddInput, AddResult, Engine, LatencyPercentiles, SearchRequest, SearchResponse,
    SimilarityHit, StatsSummary,
};
pub use entities::{apply_entity_edge, entity_edge_weight, link_entities, EntityEdgePlan};
pub use error::{DegradationReason, IngestError, MaintenanceError, Outcome, RetrieverError, StoreError, StoreResult};
pub use extractor::{
    EntityExtractor, ExtractedEntity, ExtractedRelation, NullExtractor, NullRelationExtractor,
    RelationExtractor,
};
pub use graph::{GraphCache, Neighbor};
pub use model::{
    canonicalize, Edge, EdgeType, Entity, EntityId, EntityType, Importance, Node, NodeFilter,
    NodeId, NodeVersion, SearchLogEntry, MAX_NODE_VERSIONS,
};
pub use retriever::{DetailMode, Filters, SearchHit, SearchStats, SignalBreakdown};
pub use sleep::{DuplicatePair, SleepMode, SleepReport, SleepScheduler, StepReport};
pub use storage::{load_config, Store, StoreStats};

#[cfg(feature = "embeddings")]
pub use embeddings::{cosine_similarity, l2_normalize, Embedder, EmbeddingError, LocalEmbedder, NullEmbedder};

#[cfg(feature = "vector-search")]
pub use search::{
    NullReranker, RerankError, Reranker, RerankerConfig, VectorIndex, VectorIndexConfig,
    VectorIndexStats, VectorSearchError,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        AddInput, AddResult, Config, DetailMode, Engine, Filters, Importance, Node, NodeId,
        SearchRequest, SearchResponse, Store,
    };

    #[cfg(feature = "embeddings")]
    pub use crate::{Embedder, LocalEmbedder};

    #[cfg(feature = "vector-search")]
    pub use crate::{Reranker, VectorIndex};
}
