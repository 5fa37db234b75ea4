//! Error kinds (§7).
//!
//! Each error kind below is a `thiserror`-derived enum, following the
//! storage layer's own convention:
//! human-readable `#[error("...")]` messages and `#[from]` conversions from
//! the lower-level errors that actually occur (`rusqlite`, I/O).

use crate::model::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("node {0} not found")]
    NotFound(NodeId),
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("io failed: {0}")]
    IoFailed(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("a node may retain at most {max} versions")]
    VersionOverflow { max: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("duplicate of existing node {0}")]
    Duplicate(NodeId),
    #[error("invalid input in field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),
    #[error("store operation failed: {0}")]
    StoreFailed(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("query too long: {len} chars (max {max})")]
    QueryTooLong { len: usize, max: usize },
    #[error("phase timed out: {phase:?}")]
    Timeout { phase: Option<String> },
    #[error("search was cancelled")]
    Cancelled,
    #[error("store operation failed: {0}")]
    StoreFailed(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("maintenance step '{step}' failed: {cause}")]
    StepFailed { step: String, cause: String },
}

/// A reason a result was degraded rather than failed outright (§7
/// "external-service failures that have a defined fallback... are
/// recorded as degradation flags in the result").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationReason {
    EmbeddingUnavailable,
    RerankerUnavailable,
    RerankerTimedOut,
    DateResolverUnavailable,
    EntityExtractorUnavailable,
    PhaseTimedOut(String),
}

/// Wraps a successful payload with optional degradation reasons, matching
/// §7's `ok` / `ok_degraded(reasons)` / `error(kind, message)` distinction.
/// `error` is simply `Result::Err` at the Rust level; this type only needs
/// to carry the other two.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub degradations: Vec<DegradationReason>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            degradations: Vec::new(),
        }
    }

    pub fn degraded(value: T, reasons: Vec<DegradationReason>) -> Self {
        Self {
            value,
            degradations: reasons,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}
