use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Per-phase timing breakdown recorded for every search (§4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDurations {
    pub embedding_ms: f64,
    pub ann_ms: f64,
    pub spreading_ms: f64,
    pub bm25_ms: f64,
    pub temporal_ms: f64,
    pub rerank_ms: f64,
    pub total_ms: f64,
}

/// One record per query (§3, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEntry {
    pub query_hash: u64,
    pub timestamp: DateTime<Utc>,
    pub durations: PhaseDurations,
    pub result_ids: Vec<NodeId>,
    pub zero_result: bool,
    pub degraded: bool,
}
