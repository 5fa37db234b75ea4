use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// An immutable content snapshot (§3). At most [`super::MAX_NODE_VERSIONS`]
/// are retained per node; the oldest is evicted on overflow (invariant 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeVersion {
    pub node_id: NodeId,
    pub version: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
