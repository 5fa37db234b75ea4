use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Edge type (§3). `Semantic` and `Entity` edges are created bidirectionally
/// (invariant 1); `TypedRelation`, `Consolidation`, and `TemporalChain` edges
/// are produced by maintenance (§4.9) and are not automatically mirrored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "type", content = "name")]
pub enum EdgeType {
    Semantic,
    Entity,
    /// A named relation produced by relation extraction (§4.9 deep-sleep).
    TypedRelation(String),
    Consolidation,
    TemporalChain,
}

impl EdgeType {
    /// Semantic and entity edges must exist as a mirrored pair (invariant 1).
    /// Typed-relation, consolidation, and temporal-chain edges do not.
    pub fn requires_mirror(&self) -> bool {
        matches!(self, EdgeType::Semantic | EdgeType::Entity)
    }

    pub fn label(&self) -> String {
        match self {
            EdgeType::Semantic => "semantic".to_string(),
            EdgeType::Entity => "entity".to_string(),
            EdgeType::TypedRelation(name) => format!("typed-relation:{name}"),
            EdgeType::Consolidation => "consolidation".to_string(),
            EdgeType::TemporalChain => "temporal-chain".to_string(),
        }
    }

    /// Stable string form for the `edges.edge_type` column. Distinct from
    /// [`label`] only in its `typed_relation:` separator, which avoids the
    /// hyphen colliding with relation names that themselves contain one.
    pub fn to_db_string(&self) -> String {
        match self {
            EdgeType::Semantic => "semantic".to_string(),
            EdgeType::Entity => "entity".to_string(),
            EdgeType::TypedRelation(name) => format!("typed_relation:{name}"),
            EdgeType::Consolidation => "consolidation".to_string(),
            EdgeType::TemporalChain => "temporal_chain".to_string(),
        }
    }

    pub fn from_db_string(s: &str) -> Self {
        match s {
            "semantic" => EdgeType::Semantic,
            "entity" => EdgeType::Entity,
            "consolidation" => EdgeType::Consolidation,
            "temporal_chain" => EdgeType::TemporalChain,
            other => other
                .strip_prefix("typed_relation:")
                .map(|name| EdgeType::TypedRelation(name.to_string()))
                .unwrap_or_else(|| EdgeType::TypedRelation(other.to_string())),
        }
    }
}

/// A directed edge between two nodes (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(source_id: NodeId, target_id: NodeId, edge_type: EdgeType, weight: f32) -> Self {
        let now = Utc::now();
        Self {
            source_id,
            target_id,
            edge_type,
            weight: weight.clamp(0.0, 1.0),
            created_at: now,
            last_touched_at: now,
        }
    }

    /// The mirror edge for bidirectional types (invariant 1). Panics if
    /// called on a type that does not require mirroring — callers check
    /// `requires_mirror()` first.
    pub fn mirror(&self) -> Edge {
        debug_assert!(self.edge_type.requires_mirror());
        Edge {
            source_id: self.target_id,
            target_id: self.source_id,
            edge_type: self.edge_type.clone(),
            weight: self.weight,
            created_at: self.created_at,
            last_touched_at: self.last_touched_at,
        }
    }
}
