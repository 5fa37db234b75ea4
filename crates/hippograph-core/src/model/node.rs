use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Importance tier (§3). Maps to activation/retrieval multipliers
/// `{critical: 2.0, normal: 1.0, low: 0.5}` — applied consistently in
/// retrieval (§4.6 step 10) and in anchor-boost logic (§4.9 step 2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Normal,
    Critical,
}

impl Importance {
    /// Retrieval/activation multiplier for this tier (§3, §4.6 step 10).
    pub fn multiplier(self) -> f32 {
        match self {
            Importance::Critical => 2.0,
            Importance::Normal => 1.0,
            Importance::Low => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Importance::Critical => "critical",
            Importance::Normal => "normal",
            Importance::Low => "low",
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Importance::Critical),
            "normal" => Ok(Importance::Normal),
            "low" => Ok(Importance::Low),
            other => Err(format!("unknown importance level: {other}")),
        }
    }
}

/// A single note (§3).
///
/// `embedding` is kept out of this struct deliberately: it lives in the
/// embedding cache (§4.2) and the `node_embeddings` table, keyed by `id`,
/// rather than duplicated onto every `Node` returned from a query — most
/// callers (search results, graph listings) never need the raw vector.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub content: String,
    pub category: String,
    pub importance: Importance,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub t_event_start: Option<DateTime<Utc>>,
    pub t_event_end: Option<DateTime<Utc>>,
    pub access_count: i64,
    pub emotional_tone: f32,
    pub emotional_intensity: f32,
    pub emotional_reflection: Option<String>,
    pub pagerank: f32,
    pub community_id: Option<i64>,
    pub has_embedding: bool,
}

impl Node {
    /// Construct a new node with default bookkeeping fields, ready for
    /// `Store::insert_node`. The store assigns `id`.
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            content: content.into(),
            category: category.into(),
            importance: Importance::default(),
            created_at: now,
            last_accessed_at: now,
            t_event_start: None,
            t_event_end: None,
            access_count: 0,
            emotional_tone: 0.0,
            emotional_intensity: 0.0,
            emotional_reflection: None,
            pagerank: 0.0,
            community_id: None,
            has_embedding: false,
        }
    }
}

/// Filter for `Store::iter_nodes` and retriever post-filtering (§4.6 step
/// 11, §6 Query API filters). `entity_type` is carried here for callers
/// that only have a `Node` in hand, but `matches` cannot evaluate it —
/// checking whether a node links to an entity of a given type needs the
/// store's node-entity table, not just the node row — so the retriever
/// checks `entity_type` itself via `Store::entities_for_node` instead of
/// through this method.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub category: Option<String>,
    pub time_after: Option<DateTime<Utc>>,
    pub time_before: Option<DateTime<Utc>>,
    pub entity_type: Option<String>,
}

impl NodeFilter {
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(category) = &self.category {
            if &node.category != category {
                return false;
            }
        }
        if let Some(after) = self.time_after {
            if node.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.time_before {
            if node.created_at > before {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_multipliers_are_two_one_half() {
        assert_eq!(Importance::Critical.multiplier(), 2.0);
        assert_eq!(Importance::Normal.multiplier(), 1.0);
        assert_eq!(Importance::Low.multiplier(), 0.5);
    }

    #[test]
    fn importance_roundtrips_through_str() {
        for level in [Importance::Critical, Importance::Normal, Importance::Low] {
            let parsed: Importance = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn new_node_has_no_embedding_yet() {
        let node = Node::new("hello", "general");
        assert!(!node.has_embedding);
        assert_eq!(node.access_count, 0);
    }

    #[test]
    fn filter_matches_category_and_time_bounds() {
        let mut node = Node::new("x", "journal");
        node.created_at = "2026-01-15T00:00:00Z".parse().unwrap();

        let filter = NodeFilter {
            category: Some("journal".to_string()),
            time_after: Some("2026-01-01T00:00:00Z".parse().unwrap()),
            time_before: Some("2026-02-01T00:00:00Z".parse().unwrap()),
            entity_type: None,
        };
        assert!(filter.matches(&node));

        let wrong_category = NodeFilter {
            category: Some("other".to_string()),
            ..Default::default()
        };
        assert!(!wrong_category.matches(&node));
    }
}
