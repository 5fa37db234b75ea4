//! In-memory graph cache (§4.3).
//!
//! Forward and reverse adjacency keyed by node id, rebuilt from the store on
//! startup and mutated in lock-step with every store write that touches an
//! edge. Holds only ids and weights — never a node's content — so it stays
//! cheap to keep fully resident even as the store grows (§9 "cyclic graph
//! ownership": "no component holds owning references to another node").

use std::collections::HashMap;

use crate::model::{Edge, EdgeType, NodeId};

/// One outgoing or incoming adjacency entry.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub id: NodeId,
    pub weight: f32,
    pub edge_type: EdgeType,
}

/// Adjacency lists for every node currently in the store.
///
/// `forward[u]` holds edges `u -> v`; `reverse[v]` holds the same edges
/// indexed by target, which is what PageRank (§4.9) needs without scanning
/// the whole edge set per iteration.
#[derive(Debug, Default)]
pub struct GraphCache {
    forward: HashMap<NodeId, Vec<Neighbor>>,
    reverse: HashMap<NodeId, Vec<Neighbor>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild entirely from the store's edge set (§4.3 "rebuilt on startup
    /// from the store").
    pub fn rebuild_from(edges: impl IntoIterator<Item = Edge>) -> Self {
        let mut cache = Self::new();
        for edge in edges {
            cache.insert(&edge);
        }
        cache
    }

    /// Insert or update a single directed edge (one side of a mirrored pair,
    /// or a one-sided typed-relation/consolidation/temporal-chain edge).
    pub fn insert(&mut self, edge: &Edge) {
        Self::upsert_in(&mut self.forward, edge.source_id, edge);
        Self::upsert_in(&mut self.reverse, edge.target_id, edge);
    }

    fn upsert_in(map: &mut HashMap<NodeId, Vec<Neighbor>>, key: NodeId, edge: &Edge) {
        let other = if key == edge.source_id { edge.target_id } else { edge.source_id };
        let list = map.entry(key).or_default();
        if let Some(existing) = list
            .iter_mut()
            .find(|n| n.id == other && n.edge_type == edge.edge_type)
        {
            existing.weight = edge.weight;
        } else {
            list.push(Neighbor {
                id: other,
                weight: edge.weight,
                edge_type: edge.edge_type.clone(),
            });
        }
    }

    /// Remove a directed edge `source -> target` of `edge_type`.
    pub fn remove(&mut self, source_id: NodeId, target_id: NodeId, edge_type: &EdgeType) {
        if let Some(list) = self.forward.get_mut(&source_id) {
            list.retain(|n| !(n.id == target_id && &n.edge_type == edge_type));
        }
        if let Some(list) = self.reverse.get_mut(&target_id) {
            list.retain(|n| !(n.id == source_id && &n.edge_type == edge_type));
        }
    }

    /// Drop every adjacency entry mentioning `id`, either as source or
    /// target (§3 invariant 7: deleting a node removes all incident edges).
    pub fn remove_node(&mut self, id: NodeId) {
        self.forward.remove(&id);
        self.reverse.remove(&id);
        for list in self.forward.values_mut() {
            list.retain(|n| n.id != id);
        }
        for list in self.reverse.values_mut() {
            list.retain(|n| n.id != id);
        }
    }

    pub fn outgoing(&self, id: NodeId) -> &[Neighbor] {
        self.forward.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn incoming(&self, id: NodeId) -> &[Neighbor] {
        self.reverse.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.forward.keys().chain(self.reverse.keys()).copied().collect::<std::collections::HashSet<_>>().into_iter()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(|v| v.len()).sum()
    }
}
