//! Entity linking (§4.7).
//!
//! Given extracted surface forms, canonicalize each, upsert into the
//! entity table, link to the node, and strengthen a bidirectional `entity`
//! edge to every other node that shares a linked entity. This module only
//! computes *what* edges to write; [`crate::ingest::Engine`] is the one
//! holding the store's writer lock while it applies them (§5 "none of
//! these must hold the writer lock" applies to the extractor call, not to
//! the index update that follows it).

use std::collections::HashMap;

use crate::error::StoreResult;
use crate::extractor::ExtractedEntity;
use crate::model::{canonicalize, Edge, EdgeType, EntityType, NodeId};
use crate::storage::Store;

/// An edge to (re)write as a result of linking `node_id`'s entities.
#[derive(Debug, Clone)]
pub struct EntityEdgePlan {
    pub other_id: NodeId,
    pub weight: f32,
    pub shared_count: usize,
}

/// Canonicalize, upsert, and link `node_id`'s extracted entities, returning
/// the set of bidirectional `entity` edges that should now exist (§4.7).
///
/// Weight per edge is `min(1, 0.5 + 0.1 * shared_count)`, merged with any
/// existing edge by taking the max — the store's `insert_edge` is
/// idempotent on `(source, target, type)` and simply overwrites `weight`,
/// so the max is computed here before the write.
pub fn link_entities(
    store: &Store,
    node_id: NodeId,
    extracted: &[ExtractedEntity],
) -> StoreResult<Vec<EntityEdgePlan>> {
    store.unlink_all_entities(node_id)?;

    let mut entity_ids = Vec::with_capacity(extracted.len());
    for e in extracted {
        let name = canonicalize(&e.surface);
        if name.is_empty() {
            continue;
        }
        let entity_type = EntityType::parse(&e.entity_type);
        let entity_id = store.upsert_entity(&name, &entity_type)?;
        store.link_entity(node_id, entity_id)?;
        entity_ids.push(entity_id);
    }

    // Count, per other node, how many entities it shares with this one.
    let mut shared_counts: HashMap<NodeId, usize> = HashMap::new();
    for entity_id in &entity_ids {
        for other in store.nodes_for_entity(*entity_id)? {
            if other != node_id {
                *shared_counts.entry(other).or_insert(0) += 1;
            }
        }
    }

    Ok(shared_counts
        .into_iter()
        .map(|(other_id, shared_count)| EntityEdgePlan {
            other_id,
            weight: entity_edge_weight(shared_count),
            shared_count,
        })
        .collect())
}

/// `min(1, 0.5 + 0.1 * shared_count)` (§4.7).
pub fn entity_edge_weight(shared_count: usize) -> f32 {
    (0.5 + 0.1 * shared_count as f32).min(1.0)
}

/// Apply a single entity-edge plan, merging with any existing edge weight
/// by taking the max (§4.7 "merging with any existing edge by taking the
/// max"). Mirrors automatically via `Store::insert_edge`.
pub fn apply_entity_edge(store: &Store, node_id: NodeId, plan: &EntityEdgePlan) -> StoreResult<()> {
    let existing_weight = store
        .edges_from(node_id)?
        .into_iter()
        .find(|e| e.target_id == plan.other_id && e.edge_type == EdgeType::Entity)
        .map(|e| e.weight)
        .unwrap_or(0.0);
    let weight = plan.weight.max(existing_weight);
    store.insert_edge(&Edge::new(node_id, plan.other_id, EdgeType::Entity, weight))
}
