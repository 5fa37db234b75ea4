//! Sleep-time maintenance (§4.9).
//!
//! A single background task, never run concurrently with itself (§4.9,
//! §5): [`SleepScheduler`] runs light-sleep every `sleep.light_every_new_nodes`
//! ingests and deep-sleep on a `sleep.deep_interval_hours` timer. Every step
//! snapshots the store first (§4.1 "copy-on-write at the persistent layer")
//! and rolls back on the first unrecoverable error (§4.9 step 6, §7
//! "Maintenance always snapshots before mutating and rolls back on any
//! step failure").

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::MaintenanceError;
use crate::extractor::RelationExtractor;
use crate::graph::GraphCache;
use crate::model::{Edge, EdgeType, Importance, NodeId};
use crate::storage::Store;

/// One maintenance step's outcome (§6 `run_sleep -> {steps: [{name, changes, duration}]}`).
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub changes: usize,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct SleepReport {
    pub mode: SleepMode,
    pub steps: Vec<StepReport>,
    pub rolled_back: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepMode {
    Light,
    Deep,
}

/// Pairs flagged by the near-duplicate scan (§4.9 step 4); logged, never
/// auto-deleted (§9 "no automatic pruning").
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePair {
    pub a: NodeId,
    pub b: NodeId,
    pub similarity: f32,
}

/// PageRank over the graph cache (§4.9 step 5), standard power iteration
/// with damping `0.85`, normalizing each node's outgoing weight so it
/// behaves as a transition probability. Dangling nodes (no outgoing edges)
/// redistribute their mass uniformly, the conventional fix for the
/// rank-sink problem.
pub fn pagerank(graph: &GraphCache, node_ids: &[NodeId], iterations: u32) -> HashMap<NodeId, f32> {
    const DAMPING: f32 = 0.85;
    let n = node_ids.len();
    if n == 0 {
        return HashMap::new();
    }
    let initial = 1.0 / n as f32;
    let mut rank: HashMap<NodeId, f32> = node_ids.iter().map(|&id| (id, initial)).collect();

    let out_weight: HashMap<NodeId, f32> = node_ids
        .iter()
        .map(|&id| (id, graph.outgoing(id).iter().map(|n| n.weight.max(0.0)).sum::<f32>()))
        .collect();

    for _ in 0..iterations {
        let dangling_mass: f32 = node_ids
            .iter()
            .filter(|id| out_weight.get(id).copied().unwrap_or(0.0) <= 0.0)
            .map(|id| rank[id])
            .sum();

        let mut next: HashMap<NodeId, f32> = node_ids
            .iter()
            .map(|&id| (id, (1.0 - DAMPING) / n as f32 + DAMPING * dangling_mass / n as f32))
            .collect();

        for &id in node_ids {
            let total_out = out_weight.get(&id).copied().unwrap_or(0.0);
            if total_out <= 0.0 {
                continue;
            }
            let contribution = rank[&id] / total_out;
            for neighbor in graph.outgoing(id) {
                if let Some(entry) = next.get_mut(&neighbor.id) {
                    *entry += DAMPING * contribution * neighbor.weight.max(0.0);
                }
            }
        }

        rank = next;
    }

    rank
}

/// Community detection via weighted label propagation (§4.9 deep-sleep
/// "community detection (modularity maximization)"). Label propagation is
/// the tractable stand-in used here — see `DESIGN.md` for the open-question
/// resolution; it converges fast and needs no community-count parameter,
/// matching modularity maximization's "let the graph decide" property.
pub fn detect_communities(graph: &GraphCache, node_ids: &[NodeId], iterations: u32) -> HashMap<NodeId, i64> {
    let mut labels: HashMap<NodeId, i64> = node_ids.iter().map(|&id| (id, id)).collect();

    for _ in 0..iterations {
        let mut changed = false;
        for &id in node_ids {
            let mut weight_by_label: HashMap<i64, f32> = HashMap::new();
            for neighbor in graph.outgoing(id).iter().chain(graph.incoming(id)) {
                if let Some(&label) = labels.get(&neighbor.id) {
                    *weight_by_label.entry(label).or_insert(0.0) += neighbor.weight;
                }
            }
            if let Some((&best_label, _)) = weight_by_label
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap().then(b.0.cmp(a.0)))
            {
                if labels[&id] != best_label {
                    labels.insert(id, best_label);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    labels
}

pub struct SleepScheduler {
    pub config: Config,
    pub snapshot_dir: PathBuf,
    new_nodes_since_light: u64,
    last_deep_sleep: Option<DateTime<Utc>>,
}

impl SleepScheduler {
    pub fn new(config: Config, snapshot_dir: PathBuf) -> Self {
        Self { config, snapshot_dir, new_nodes_since_light: 0, last_deep_sleep: None }
    }

    pub fn record_ingest(&mut self) {
        self.new_nodes_since_light += 1;
    }

    pub fn light_sleep_due(&self) -> bool {
        self.new_nodes_since_light >= self.config.sleep.light_every_new_nodes
    }

    pub fn deep_sleep_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_deep_sleep {
            None => true,
            Some(last) => now - last >= ChronoDuration::hours(self.config.sleep.deep_interval_hours as i64),
        }
    }

    /// §4.9 light-sleep: boost anchors, decay stale edges, scan for
    /// near-duplicates, recompute PageRank. Snapshots first; any step
    /// raising an error rolls the store back to the snapshot (step 6).
    pub fn run_light_sleep(
        &mut self,
        store: &Store,
        graph: &mut GraphCache,
        dry_run: bool,
    ) -> Result<SleepReport, MaintenanceError> {
        let snapshot_path = self.snapshot_dir.join(format!("light-{}.db", Utc::now().timestamp_nanos_opt().unwrap_or(0)));
        if !dry_run {
            store
                .snapshot_to(&snapshot_path)
                .map_err(|e| MaintenanceError::StepFailed { step: "snapshot".into(), cause: e.to_string() })?;
        }

        let result = self.run_light_sleep_steps(store, graph, dry_run);
        match result {
            Ok(report) => {
                self.new_nodes_since_light = 0;
                let _ = std::fs::remove_file(&snapshot_path);
                Ok(report)
            }
            Err((step, cause)) => {
                if !dry_run {
                    let _ = store.restore_from(&snapshot_path);
                    let _ = std::fs::remove_file(&snapshot_path);
                }
                Err(MaintenanceError::StepFailed { step, cause })
            }
        }
    }

    fn run_light_sleep_steps(
        &self,
        store: &Store,
        graph: &mut GraphCache,
        dry_run: bool,
    ) -> Result<SleepReport, (String, String)> {
        let mut steps = Vec::new();

        steps.push(self.boost_anchors(store, dry_run).map_err(|e| ("boost_anchors".to_string(), e))?);
        steps.push(self.decay_stale_edges(store, graph, dry_run).map_err(|e| ("stale_edge_decay".to_string(), e))?);
        steps.push(self.scan_duplicates(store).map_err(|e| ("duplicate_scan".to_string(), e))?);
        steps.push(self.recompute_pagerank(store, graph, dry_run).map_err(|e| ("pagerank".to_string(), e))?);

        Ok(SleepReport { mode: SleepMode::Light, steps, rolled_back: false })
    }

    /// §4.9 step 2: upgrade anchor-category nodes below `critical` to
    /// `critical`.
    fn boost_anchors(&self, store: &Store, dry_run: bool) -> Result<StepReport, String> {
        let start = Instant::now();
        let mut changes = 0;
        for id in store.all_node_ids().map_err(|e| e.to_string())? {
            let node = store.require_node(id).map_err(|e| e.to_string())?;
            if self.config.temporal.is_anchor(&node.category) && node.importance != Importance::Critical {
                changes += 1;
                if !dry_run {
                    store.set_importance(id, Importance::Critical).map_err(|e| e.to_string())?;
                }
            }
        }
        Ok(StepReport { name: "boost_anchors".into(), changes, duration_ms: start.elapsed().as_millis() })
    }

    /// §4.9 step 3: edges untouched for >90 days decay by `weight *= 0.95`
    /// unless either endpoint is an anchor category (protected).
    fn decay_stale_edges(&self, store: &Store, graph: &mut GraphCache, dry_run: bool) -> Result<StepReport, String> {
        let start = Instant::now();
        let now = Utc::now();
        let mut changes = 0;
        for edge in store.all_edges().map_err(|e| e.to_string())? {
            if now - edge.last_touched_at <= ChronoDuration::days(90) {
                continue;
            }
            let source = store.require_node(edge.source_id).map_err(|e| e.to_string())?;
            let target = store.require_node(edge.target_id).map_err(|e| e.to_string())?;
            if self.config.temporal.is_anchor(&source.category) || self.config.temporal.is_anchor(&target.category) {
                continue;
            }
            changes += 1;
            if !dry_run {
                store
                    .decay_edge_weight(edge.source_id, edge.target_id, &edge.edge_type, 0.95)
                    .map_err(|e| e.to_string())?;
                graph.insert(&Edge { weight: edge.weight * 0.95, ..edge.clone() });
            }
        }
        Ok(StepReport { name: "stale_edge_decay".into(), changes, duration_ms: start.elapsed().as_millis() })
    }

    /// §4.9 step 4: flag near-duplicate pairs (cosine ≥ 0.95) for operator
    /// review; never deletes (§9 "no automatic pruning").
    fn scan_duplicates(&self, store: &Store) -> Result<StepReport, String> {
        let start = Instant::now();
        let embeddings = store.all_embeddings().map_err(|e| e.to_string())?;
        let mut pairs = Vec::new();
        for i in 0..embeddings.len() {
            for j in (i + 1)..embeddings.len() {
                let sim = crate::embeddings::cosine_similarity(&embeddings[i].1, &embeddings[j].1);
                if sim >= self.config.dup.block_threshold {
                    pairs.push(DuplicatePair { a: embeddings[i].0, b: embeddings[j].0, similarity: sim });
                }
            }
        }
        for pair in &pairs {
            tracing::info!(a = pair.a, b = pair.b, similarity = pair.similarity, "near-duplicate flagged");
        }
        Ok(StepReport { name: "duplicate_scan".into(), changes: pairs.len(), duration_ms: start.elapsed().as_millis() })
    }

    /// Writes PageRank scores normalized to `[0, 1]` by dividing by the
    /// largest score in this run, so a node's stored rank is always
    /// comparable across runs regardless of graph size (§4.9).
    fn recompute_pagerank(&self, store: &Store, graph: &GraphCache, dry_run: bool) -> Result<StepReport, String> {
        let start = Instant::now();
        let ids = store.all_node_ids().map_err(|e| e.to_string())?;
        let ranks = pagerank(graph, &ids, 50);
        let max_rank = ranks.values().cloned().fold(0.0_f32, f32::max);
        let mut changes = 0;
        if !dry_run {
            for (id, rank) in &ranks {
                let normalized = if max_rank > 0.0 { rank / max_rank } else { 0.0 };
                store.set_pagerank(*id, normalized).map_err(|e| e.to_string())?;
                changes += 1;
            }
        } else {
            changes = ranks.len();
        }
        Ok(StepReport { name: "pagerank".into(), changes, duration_ms: start.elapsed().as_millis() })
    }

    /// §4.9 deep-sleep: community detection, typed-relation extraction on
    /// nodes added since the last deep-sleep, cluster summary
    /// materialization. Same snapshot+rollback discipline as light-sleep.
    pub fn run_deep_sleep(
        &mut self,
        store: &Store,
        graph: &mut GraphCache,
        relation_extractor: &dyn RelationExtractor,
        dry_run: bool,
    ) -> Result<SleepReport, MaintenanceError> {
        let snapshot_path = self.snapshot_dir.join(format!("deep-{}.db", Utc::now().timestamp_nanos_opt().unwrap_or(0)));
        if !dry_run {
            store
                .snapshot_to(&snapshot_path)
                .map_err(|e| MaintenanceError::StepFailed { step: "snapshot".into(), cause: e.to_string() })?;
        }

        let since = self.last_deep_sleep.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let result = self.run_deep_sleep_steps(store, graph, relation_extractor, since, dry_run);
        match result {
            Ok(report) => {
                if !dry_run {
                    self.last_deep_sleep = Some(Utc::now());
                }
                let _ = std::fs::remove_file(&snapshot_path);
                Ok(report)
            }
            Err((step, cause)) => {
                if !dry_run {
                    let _ = store.restore_from(&snapshot_path);
                    let _ = std::fs::remove_file(&snapshot_path);
                }
                Err(MaintenanceError::StepFailed { step, cause })
            }
        }
    }

    fn run_deep_sleep_steps(
        &self,
        store: &Store,
        graph: &mut GraphCache,
        relation_extractor: &dyn RelationExtractor,
        since: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<SleepReport, (String, String)> {
        let mut steps = Vec::new();
        steps.push(self.detect_communities_step(store, graph, dry_run).map_err(|e| ("community_detection".to_string(), e))?);
        steps.push(
            self.extract_relations(store, graph, relation_extractor, since, dry_run)
                .map_err(|e| ("relation_extraction".to_string(), e))?,
        );
        steps.push(
            self.materialize_cluster_summaries(store, dry_run)
                .map_err(|e| ("cluster_summary_materialization".to_string(), e))?,
        );
        Ok(SleepReport { mode: SleepMode::Deep, steps, rolled_back: false })
    }

    fn detect_communities_step(&self, store: &Store, graph: &GraphCache, dry_run: bool) -> Result<StepReport, String> {
        let start = Instant::now();
        let ids = store.all_node_ids().map_err(|e| e.to_string())?;
        let labels = detect_communities(graph, &ids, 20);
        let mut changes = 0;
        if !dry_run {
            for (id, label) in &labels {
                store.set_community(*id, Some(*label)).map_err(|e| e.to_string())?;
                changes += 1;
            }
        } else {
            changes = labels.len();
        }
        Ok(StepReport { name: "community_detection".into(), changes, duration_ms: start.elapsed().as_millis() })
    }

    /// §4.9 deep-sleep typed-relation pass: resolve each `(subject,
    /// relation, object)` triple to the node(s) already linking those
    /// canonical entity names, then create a one-sided `TypedRelation` edge
    /// between them (typed-relation edges are not mirrored, §3 invariant 1
    /// only covers semantic/entity edges).
    fn extract_relations(
        &self,
        store: &Store,
        graph: &mut GraphCache,
        relation_extractor: &dyn RelationExtractor,
        since: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<StepReport, String> {
        let start = Instant::now();
        let mut changes = 0;
        for id in store.nodes_created_since(since).map_err(|e| e.to_string())? {
            let node = store.require_node(id).map_err(|e| e.to_string())?;
            for relation in relation_extractor.extract(&node.content) {
                let subject = crate::model::canonicalize(&relation.subject);
                let object = crate::model::canonicalize(&relation.object);
                let Some(subject_entity) = store.find_entity_by_name(&subject).map_err(|e| e.to_string())? else { continue };
                let Some(object_entity) = store.find_entity_by_name(&object).map_err(|e| e.to_string())? else { continue };

                let subject_nodes = store.nodes_for_entity(subject_entity).map_err(|e| e.to_string())?;
                let object_nodes = store.nodes_for_entity(object_entity).map_err(|e| e.to_string())?;

                for &s in &subject_nodes {
                    for &o in &object_nodes {
                        if s == o {
                            continue;
                        }
                        changes += 1;
                        if !dry_run {
                            let edge = Edge::new(s, o, EdgeType::TypedRelation(relation.relation.clone()), 0.6);
                            store.insert_edge(&edge).map_err(|e| e.to_string())?;
                            graph.insert(&edge);
                        }
                    }
                }
            }
        }
        Ok(StepReport { name: "relation_extraction".into(), changes, duration_ms: start.elapsed().as_millis() })
    }

    /// §4.9 deep-sleep step 3: for each community (as just written by
    /// `detect_communities_step`), materialize its top-PageRank member as
    /// the community's label.
    fn materialize_cluster_summaries(&self, store: &Store, dry_run: bool) -> Result<StepReport, String> {
        let start = Instant::now();
        let mut by_community: HashMap<i64, Vec<(NodeId, f32)>> = HashMap::new();
        for id in store.all_node_ids().map_err(|e| e.to_string())? {
            let node = store.require_node(id).map_err(|e| e.to_string())?;
            if let Some(community_id) = node.community_id {
                by_community.entry(community_id).or_default().push((id, node.pagerank));
            }
        }

        let summaries: Vec<(i64, NodeId)> = by_community
            .into_iter()
            .filter_map(|(community_id, members)| {
                members
                    .into_iter()
                    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
                    .map(|(label_node_id, _)| (community_id, label_node_id))
            })
            .collect();

        let changes = summaries.len();
        if !dry_run {
            store.replace_community_summaries(&summaries).map_err(|e| e.to_string())?;
        }
        Ok(StepReport { name: "cluster_summary_materialization".into(), changes, duration_ms: start.elapsed().as_millis() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeType};

    fn edge(u: NodeId, v: NodeId, w: f32) -> Edge {
        Edge { source_id: u, target_id: v, edge_type: EdgeType::Semantic, weight: w, created_at: Utc::now(), last_touched_at: Utc::now() }
    }

    #[test]
    fn pagerank_sums_to_roughly_one() {
        let graph = GraphCache::rebuild_from(vec![edge(1, 2, 1.0), edge(2, 1, 1.0), edge(2, 3, 1.0), edge(3, 2, 1.0)]);
        let ranks = pagerank(&graph, &[1, 2, 3], 50);
        let sum: f32 = ranks.values().sum();
        assert!((sum - 1.0).abs() < 0.05);
    }

    #[test]
    fn pagerank_favors_heavily_linked_node() {
        let graph = GraphCache::rebuild_from(vec![edge(1, 3, 1.0), edge(2, 3, 1.0), edge(4, 3, 1.0)]);
        let ranks = pagerank(&graph, &[1, 2, 3, 4], 50);
        assert!(ranks[&3] > ranks[&1]);
    }

    #[test]
    fn label_propagation_groups_a_clique_together() {
        let graph = GraphCache::rebuild_from(vec![edge(1, 2, 1.0), edge(2, 1, 1.0), edge(2, 3, 1.0), edge(3, 2, 1.0)]);
        let labels = detect_communities(&graph, &[1, 2, 3], 20);
        assert_eq!(labels[&1], labels[&2]);
        assert_eq!(labels[&2], labels[&3]);
    }
}
