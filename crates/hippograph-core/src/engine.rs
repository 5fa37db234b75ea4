//! The write path (§1 item 2) and read path (§1 item 3) orchestrator.
//!
//! `Engine` is the one component that holds every piece of mutable state
//! together: the [`Store`], the [`VectorIndex`], the [`GraphCache`], and the
//! narrow external-service traits (§9). It is the thing `hippograph-mcp`'s
//! tool handlers call into — each External Interface in §6 is one public
//! method here. Per §5, the store's writer lock is the only lock any
//! mutating method holds for more than the duration of a single store call;
//! embedding/extraction/reranking inference never happens while it is held.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::date_resolver::DateResolver;
use crate::embeddings::Embedder;
use crate::entities::{apply_entity_edge, link_entities};
use crate::error::{DegradationReason, IngestError, MaintenanceError, RetrieverError, StoreError};
use crate::extractor::{EntityExtractor, RelationExtractor};
use crate::graph::GraphCache;
use crate::model::search_log::PhaseDurations;
use crate::model::{Edge, EdgeType, Importance, Node, NodeFilter, NodeId, NodeVersion, SearchLogEntry};
use crate::retriever::{self, DetailMode, Filters, SearchHit, SearchStats, SignalBreakdown};
use crate::search::reranker::Reranker;
use crate::search::vector::VectorIndex;
use crate::search::{decompose_query, directional_scores, normalize_bm25_scores, recency_factor, sanitize_fts5_query, temporal_score};
use crate::sleep::{SleepMode, SleepReport, SleepScheduler};
use crate::storage::Store;

/// Input to [`Engine::add`] (§6 Ingest API `add`).
#[derive(Debug, Clone, Default)]
pub struct AddInput {
    pub content: String,
    pub category: Option<String>,
    pub importance: Option<Importance>,
    pub emotional_tone: Option<f32>,
    pub emotional_intensity: Option<f32>,
    pub emotional_reflection: Option<String>,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct AddResult {
    pub id: NodeId,
    pub duplicate_warning: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SimilarityHit {
    pub id: NodeId,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub filters: Filters,
    pub max_results: usize,
    pub detail_mode: DetailMode,
    pub blend_override: Option<Config>,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSummary {
    pub nodes: i64,
    pub edges: i64,
    pub entities: i64,
    pub categories: Vec<String>,
    pub top_pagerank: Vec<(NodeId, f32)>,
    pub communities: usize,
}

pub struct Engine {
    store: Store,
    vector_index: Mutex<VectorIndex>,
    graph: Mutex<GraphCache>,
    embedder: Box<dyn Embedder>,
    reranker: Box<dyn Reranker>,
    entity_extractor: Box<dyn EntityExtractor>,
    date_resolver: Box<dyn DateResolver>,
    relation_extractor: Box<dyn RelationExtractor>,
    config: Config,
    sleep: Mutex<SleepScheduler>,
}

const QUERY_MAX_LEN: usize = 2000;
const ANN_CANDIDATES: usize = 50;
const TOP_M: usize = 20;

impl Engine {
    pub fn new(
        store: Store,
        vector_index: VectorIndex,
        graph: GraphCache,
        embedder: Box<dyn Embedder>,
        reranker: Box<dyn Reranker>,
        entity_extractor: Box<dyn EntityExtractor>,
        date_resolver: Box<dyn DateResolver>,
        relation_extractor: Box<dyn RelationExtractor>,
        config: Config,
        snapshot_dir: PathBuf,
    ) -> Self {
        let sleep = SleepScheduler::new(config.clone(), snapshot_dir);
        Self {
            store,
            vector_index: Mutex::new(vector_index),
            graph: Mutex::new(graph),
            embedder,
            reranker,
            entity_extractor,
            date_resolver,
            relation_extractor,
            config,
            sleep: Mutex::new(sleep),
        }
    }

    /// Rebuild the ANN index and graph cache from the store — used at
    /// startup when the on-disk ANN version mismatches, and after a
    /// snapshot restore (§4.1, §4.2). Starts from a fresh, empty ANN index
    /// rather than adding onto the live one, so ids removed since the last
    /// build (a restore that rolled back ingests, for instance) don't
    /// linger as stale entries.
    pub fn rebuild_indices(&self) -> Result<(), StoreError> {
        let embeddings = self.store.all_embeddings()?;
        let mut fresh_index =
            VectorIndex::new().map_err(|e| StoreError::IntegrityViolation(e.to_string()))?;
        for (id, vector) in embeddings {
            let _ = fresh_index.add(id, &vector);
        }
        *self.vector_index.lock().expect("vector index lock poisoned") = fresh_index;

        let edges = self.store.all_edges()?;
        *self.graph.lock().expect("graph lock poisoned") = GraphCache::rebuild_from(edges);
        Ok(())
    }

    // ---- Ingest API (§6) --------------------------------------------------

    /// §6 `add`. Embeds, checks for duplicates (§4.8), persists the node,
    /// links entities (external extraction hand-off), creates semantic and
    /// entity edges, and updates every derived index before returning.
    pub fn add(&self, input: AddInput) -> Result<AddResult, IngestError> {
        if input.content.trim().is_empty() {
            return Err(IngestError::InvalidInput { field: "content".into(), reason: "content must not be empty".into() });
        }

        let vector = self
            .embedder
            .encode(&input.content)
            .map_err(|e| IngestError::EmbeddingFailed(e.to_string()))?;

        let (duplicate_warning, blocked) = self.check_duplicate(&vector)?;
        if let Some(existing_id) = blocked {
            if !input.force {
                return Err(IngestError::Duplicate(existing_id));
            }
        }

        let mut node = Node::new(input.content.clone(), input.category.unwrap_or_else(|| "general".into()));
        node.importance = input.importance.unwrap_or_default();
        node.emotional_tone = input.emotional_tone.unwrap_or(0.0);
        node.emotional_intensity = input.emotional_intensity.unwrap_or(0.0);
        node.emotional_reflection = input.emotional_reflection;
        if let Some(range) = self.date_resolver.resolve(&input.content, node.created_at) {
            node.t_event_start = Some(range.start);
            node.t_event_end = range.end;
        }

        // Node + embedding are persisted together in one transaction
        // (§4.1); the id is DB-assigned, so if the ANN add then fails we
        // compensate by deleting the row rather than leaving a persisted
        // node with no index entry (§4.2: partial index state is forbidden).
        let id = self.store.insert_node_with_embedding(&node, &vector)?;
        if let Err(e) = self.vector_index.lock().expect("vector index lock poisoned").add(id, &vector) {
            self.store.delete_node(id).ok();
            return Err(IngestError::StoreFailed(StoreError::IntegrityViolation(e.to_string())));
        }

        self.link_entities_and_edges(id, &input.content, &vector)?;

        self.sleep.lock().expect("sleep scheduler lock poisoned").record_ingest();

        Ok(AddResult { id, duplicate_warning: duplicate_warning.filter(|_| blocked.is_none()) })
    }

    /// §4.8 duplicate detection: returns `(warn_id, block_id)`. `block_id`
    /// is `Some` only at/above `dup.block_threshold`; `warn_id` is `Some`
    /// at/above `dup.warn_threshold` (including the blocked case, so
    /// `force=true` callers still see which note it nearly duplicates).
    fn check_duplicate(&self, vector: &[f32]) -> Result<(Option<NodeId>, Option<NodeId>), IngestError> {
        let index = self.vector_index.lock().expect("vector index lock poisoned");
        let top = index
            .search(vector, 5)
            .map_err(|e| IngestError::StoreFailed(StoreError::IntegrityViolation(e.to_string())))?;
        drop(index);

        let Some((best_id, best_score)) = top.into_iter().max_by(|a, b| a.1.partial_cmp(&b.1).unwrap()) else {
            return Ok((None, None));
        };
        if best_score >= self.config.dup.block_threshold {
            Ok((Some(best_id), Some(best_id)))
        } else if best_score >= self.config.dup.warn_threshold {
            Ok((Some(best_id), None))
        } else {
            Ok((None, None))
        }
    }

    fn link_entities_and_edges(&self, id: NodeId, content: &str, vector: &[f32]) -> Result<(), IngestError> {
        let extracted = self.entity_extractor.extract(content);
        let plans = link_entities(&self.store, id, &extracted)?;
        let mut graph = self.graph.lock().expect("graph lock poisoned");
        for plan in &plans {
            apply_entity_edge(&self.store, id, plan)?;
            if let Ok(edge) = self.store.edges_from(id).map(|edges| {
                edges.into_iter().find(|e| e.target_id == plan.other_id && e.edge_type == EdgeType::Entity)
            }) {
                if let Some(edge) = edge {
                    graph.insert(&edge);
                    graph.insert(&edge.mirror());
                }
            }
        }

        // Semantic edges to the note's own near neighbors, excluding itself.
        let neighbors = self
            .vector_index
            .lock()
            .expect("vector index lock poisoned")
            .search(vector, 6)
            .map_err(|e| IngestError::StoreFailed(StoreError::IntegrityViolation(e.to_string())))?;
        for (neighbor_id, score) in neighbors {
            if neighbor_id == id || score <= 0.0 {
                continue;
            }
            let edge = Edge::new(id, neighbor_id, EdgeType::Semantic, score.clamp(0.0, 1.0));
            self.store.insert_edge(&edge)?;
            graph.insert(&edge);
            graph.insert(&edge.mirror());
        }
        Ok(())
    }

    /// §6 `update`. Snapshots the prior content as a version (§3 invariant
    /// 6); re-embeds and re-links entities only if content actually
    /// changed, matching §8's "`add(x); update(id, x)` produces no new
    /// edges and no new version row". Entity relinking is configurable
    /// (§9 Open Question, resolved in `Config::entities.relink_on_update`).
    pub fn update(&self, id: NodeId, content: Option<String>, category: Option<String>) -> Result<i64, IngestError> {
        let existing = self.store.require_node(id)?;
        let mut version = self.store.list_node_versions(id)?.first().map(|v| v.version).unwrap_or(0);

        if let Some(new_content) = content {
            if new_content != existing.content {
                self.store.update_node_content(id, &new_content)?;
                version += 1;

                if self.config.entities.relink_on_update {
                    let vector = self.embedder.encode(&new_content).map_err(|e| IngestError::EmbeddingFailed(e.to_string()))?;
                    // The id already exists, so the ANN index can be
                    // updated first; if the subsequent store write fails,
                    // restore the index to the previously-persisted vector
                    // rather than leave it pointing at an un-persisted one
                    // (§4.1, §4.2).
                    let previous_vector = self.store.get_embedding(id)?;
                    self.vector_index
                        .lock()
                        .expect("vector index lock poisoned")
                        .add(id, &vector)
                        .map_err(|e| IngestError::StoreFailed(StoreError::IntegrityViolation(e.to_string())))?;
                    if let Err(e) = self.store.set_embedding(id, &vector) {
                        let mut index = self.vector_index.lock().expect("vector index lock poisoned");
                        match &previous_vector {
                            Some(prev) => {
                                index.add(id, prev).ok();
                            }
                            None => {
                                index.remove(id).ok();
                            }
                        }
                        return Err(e.into());
                    }
                    self.link_entities_and_edges(id, &new_content, &vector)?;
                }
            }
        }
        if let Some(new_category) = category {
            if new_category != existing.category {
                self.store.set_category(id, &new_category)?;
            }
        }
        Ok(version)
    }

    /// The store delete is authoritative and runs first; the in-memory ANN
    /// index and graph cache are derived caches rebuilt wholesale from the
    /// store at startup (`rebuild_indices`) and filtered against it at
    /// query time, so cleaning them up after the store commit can never
    /// leave a stale entry observably inconsistent (§4.1, §4.2).
    pub fn delete(&self, id: NodeId) -> Result<(), StoreError> {
        let deleted = self.store.delete_node(id)?;
        if !deleted {
            return Err(StoreError::NotFound(id));
        }
        self.vector_index.lock().expect("vector index lock poisoned").remove(id).ok();
        self.graph.lock().expect("graph lock poisoned").remove_node(id);
        Ok(())
    }

    pub fn set_importance(&self, id: NodeId, level: Importance) -> Result<(), StoreError> {
        self.store.require_node(id)?;
        self.store.set_importance(id, level)
    }

    /// §6 `find_similar`. Does not persist anything; a pure ANN query
    /// against the content's embedding.
    pub fn find_similar(&self, content: &str, limit: usize, threshold: f32) -> Result<Vec<SimilarityHit>, IngestError> {
        let vector = self.embedder.encode(content).map_err(|e| IngestError::EmbeddingFailed(e.to_string()))?;
        let hits = self
            .vector_index
            .lock()
            .expect("vector index lock poisoned")
            .search_with_threshold(&vector, limit, threshold)
            .map_err(|e| IngestError::StoreFailed(StoreError::IntegrityViolation(e.to_string())))?;
        Ok(hits.into_iter().map(|(id, similarity)| SimilarityHit { id, similarity }).collect())
    }

    pub fn get_history(&self, id: NodeId) -> Result<Vec<NodeVersion>, StoreError> {
        self.store.list_node_versions(id)
    }

    /// §6 `restore_version`: replace content with the named version's
    /// content, keeping the node's id (§3 "Lifecycle"). A no-op restore of
    /// the current content still pushes a version row via
    /// `update_node_content`'s normal path, matching §8's "restoring the
    /// most recent version is a no-op on content" (the content does not
    /// change, so the version list is unaffected).
    pub fn restore_version(&self, id: NodeId, version: i64) -> Result<(), StoreError> {
        let versions = self.store.list_node_versions(id)?;
        let target = versions.into_iter().find(|v| v.version == version).ok_or(StoreError::NotFound(id))?;
        let current = self.store.require_node(id)?;
        if current.content != target.content {
            self.store.update_node_content(id, &target.content)?;
        }
        Ok(())
    }

    // ---- Query API (§6, §4.6) --------------------------------------------

    /// §4.6: the hybrid retrieval pipeline. Checks `cancel` before steps
    /// 2 (embed), 3 (ANN), 4 (spreading), 5 (BM25), 9 (rerank), and 10
    /// (decay), per §5's cancellation contract.
    pub fn search(&self, request: SearchRequest, cancel: &CancellationToken) -> Result<SearchResponse, RetrieverError> {
        let total_start = Instant::now();
        let mut durations = PhaseDurations::default();
        let mut degradations = Vec::new();

        if request.query.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }
        if request.query.chars().count() > QUERY_MAX_LEN {
            return Err(RetrieverError::QueryTooLong { len: request.query.chars().count(), max: QUERY_MAX_LEN });
        }

        let config = request.blend_override.as_ref().unwrap_or(&self.config);
        let (stripped, direction, has_temporal) = decompose_query(&request.query);

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        let embed_start = Instant::now();
        let query_vector = if self.embedder.is_available() {
            match self.embedder.encode(&stripped) {
                Ok(v) => Some(v),
                Err(_) => {
                    degradations.push(DegradationReason::EmbeddingUnavailable);
                    None
                }
            }
        } else {
            degradations.push(DegradationReason::EmbeddingUnavailable);
            None
        };
        durations.embedding_ms = embed_start.elapsed().as_secs_f64() * 1000.0;
        if durations.embedding_ms > self.config.timeouts.embed_ms as f64 {
            // Embedding is required for ANN/spreading; a slow embed just
            // means those signals run late, not that they're skipped.
            degradations.push(DegradationReason::PhaseTimedOut("embed".into()));
        }

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        let ann_start = Instant::now();
        let ann_hits: Vec<(NodeId, f32)> = if let Some(vector) = &query_vector {
            self.vector_index
                .lock()
                .expect("vector index lock poisoned")
                .search(vector, ANN_CANDIDATES)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        durations.ann_ms = ann_start.elapsed().as_secs_f64() * 1000.0;
        if durations.ann_ms > self.config.timeouts.ann_ms as f64 {
            degradations.push(DegradationReason::PhaseTimedOut("ann".into()));
        }

        if total_start.elapsed().as_millis() as u64 > self.config.timeouts.total_ms {
            return Err(RetrieverError::Timeout { phase: Some("ann".into()) });
        }

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        let spread_start = Instant::now();
        let seed: HashMap<NodeId, f32> = ann_hits.iter().map(|(id, score)| (*id, score.max(0.0))).collect();
        let activation = {
            let graph = self.graph.lock().expect("graph lock poisoned");
            let hub_threshold = self.config.hub.threshold;
            retriever::spread_activation(&seed, &graph, self.config.spread.iterations, self.config.spread.decay, |id| {
                let count = self.store.entity_count_for_node(id).unwrap_or(0);
                retriever::hub_penalty(count, hub_threshold)
            })
        };
        durations.spreading_ms = spread_start.elapsed().as_secs_f64() * 1000.0;

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        let bm25_start = Instant::now();
        let sanitized = sanitize_fts5_query(&stripped);
        let raw_bm25 = if sanitized.is_empty() { Vec::new() } else { self.store.keyword_search(&sanitized, ANN_CANDIDATES).unwrap_or_default() };
        let bm25_scores: HashMap<NodeId, f32> = normalize_bm25_scores(&raw_bm25).into_iter().collect();
        durations.bm25_ms = bm25_start.elapsed().as_secs_f64() * 1000.0;
        if durations.bm25_ms > self.config.timeouts.bm25_ms as f64 {
            degradations.push(DegradationReason::PhaseTimedOut("bm25".into()));
        }

        if total_start.elapsed().as_millis() as u64 > self.config.timeouts.total_ms {
            return Err(RetrieverError::Timeout { phase: Some("bm25".into()) });
        }

        let temporal_start = Instant::now();
        let candidate_ids: std::collections::HashSet<NodeId> = ann_hits
            .iter()
            .map(|(id, _)| *id)
            .chain(activation.keys().copied())
            .chain(bm25_scores.keys().copied())
            .collect();
        durations.temporal_ms = temporal_start.elapsed().as_secs_f64() * 1000.0;

        let ann_scores: HashMap<NodeId, f32> = ann_hits.into_iter().collect();
        let weights = retriever::effective_weights(config, has_temporal);
        let now = Utc::now();

        // §4.5 temporal signal: resolve an explicit range from the query
        // text first (the same `DateResolver` ingestion uses, applied to
        // the query instead of note content); if the query only carries an
        // ordinal marker ("first"/"last") with nothing to resolve, fall
        // back to scoring candidates relative to their own event-time
        // extremes (§9 Open Question, resolved in `DESIGN.md`).
        let query_range = if has_temporal { self.date_resolver.resolve(&request.query, now) } else { None };
        let directional = if has_temporal && query_range.is_none() {
            let events = candidate_ids
                .iter()
                .filter_map(|&id| self.store.require_node(id).ok().map(|n| (id, n.t_event_start)));
            directional_scores(direction, events)
        } else {
            HashMap::new()
        };

        let mut hits = Vec::new();
        for id in candidate_ids {
            let Ok(node) = self.store.require_node(id) else { continue };
            if !request.filters.matches(&node) {
                continue;
            }
            if let Some(wanted) = &request.filters.entity_type {
                let linked = self.store.entities_for_node(id).unwrap_or_default();
                if !linked.iter().any(|e| e.entity_type.as_str() == wanted) {
                    continue;
                }
            }
            let semantic = ann_scores.get(&id).copied().unwrap_or(0.0);
            let act = activation.get(&id).copied().unwrap_or(0.0);
            let bm25 = bm25_scores.get(&id).copied().unwrap_or(0.0);
            let temporal = if let Some(range) = query_range {
                temporal_score(Some(range), node.t_event_start, node.t_event_end) as f32
            } else {
                directional.get(&id).copied().unwrap_or(0.0) as f32
            };

            let blended = retriever::blend(&weights, semantic, act, bm25, temporal);
            let content_preview = match request.detail_mode {
                DetailMode::Brief => retriever::content_preview(&node.content),
                DetailMode::Full => node.content.clone(),
            };
            hits.push(SearchHit {
                id,
                score: blended,
                blended_score: blended,
                signals: SignalBreakdown { semantic, activation: act, bm25, temporal, rerank: None },
                content_preview: Some(content_preview),
                pagerank: node.pagerank,
            });
        }

        hits.sort_by(|a, b| b.blended_score.partial_cmp(&a.blended_score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(TOP_M);

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        let rerank_start = Instant::now();
        let rerank_budget_exhausted = total_start.elapsed().as_millis() as u64 >= self.config.timeouts.total_ms;
        if rerank_budget_exhausted {
            degradations.push(DegradationReason::PhaseTimedOut("rerank".into()));
        } else if self.config.rerank.enabled && self.reranker.is_available() && !hits.is_empty() {
            let texts: Vec<String> = hits
                .iter()
                .map(|h| self.store.require_node(h.id).map(|n| n.content).unwrap_or_default())
                .collect();
            match self.reranker.score(&request.query, &texts) {
                Ok(scores) => {
                    let normalized = crate::search::reranker::normalize(&scores);
                    for (hit, norm) in hits.iter_mut().zip(normalized.into_iter()) {
                        hit.signals.rerank = Some(norm);
                        hit.score = retriever::apply_rerank(hit.blended_score, norm, self.config.rerank.weight);
                    }
                }
                Err(_) => degradations.push(DegradationReason::RerankerUnavailable),
            }
        } else if self.config.rerank.enabled {
            degradations.push(DegradationReason::RerankerUnavailable);
        }
        durations.rerank_ms = rerank_start.elapsed().as_secs_f64() * 1000.0;
        if durations.rerank_ms > self.config.timeouts.rerank_ms as f64 {
            degradations.push(DegradationReason::PhaseTimedOut("rerank".into()));
        }

        if cancel.is_cancelled() {
            return Err(RetrieverError::Cancelled);
        }
        for hit in hits.iter_mut() {
            let Ok(node) = self.store.require_node(hit.id) else { continue };
            let recency = recency_factor(node.created_at, now, &node.category, &self.config.temporal) as f32;
            hit.score = retriever::apply_decay_and_importance(hit.score, recency, node.importance);
        }

        retriever::sort_hits(&mut hits, |id| self.store.get_node(id).ok().flatten().map(|n| n.pagerank).unwrap_or(0.0));

        let total_activated = hits.len();
        let has_more = hits.len() > request.max_results;
        hits.truncate(request.max_results.min(20));

        for hit in &hits {
            self.store.touch_access(hit.id).ok();
        }

        durations.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

        let entry = SearchLogEntry {
            query_hash: content_hash(&request.query),
            timestamp: now,
            durations: durations.clone(),
            result_ids: hits.iter().map(|h| h.id).collect(),
            zero_result: hits.is_empty(),
            degraded: !degradations.is_empty(),
        };
        self.store.log_search(&entry).ok();

        let stats = SearchStats {
            total_activated,
            estimated_tokens: retriever::estimate_tokens(&hits),
            has_more,
            durations_ms: durations,
            degradations,
        };
        Ok(SearchResponse { results: hits, stats })
    }

    pub fn stats(&self) -> Result<StatsSummary, StoreError> {
        let store_stats = self.store.stats()?;
        let mut top_pagerank = Vec::new();
        let mut categories = std::collections::HashSet::new();
        let mut communities = std::collections::HashSet::new();
        for id in self.store.all_node_ids()? {
            if let Ok(node) = self.store.require_node(id) {
                categories.insert(node.category.clone());
                if let Some(c) = node.community_id {
                    communities.insert(c);
                }
                top_pagerank.push((id, node.pagerank));
            }
        }
        top_pagerank.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        top_pagerank.truncate(10);

        Ok(StatsSummary {
            nodes: store_stats.node_count,
            edges: store_stats.edge_count,
            entities: store_stats.entity_count,
            categories: categories.into_iter().collect(),
            top_pagerank,
            communities: communities.len(),
        })
    }

    pub fn get_graph(&self, id: NodeId) -> Result<Vec<(NodeId, f32, String)>, StoreError> {
        self.store.require_node(id)?;
        let edges = self.store.edges_from(id)?;
        Ok(edges.into_iter().map(|e| (e.target_id, e.weight, e.edge_type.label())).collect())
    }

    // ---- Maintenance API (§6, §4.9) ---------------------------------------

    pub fn run_sleep(&self, mode: SleepMode, dry_run: bool) -> Result<SleepReport, MaintenanceError> {
        let mut sleep = self.sleep.lock().expect("sleep scheduler lock poisoned");
        let mut graph = self.graph.lock().expect("graph lock poisoned");
        match mode {
            SleepMode::Light => sleep.run_light_sleep(&self.store, &mut graph, dry_run),
            SleepMode::Deep => sleep.run_deep_sleep(&self.store, &mut graph, self.relation_extractor.as_ref(), dry_run),
        }
    }

    pub fn light_sleep_due(&self) -> bool {
        self.sleep.lock().expect("sleep scheduler lock poisoned").light_sleep_due()
    }

    pub fn deep_sleep_due(&self) -> bool {
        self.sleep.lock().expect("sleep scheduler lock poisoned").deep_sleep_due(Utc::now())
    }

    pub fn search_latency_percentiles(&self, window: usize) -> Result<LatencyPercentiles, StoreError> {
        let mut durations = self.store.recent_search_durations(window)?;
        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(LatencyPercentiles {
            p50: percentile(&durations, 0.50),
            p95: percentile(&durations, 0.95),
            p99: percentile(&durations, 0.99),
            sample_count: durations.len(),
        })
    }
}

trait FiltersExt {
    fn matches(&self, node: &Node) -> bool;
}

impl FiltersExt for Filters {
    fn matches(&self, node: &Node) -> bool {
        let filter = NodeFilter {
            category: self.category.clone(),
            time_after: self.time_after,
            time_before: self.time_before,
            entity_type: self.entity_type.clone(),
        };
        filter.matches(node)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub sample_count: usize,
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// A stable hash over normalized query text (§9 Open Question: "any stable
/// hash over normalized query text suffices").
fn content_hash(query: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    query.trim().to_lowercase().hash(&mut hasher);
    hasher.finish()
}
