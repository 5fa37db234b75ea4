//! Hybrid retrieval pipeline (§4.6).
//!
//! Pure, store-agnostic pieces of the pipeline live here: spreading
//! activation (§4.6.2), the hub penalty (§4.6.1), and the blend formula
//! (§4.6 step 7). [`crate::ingest::Engine::search`] is the orchestrator that
//! calls the ANN index, the store's BM25 search, the embedder, and the
//! reranker, then hands their outputs to these functions in sequence —
//! keeping the algorithm testable without a database in the loop.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{BlendWeights, Config};
use crate::error::DegradationReason;
use crate::graph::GraphCache;
use crate::model::{Importance, NodeId};

/// §6 Query API filters.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub category: Option<String>,
    pub time_after: Option<DateTime<Utc>>,
    pub time_before: Option<DateTime<Utc>>,
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailMode {
    #[default]
    Brief,
    Full,
}

/// Per-signal contributions kept for diagnostics and for the testable
/// property "the computed blended score equals α·s + β·a + γ·b + δ·t with
/// the observed per-signal values" (§8).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalBreakdown {
    pub semantic: f32,
    pub activation: f32,
    pub bm25: f32,
    pub temporal: f32,
    pub rerank: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: NodeId,
    pub score: f32,
    pub blended_score: f32,
    pub signals: SignalBreakdown,
    pub content_preview: Option<String>,
    pub pagerank: f32,
}

/// §4.6 step 4, §4.6.2: one pass of spreading activation over the graph
/// cache. `seed` is the initial activation (ANN cosine scores); the result
/// accumulates contributions over `iterations` rounds with per-round decay,
/// clamped per-node to `1.0` before the final max-normalization, then
/// normalizes to `[0, 1]` by dividing by the maximum (§4.6 step 4).
///
/// `hub_penalty` receives a node id and returns the multiplicative damping
/// to apply to its contribution as a source (§4.6.1); self-loops are
/// ignored (§4.6.2).
pub fn spread_activation(
    seed: &HashMap<NodeId, f32>,
    graph: &GraphCache,
    iterations: u32,
    decay: f32,
    hub_penalty: impl Fn(NodeId) -> f32,
) -> HashMap<NodeId, f32> {
    const EPSILON: f32 = 1e-6;
    let mut activation: HashMap<NodeId, f32> = seed.clone();

    for _ in 0..iterations {
        let mut delta: HashMap<NodeId, f32> = HashMap::new();
        for (&u, &a_u) in activation.iter() {
            if a_u <= 0.0 {
                continue;
            }
            let source_penalty = hub_penalty(u);
            for neighbor in graph.outgoing(u) {
                if neighbor.id == u {
                    continue; // self-loops ignored (§4.6.2)
                }
                let target_penalty = hub_penalty(neighbor.id);
                let contribution = a_u * neighbor.weight * decay * source_penalty * target_penalty;
                *delta.entry(neighbor.id).or_insert(0.0) += contribution;
            }
        }

        if delta.is_empty() {
            break;
        }

        let mut max_delta: f32 = 0.0;
        for (id, d) in delta {
            let entry = activation.entry(id).or_insert(0.0);
            let before = *entry;
            *entry = (*entry + d).min(1.0);
            max_delta = max_delta.max((*entry - before).abs());
        }
        if max_delta < EPSILON {
            break;
        }
    }

    normalize_to_unit(activation)
}

fn normalize_to_unit(mut activation: HashMap<NodeId, f32>) -> HashMap<NodeId, f32> {
    let max = activation.values().cloned().fold(0.0_f32, f32::max);
    if max > 0.0 {
        for v in activation.values_mut() {
            *v /= max;
        }
    }
    activation
}

/// §4.6.1 hub penalty: `min(1, hub_threshold / entity_count)`. A node with
/// fewer entities than the threshold is unaffected (penalty `1.0`).
pub fn hub_penalty(entity_count: usize, hub_threshold: usize) -> f32 {
    if entity_count <= hub_threshold {
        1.0
    } else {
        (hub_threshold as f32 / entity_count as f32).min(1.0)
    }
}

/// §4.6 step 7: `score = α·semantic + β·activation + γ·bm25 + δ·temporal`.
/// Candidates missing from a signal contribute `0` from that signal, which
/// callers express by passing `0.0` rather than omitting the term.
pub fn blend(weights: &BlendWeights, semantic: f32, activation: f32, bm25: f32, temporal: f32) -> f32 {
    weights.alpha * semantic + weights.beta * activation + weights.gamma * bm25 + weights.delta * temporal
}

/// §4.6 step 9: combine the blended score with a normalized rerank score.
pub fn apply_rerank(score: f32, normalized_rerank: f32, weight: f32) -> f32 {
    (1.0 - weight) * score + weight * normalized_rerank
}

/// §4.6 step 10: recency and importance multipliers applied in place.
pub fn apply_decay_and_importance(score: f32, recency_factor: f32, importance: Importance) -> f32 {
    score * recency_factor * importance.multiplier()
}

/// §4.6 step 11 tie-break: descending score, then descending pagerank, then
/// ascending id (stable, deterministic ordering for equal scores).
pub fn sort_hits(hits: &mut [SearchHit], pagerank: impl Fn(NodeId) -> f32) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                pagerank(b.id)
                    .partial_cmp(&pagerank(a.id))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// First line of content, truncated to 200 chars (§4.6 step 12 "brief mode
/// a content preview (first line, ≤200 chars)").
pub fn content_preview(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("");
    if first_line.chars().count() <= 200 {
        first_line.to_string()
    } else {
        first_line.chars().take(200).collect()
    }
}

/// Aggregated result of one search (§6 Query API).
#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub total_activated: usize,
    pub estimated_tokens: usize,
    pub has_more: bool,
    pub durations_ms: crate::model::search_log::PhaseDurations,
    pub degradations: Vec<DegradationReason>,
}

/// Rough token estimate for `estimated_tokens` (§6): ~4 characters/token,
/// the same heuristic the reference workspace's MCP layer budgets context
/// windows with.
pub fn estimate_tokens(results: &[SearchHit]) -> usize {
    results
        .iter()
        .map(|r| r.content_preview.as_deref().map(str::len).unwrap_or(0) / 4)
        .sum()
}

/// Effective blend weights for a config and a query's temporal signal.
pub fn effective_weights(config: &Config, has_temporal_signal: bool) -> BlendWeights {
    config.blend.effective(has_temporal_signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeType};

    fn edge(u: NodeId, v: NodeId, w: f32) -> Edge {
        Edge {
            source_id: u,
            target_id: v,
            edge_type: EdgeType::Semantic,
            weight: w,
            created_at: Utc::now(),
            last_touched_at: Utc::now(),
        }
    }

    #[test]
    fn spreading_reaches_neighbor_and_normalizes() {
        let graph = GraphCache::rebuild_from(vec![edge(1, 2, 0.8)]);
        let seed = HashMap::from([(1, 1.0)]);
        let activation = spread_activation(&seed, &graph, 3, 0.7, |_| 1.0);
        assert!(activation[&1] > 0.0);
        assert!(activation[&2] > 0.0);
        assert!(activation.values().cloned().fold(0.0_f32, f32::max) <= 1.0 + 1e-6);
    }

    #[test]
    fn self_loop_does_not_add_activation() {
        let graph = GraphCache::rebuild_from(vec![edge(1, 1, 0.9)]);
        let seed = HashMap::from([(1, 1.0)]);
        let activation = spread_activation(&seed, &graph, 3, 0.7, |_| 1.0);
        assert_eq!(activation.len(), 1);
    }

    #[test]
    fn hub_penalty_dampens_high_degree_nodes() {
        assert_eq!(hub_penalty(5, 20), 1.0);
        assert!((hub_penalty(40, 20) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn blend_matches_weighted_sum() {
        let weights = BlendWeights { alpha: 0.6, beta: 0.1, gamma: 0.15, delta: 0.15 };
        let score = blend(&weights, 1.0, 0.5, 0.2, 0.0);
        let expected = 0.6 * 1.0 + 0.1 * 0.5 + 0.15 * 0.2;
        assert!((score - expected).abs() < 1e-6);
    }

    #[test]
    fn importance_boost_is_exactly_double_for_critical() {
        let normal = apply_decay_and_importance(1.0, 1.0, Importance::Normal);
        let critical = apply_decay_and_importance(1.0, 1.0, Importance::Critical);
        assert!((critical / normal - 2.0).abs() < 1e-6);
    }

    #[test]
    fn sort_breaks_ties_by_pagerank_then_id() {
        let mk = |id: NodeId, score: f32| SearchHit {
            id,
            score,
            blended_score: score,
            signals: SignalBreakdown::default(),
            content_preview: None,
            pagerank: 0.0,
        };
        let mut hits = vec![mk(2, 0.5), mk(1, 0.5), mk(3, 0.9)];
        let pagerank = HashMap::from([(1, 0.2_f32), (2, 0.8_f32), (3, 0.1_f32)]);
        sort_hits(&mut hits, |id| pagerank[&id]);
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn content_preview_truncates_at_200_chars() {
        let long = "a".repeat(300);
        assert_eq!(content_preview(&long).chars().count(), 200);
        assert_eq!(content_preview("short\nsecond line"), "short");
    }
}
