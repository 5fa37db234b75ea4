//! HippoGraph search benchmarks.
//!
//! Run with: cargo bench -p hippograph-core

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hippograph_core::model::{Edge, EdgeType, NodeId};
use hippograph_core::retriever::{blend, hub_penalty, sort_hits, spread_activation, SearchHit, SignalBreakdown};
use chrono::{Duration, Utc};
use hippograph_core::config::TemporalConfig;
use hippograph_core::search::{normalize_bm25_scores, recency_factor, sanitize_fts5_query};
use hippograph_core::{cosine_similarity, Config, Importance};

/// A graph of `n` nodes, each linked to its next `fan_out` neighbors —
/// dense enough to exercise several rounds of spreading activation without
/// converging in a single pass.
fn build_graph(n: i64, fan_out: i64) -> hippograph_core::GraphCache {
    let mut edges = Vec::new();
    for id in 0..n {
        for offset in 1..=fan_out {
            let target = (id + offset) % n;
            edges.push(Edge::new(id, target, EdgeType::Semantic, 0.6));
        }
    }
    hippograph_core::GraphCache::rebuild_from(edges)
}

fn bench_spread_activation(c: &mut Criterion) {
    let graph = build_graph(500, 6);
    let mut seed: HashMap<NodeId, f32> = HashMap::new();
    for id in 0..10 {
        seed.insert(id, 1.0 - id as f32 * 0.05);
    }

    c.bench_function("spread_activation_500nodes", |b| {
        b.iter(|| {
            black_box(spread_activation(&seed, &graph, 3, 0.5, |_id| hub_penalty(4, 15)));
        })
    });
}

fn bench_pagerank(c: &mut Criterion) {
    let graph = build_graph(500, 6);
    let node_ids: Vec<NodeId> = (0..500).collect();

    c.bench_function("pagerank_500nodes", |b| {
        b.iter(|| {
            black_box(hippograph_core::sleep::pagerank(&graph, &node_ids, 20));
        })
    });
}

fn bench_blend(c: &mut Criterion) {
    let config = Config::default();
    let weights = config.blend.effective(false);

    c.bench_function("blend", |b| {
        b.iter(|| {
            black_box(blend(&weights, 0.82, 0.41, 0.63, 0.0));
        })
    });
}

fn bench_sort_hits(c: &mut Criterion) {
    let mut hits: Vec<SearchHit> = (0..200)
        .map(|i| SearchHit {
            id: i,
            score: (i as f32 * 37.0 % 97.0) / 97.0,
            blended_score: 0.0,
            signals: SignalBreakdown::default(),
            content_preview: None,
            pagerank: (i as f32 * 13.0 % 29.0) / 29.0,
        })
        .collect();

    c.bench_function("sort_hits_200", |b| {
        b.iter(|| {
            let mut copy = hits.clone();
            sort_hits(&mut copy, |id| (id as f32 * 13.0 % 29.0) / 29.0);
            black_box(&copy);
        })
    });
    hits.clear();
}

fn bench_sanitize_fts5(c: &mut Criterion) {
    c.bench_function("sanitize_fts5_query", |b| {
        b.iter(|| {
            black_box(sanitize_fts5_query("hello world \"exact phrase\" OR special-chars!@#"));
        })
    });
}

fn bench_normalize_bm25(c: &mut Criterion) {
    let raw: Vec<(NodeId, f64)> = (0..50).map(|i| (i, 1.0 / (1.0 + i as f64))).collect();

    c.bench_function("normalize_bm25_scores_50", |b| {
        b.iter(|| {
            black_box(normalize_bm25_scores(&raw));
        })
    });
}

fn bench_recency_factor(c: &mut Criterion) {
    let config = TemporalConfig::default();
    let now = Utc::now();
    let created_at = now - Duration::days(30);

    c.bench_function("recency_factor", |b| {
        b.iter(|| {
            black_box(recency_factor(created_at, now, "fact", &config));
        })
    });
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..256).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..256).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_256d", |b_bench| {
        b_bench.iter(|| {
            black_box(cosine_similarity(&a, &b));
        })
    });
}

fn bench_importance_multiplier(c: &mut Criterion) {
    c.bench_function("importance_multiplier", |b| {
        b.iter(|| {
            black_box(Importance::High.multiplier());
        })
    });
}

criterion_group!(
    benches,
    bench_spread_activation,
    bench_pagerank,
    bench_blend,
    bench_sort_hits,
    bench_sanitize_fts5,
    bench_normalize_bm25,
    bench_recency_factor,
    bench_cosine_similarity,
    bench_importance_multiplier,
);
criterion_main!(benches);
