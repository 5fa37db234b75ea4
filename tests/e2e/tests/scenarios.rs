//! Literal end-to-end scenarios: duplicate blocking, spreading activation,
//! temporal query decomposition, importance ordering, and snapshot
//! rollback, each driven through the real ingest/search pipeline via
//! [`hippograph_e2e_tests::harness::TestEngine`].

use hippograph_core::{AddInput, DetailMode, Filters, Importance, IngestError, SearchRequest, Store};
use hippograph_e2e_tests::harness::TestEngine;
use tempfile::TempDir;

fn add(harness: &TestEngine, content: &str) -> i64 {
    harness.engine.add(AddInput { content: content.to_string(), ..Default::default() }).expect("add").id
}

fn search(harness: &TestEngine, query: &str) -> hippograph_core::SearchResponse {
    let cancel = TestEngine::search_cancel();
    harness
        .engine
        .search(
            SearchRequest {
                query: query.to_string(),
                filters: Filters::default(),
                max_results: 10,
                detail_mode: DetailMode::Brief,
                blend_override: None,
            },
            &cancel,
        )
        .expect("search")
}

/// Ingesting identical content twice is blocked unless forced; forcing it
/// through still leaves both notes in the store.
#[test]
fn duplicate_ingest_is_blocked_then_allowed_with_force() {
    let harness = TestEngine::new();

    let first = harness
        .engine
        .add(AddInput { content: "Started neural network optimization".to_string(), ..Default::default() })
        .expect("first add succeeds");

    let blocked = harness
        .engine
        .add(AddInput { content: "Started neural network optimization".to_string(), ..Default::default() })
        .expect_err("identical content is blocked");
    match blocked {
        IngestError::Duplicate(id) => assert_eq!(id, first.id),
        other => panic!("expected Duplicate, got {other:?}"),
    }

    let forced = harness
        .engine
        .add(AddInput {
            content: "Started neural network optimization".to_string(),
            force: true,
            ..Default::default()
        })
        .expect("forced add succeeds");
    assert_ne!(forced.id, first.id);

    assert_eq!(harness.node_count(), 2);
}

/// Spreading activation surfaces the topically-related neighbor (N2) above
/// the unrelated note (N3), with N1 (the direct match) ranked highest and
/// N3 scoring near zero.
#[test]
fn spreading_activation_surfaces_related_neighbor() {
    let harness = TestEngine::new();
    let n1 = add(&harness, "Python debugging with pdb");
    let n2 = add(&harness, "Python logging best practices");
    let n3 = add(&harness, "Baking sourdough bread");

    let response = search(&harness, "debugging tools in Python");
    let ids: Vec<i64> = response.results.iter().map(|h| h.id).collect();
    assert_eq!(&ids[..3], &[n1, n2, n3]);

    let score_of = |id: i64| response.results.iter().find(|h| h.id == id).unwrap().score;
    assert!(score_of(n1) > score_of(n2));
    assert!(score_of(n2) > score_of(n3));
    assert!(score_of(n3) < 0.1);
}

/// A query carrying an ordinal marker ("first") but no resolvable explicit
/// date falls back to directional scoring, ranking the earlier-dated note
/// above the later one even though their keyword/semantic overlap ties.
#[test]
fn temporal_query_decomposition_favors_earliest_event() {
    let harness = TestEngine::new();
    let earlier = add(&harness, "Started project on 2026-01-05");
    let _later = add(&harness, "Finished project on 2026-02-10");

    let response = search(&harness, "what happened first in this project?");
    assert_eq!(response.results[0].id, earlier);
}

/// Two notes with identical content (forced past duplicate blocking, so
/// their embeddings and ages are identical) are ranked purely by the
/// importance multiplier once one is marked critical: exactly 2x.
#[test]
fn importance_boost_orders_identical_notes() {
    let harness = TestEngine::new();
    let n1 = add(&harness, "Paris trip planning notes");
    let n2 = harness
        .engine
        .add(AddInput { content: "Paris trip planning notes".to_string(), force: true, ..Default::default() })
        .expect("forced duplicate add")
        .id;

    harness.engine.set_importance(n1, Importance::Critical).expect("set importance");

    let response = search(&harness, "Paris trip planning");
    let pos1 = response.results.iter().position(|h| h.id == n1).expect("n1 present");
    let pos2 = response.results.iter().position(|h| h.id == n2).expect("n2 present");
    assert!(pos1 < pos2);

    let score1 = response.results[pos1].score;
    let score2 = response.results[pos2].score;
    assert!((score1 / score2 - 2.0).abs() < 0.05, "expected ~2x boost, got {}/{}", score1, score2);
}

/// Taking a snapshot, mutating the store, then restoring the snapshot
/// returns node/edge counts and search results to their pre-mutation state.
#[test]
fn snapshot_rollback_restores_prior_state() {
    let harness = TestEngine::new();
    for i in 0..5 {
        add(&harness, &hippograph_e2e_tests::mocks::fixtures::topic_note("lighthouses", i));
    }
    let stats_before = harness.engine.stats().expect("stats before");
    let response_before = search(&harness, "lighthouses");

    let snapshot_dir = TempDir::new().unwrap();
    let snapshot_path = snapshot_dir.path().join("manual.db");
    let side_channel = Store::open(Some(harness.db_path().clone())).expect("side-channel store");
    side_channel.snapshot_to(&snapshot_path).expect("snapshot");

    for i in 5..15 {
        add(&harness, &hippograph_e2e_tests::mocks::fixtures::topic_note("lighthouses", i));
    }
    let doomed = add(&harness, "a note that will be deleted before restore");
    harness.engine.delete(doomed).expect("delete");
    harness.run_light_sleep();

    side_channel.restore_from(&snapshot_path).expect("restore");
    harness.engine.rebuild_indices().expect("rebuild indices after restore");

    let stats_after = harness.engine.stats().expect("stats after restore");
    assert_eq!(stats_after.nodes, stats_before.nodes);
    assert_eq!(stats_after.edges, stats_before.edges);

    let response_after = search(&harness, "lighthouses");
    let ids_before: Vec<i64> = response_before.results.iter().map(|h| h.id).collect();
    let ids_after: Vec<i64> = response_after.results.iter().map(|h| h.id).collect();
    assert_eq!(ids_before, ids_after);
}
