//! Maintenance-cycle behavior: anchor protection and the stability of
//! running light-sleep repeatedly with nothing new to do.
//!
//! These exercise [`SleepScheduler`] directly against a bare [`Store`] and
//! [`GraphCache`], the same two collaborators `Engine::run_sleep` hands it
//! — letting the test control node ages and edge staleness precisely,
//! which the ingest-time API (always stamping `created_at`/`last_touched_at`
//! as "now") can't do on its own.

use chrono::{Duration, Utc};
use hippograph_core::{Config, Edge, EdgeType, GraphCache, Importance, Node, SleepScheduler, Store};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Store {
    Store::open(Some(dir.path().join("test.db"))).expect("open store")
}

/// Node X with an anchor category, created 200 days ago, with a 120-day-old
/// incident edge to an ordinary node Y. A second ordinary node Z has its own
/// 120-day-old edge to Y. After light-sleep: X is boosted to critical
/// importance, X's edge weight is untouched, X's recency factor is 1.0
/// regardless of age, and Y–Z's edge (no anchor endpoint) has decayed by 0.95.
#[test]
fn anchor_protection_during_light_sleep() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("snapshots")).unwrap();
    let store = open_store(&dir);

    let mut anchor = Node::new("Reflecting on where things stand", "milestone");
    anchor.created_at = Utc::now() - Duration::days(200);
    let anchor_id = store.insert_node(&anchor).unwrap();

    let ordinary_y = Node::new("An ordinary note", "general");
    let y_id = store.insert_node(&ordinary_y).unwrap();

    let ordinary_z = Node::new("Another ordinary note", "general");
    let z_id = store.insert_node(&ordinary_z).unwrap();

    let mut anchor_edge = Edge::new(anchor_id, y_id, EdgeType::Semantic, 0.5);
    anchor_edge.last_touched_at = Utc::now() - Duration::days(120);
    store.insert_edge(&anchor_edge).unwrap();
    store.insert_edge(&anchor_edge.mirror()).unwrap();

    let mut stale_edge = Edge::new(y_id, z_id, EdgeType::Semantic, 0.5);
    stale_edge.last_touched_at = Utc::now() - Duration::days(120);
    store.insert_edge(&stale_edge).unwrap();
    store.insert_edge(&stale_edge.mirror()).unwrap();

    let mut graph = GraphCache::rebuild_from(store.all_edges().unwrap());
    let mut scheduler = SleepScheduler::new(Config::default(), dir.path().join("snapshots"));

    let report = scheduler.run_light_sleep(&store, &mut graph, false).unwrap();
    assert!(!report.rolled_back);

    let anchor_after = store.require_node(anchor_id).unwrap();
    assert_eq!(anchor_after.importance, Importance::Critical);

    let anchor_edge_after =
        store.edges_from(anchor_id).unwrap().into_iter().find(|e| e.target_id == y_id).unwrap();
    assert_eq!(anchor_edge_after.weight, 0.5);

    let stale_edge_after =
        store.edges_from(y_id).unwrap().into_iter().find(|e| e.target_id == z_id).unwrap();
    assert!((stale_edge_after.weight - 0.475).abs() < 1e-6);

    let recency = hippograph_core::search::recency_factor(
        anchor_after.created_at,
        Utc::now(),
        &anchor_after.category,
        &Config::default().temporal,
    );
    assert_eq!(recency, 1.0);
}

/// Once nothing is stale and every anchor is already boosted, a second
/// light-sleep run in immediate succession makes no further changes —
/// `boost_anchors` and `stale_edge_decay` both report zero changes.
#[test]
fn repeated_light_sleep_is_stable_once_nothing_is_stale() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("snapshots")).unwrap();
    let store = open_store(&dir);

    let anchor = Node::new("A milestone worth keeping", "milestone");
    let anchor_id = store.insert_node(&anchor).unwrap();

    let other = Node::new("A fresh everyday note", "general");
    let other_id = store.insert_node(&other).unwrap();

    let edge = Edge::new(anchor_id, other_id, EdgeType::Semantic, 0.6);
    store.insert_edge(&edge).unwrap();
    store.insert_edge(&edge.mirror()).unwrap();

    let mut graph = GraphCache::rebuild_from(store.all_edges().unwrap());
    let mut scheduler = SleepScheduler::new(Config::default(), dir.path().join("snapshots"));

    let first = scheduler.run_light_sleep(&store, &mut graph, false).unwrap();
    let boosted_after_first = store.require_node(anchor_id).unwrap().importance;
    assert_eq!(boosted_after_first, Importance::Critical);

    let second = scheduler.run_light_sleep(&store, &mut graph, false).unwrap();

    let boost_changes = |report: &hippograph_core::SleepReport| {
        report.steps.iter().find(|s| s.name == "boost_anchors").unwrap().changes
    };
    let decay_changes = |report: &hippograph_core::SleepReport| {
        report.steps.iter().find(|s| s.name == "stale_edge_decay").unwrap().changes
    };

    assert_eq!(boost_changes(&first), 1);
    assert_eq!(boost_changes(&second), 0);
    assert_eq!(decay_changes(&second), 0);

    let edge_after = store.edges_from(anchor_id).unwrap().into_iter().find(|e| e.target_id == other_id).unwrap();
    assert_eq!(edge_after.weight, 0.6);
}
