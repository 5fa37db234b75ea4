//! Test engine fixture.
//!
//! Builds a real [`Engine`] over a temp-directory SQLite store with the
//! deterministic test doubles from [`crate::mocks::fixtures`] standing in
//! for the embedding/extraction/date-resolution/reranking services, so
//! integration tests exercise the genuine ingest and search pipelines
//! rather than a simulation of them. Every test gets its own temp
//! directory; it is cleaned up when the returned `TempDir` drops.

use std::path::PathBuf;

use hippograph_core::{
    AddInput, Config, Engine, GraphCache, NullRelationExtractor, NullReranker, SleepMode,
    SleepReport, Store, VectorIndex,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::mocks::fixtures::{FixedDateResolver, HashEmbedder, KeywordExtractor};

/// Owns an [`Engine`] plus the temp directory backing its store and
/// snapshot path, so a test only needs to call [`TestEngine::new`] once.
pub struct TestEngine {
    pub engine: Engine,
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl TestEngine {
    /// Build an engine with the hashing embedder, keyword-table extractor,
    /// and fixed date resolver wired in — the defaults most tests want.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let store = Store::open(Some(db_path.clone())).expect("open test store");
        let vector_index = VectorIndex::new().expect("build vector index");
        let graph = GraphCache::new();

        let engine = Engine::new(
            store,
            vector_index,
            graph,
            Box::new(HashEmbedder::new()),
            Box::new(NullReranker),
            Box::new(KeywordExtractor::new()),
            Box::new(FixedDateResolver),
            Box::new(NullRelationExtractor),
            config,
            temp_dir.path().join("snapshots"),
        );

        Self { engine, _temp_dir: temp_dir, db_path }
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Add `count` distinct notes sharing `topic`, returning their ids in
    /// insertion order.
    pub fn seed_topic(&self, topic: &str, count: usize) -> Vec<i64> {
        (0..count)
            .map(|i| {
                self.engine
                    .add(AddInput { content: crate::mocks::fixtures::topic_note(topic, i), ..Default::default() })
                    .expect("seed add")
                    .id
            })
            .collect()
    }

    pub fn node_count(&self) -> i64 {
        self.engine.stats().expect("stats").nodes
    }

    pub fn search_cancel() -> CancellationToken {
        CancellationToken::new()
    }

    pub fn run_light_sleep(&self) -> SleepReport {
        self.engine.run_sleep(SleepMode::Light, false).expect("light sleep")
    }

    pub fn run_deep_sleep(&self) -> SleepReport {
        self.engine.run_sleep(SleepMode::Deep, false).expect("deep sleep")
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_engine_is_empty() {
        let harness = TestEngine::new();
        assert_eq!(harness.node_count(), 0);
    }

    #[test]
    fn seed_topic_inserts_requested_count() {
        let harness = TestEngine::new();
        let ids = harness.seed_topic("gardening", 5);
        assert_eq!(ids.len(), 5);
        assert_eq!(harness.node_count(), 5);
    }
}
