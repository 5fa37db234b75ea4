//! Database schema migrations.
//!
//! One migration per schema generation, applied in order via
//! `execute_batch`, tracked in `schema_version` — same shape as the
//! reference crate's migration runner, new schema.

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: nodes, edges, entities, versions, search log",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Community cluster summaries (top PageRank node per community)",
        up: MIGRATION_V2_UP,
    },
];

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'general',
    importance TEXT NOT NULL DEFAULT 'normal',
    created_at TEXT NOT NULL,
    last_accessed_at TEXT NOT NULL,
    t_event_start TEXT,
    t_event_end TEXT,
    access_count INTEGER NOT NULL DEFAULT 0,
    emotional_tone REAL,
    emotional_intensity REAL,
    emotional_reflection TEXT,
    pagerank REAL NOT NULL DEFAULT 0.0,
    community_id INTEGER,
    has_embedding INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_nodes_category ON nodes(category);
CREATE INDEX IF NOT EXISTS idx_nodes_created_at ON nodes(created_at);
CREATE INDEX IF NOT EXISTS idx_nodes_community ON nodes(community_id);

CREATE TABLE IF NOT EXISTS node_embeddings (
    node_id INTEGER PRIMARY KEY REFERENCES nodes(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS node_versions (
    node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    version INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (node_id, version)
);

CREATE TABLE IF NOT EXISTS edges (
    source_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    edge_type TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL,
    last_touched_at TEXT NOT NULL,
    PRIMARY KEY (source_id, target_id, edge_type)
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(edge_type);

CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    UNIQUE (name, entity_type)
);

CREATE TABLE IF NOT EXISTS entity_links (
    node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    PRIMARY KEY (node_id, entity_id)
);

CREATE INDEX IF NOT EXISTS idx_entity_links_entity ON entity_links(entity_id);

CREATE VIRTUAL TABLE IF NOT EXISTS nodes_fts USING fts5(
    content,
    content='nodes',
    content_rowid='id',
    tokenize='porter ascii'
);

CREATE TRIGGER IF NOT EXISTS nodes_ai AFTER INSERT ON nodes BEGIN
    INSERT INTO nodes_fts(rowid, content) VALUES (NEW.id, NEW.content);
END;

CREATE TRIGGER IF NOT EXISTS nodes_ad AFTER DELETE ON nodes BEGIN
    INSERT INTO nodes_fts(nodes_fts, rowid, content) VALUES ('delete', OLD.id, OLD.content);
END;

CREATE TRIGGER IF NOT EXISTS nodes_au AFTER UPDATE ON nodes BEGIN
    INSERT INTO nodes_fts(nodes_fts, rowid, content) VALUES ('delete', OLD.id, OLD.content);
    INSERT INTO nodes_fts(rowid, content) VALUES (NEW.id, NEW.content);
END;

CREATE TABLE IF NOT EXISTS search_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query_hash INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    embedding_ms REAL NOT NULL DEFAULT 0,
    ann_ms REAL NOT NULL DEFAULT 0,
    spreading_ms REAL NOT NULL DEFAULT 0,
    bm25_ms REAL NOT NULL DEFAULT 0,
    temporal_ms REAL NOT NULL DEFAULT 0,
    rerank_ms REAL NOT NULL DEFAULT 0,
    total_ms REAL NOT NULL DEFAULT 0,
    result_ids TEXT NOT NULL DEFAULT '[]',
    zero_result INTEGER NOT NULL DEFAULT 0,
    degraded INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_search_log_timestamp ON search_log(timestamp);

CREATE TABLE IF NOT EXISTS sleep_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    duration_ms INTEGER,
    nodes_considered INTEGER NOT NULL DEFAULT 0,
    edges_pruned INTEGER NOT NULL DEFAULT 0,
    edges_strengthened INTEGER NOT NULL DEFAULT 0,
    communities_found INTEGER NOT NULL DEFAULT 0,
    rolled_back INTEGER NOT NULL DEFAULT 0,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_sleep_runs_started ON sleep_runs(started_at);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS community_summaries (
    community_id INTEGER PRIMARY KEY,
    label_node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    updated_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
