//! SQLite-backed store (§4.1).
//!
//! Follows the reference crate's split-connection discipline: one writer
//! connection behind a `Mutex` for serialized mutation, one reader
//! connection behind its own `Mutex` for concurrent reads that never block
//! on an in-flight write. Both connections point at the same file and share
//! WAL mode, so readers observe committed writes without contending on the
//! writer lock.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::model::{Edge, EdgeType, Entity, EntityId, EntityType, Importance, Node, NodeFilter, NodeId, NodeVersion, SearchLogEntry, MAX_NODE_VERSIONS};

/// Aggregate counters surfaced by the maintenance and diagnostics layer.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStats {
    pub node_count: i64,
    pub edge_count: i64,
    pub entity_count: i64,
    pub nodes_with_embeddings: i64,
}

pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Store {
    fn configure_connection(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    pub fn default_db_path() -> StoreResult<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "hippograph", "core").ok_or_else(|| {
            StoreError::IntegrityViolation("could not determine project directories".into())
        })?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(data_dir, std::fs::Permissions::from_mode(0o700));
        }
        Ok(data_dir.join("hippograph.db"))
    }

    pub fn open(db_path: Option<PathBuf>) -> StoreResult<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let writer_conn = Connection::open(&path)?;
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let writer_conn = Connection::open_in_memory()?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;
        // A shared in-memory database needs a URI connection so the reader
        // sees the writer's tables; tests instead use a single connection
        // pair backed by a temp file (see `tests/` helpers), so a second
        // in-memory handle here is only ever used standalone.
        let reader_conn = Connection::open_in_memory()?;
        Self::configure_connection(&reader_conn)?;
        super::migrations::apply_migrations(&reader_conn)?;
        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    fn writer(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::IntegrityViolation("writer lock poisoned".into()))
    }

    fn reader(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StoreError::IntegrityViolation("reader lock poisoned".into()))
    }

    // ---- nodes ---------------------------------------------------------

    pub fn insert_node(&self, node: &Node) -> StoreResult<NodeId> {
        let writer = self.writer()?;
        Self::insert_node_conn(&writer, node)
    }

    fn insert_node_conn(conn: &Connection, node: &Node) -> StoreResult<NodeId> {
        conn.execute(
            "INSERT INTO nodes (
                content, category, importance, created_at, last_accessed_at,
                t_event_start, t_event_end, access_count,
                emotional_tone, emotional_intensity, emotional_reflection,
                pagerank, community_id, has_embedding
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                node.content,
                node.category,
                node.importance.as_str(),
                node.created_at.to_rfc3339(),
                node.last_accessed_at.to_rfc3339(),
                node.t_event_start.map(|d| d.to_rfc3339()),
                node.t_event_end.map(|d| d.to_rfc3339()),
                node.access_count,
                node.emotional_tone,
                node.emotional_intensity,
                node.emotional_reflection,
                node.pagerank,
                node.community_id,
                node.has_embedding as i32,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a node and its embedding as a single atomic transaction, so a
    /// later ANN-index failure can compensate with one `delete_node` call
    /// instead of leaving a persisted node with no index entry (§4.1, §4.2).
    pub fn insert_node_with_embedding(&self, node: &Node, vector: &[f32]) -> StoreResult<NodeId> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        let id = Self::insert_node_conn(&tx, node)?;
        Self::set_embedding_conn(&tx, id, vector)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> StoreResult<Option<Node>> {
        let reader = self.reader()?;
        reader
            .query_row("SELECT * FROM nodes WHERE id = ?1", params![id], Self::row_to_node)
            .optional()
            .map_err(StoreError::from)
    }

    pub fn require_node(&self, id: NodeId) -> StoreResult<Node> {
        self.get_node(id)?.ok_or(StoreError::NotFound(id))
    }

    fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Node> {
        let importance_str: String = row.get("importance")?;
        let importance: Importance = importance_str.parse().unwrap_or_default();

        let parse_dt = |s: String| -> rusqlite::Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
        };
        let parse_opt_dt = |s: Option<String>| -> rusqlite::Result<Option<DateTime<Utc>>> {
            s.map(parse_dt).transpose()
        };

        Ok(Node {
            id: row.get("id")?,
            content: row.get("content")?,
            category: row.get("category")?,
            importance,
            created_at: parse_dt(row.get("created_at")?)?,
            last_accessed_at: parse_dt(row.get("last_accessed_at")?)?,
            t_event_start: parse_opt_dt(row.get("t_event_start")?)?,
            t_event_end: parse_opt_dt(row.get("t_event_end")?)?,
            access_count: row.get("access_count")?,
            emotional_tone: row.get("emotional_tone")?,
            emotional_intensity: row.get("emotional_intensity")?,
            emotional_reflection: row.get("emotional_reflection")?,
            pagerank: row.get("pagerank")?,
            community_id: row.get("community_id")?,
            has_embedding: row.get::<_, i32>("has_embedding")? != 0,
        })
    }

    /// Update a node's content, pushing the previous content into
    /// `node_versions` and evicting the oldest version past
    /// [`MAX_NODE_VERSIONS`] (§3 invariant 6).
    pub fn update_node_content(&self, id: NodeId, new_content: &str) -> StoreResult<()> {
        let existing = self.require_node(id)?;
        let now = Utc::now();
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let next_version: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM node_versions WHERE node_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO node_versions (node_id, version, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, next_version, existing.content, now.to_rfc3339()],
        )?;
        tx.execute(
            "DELETE FROM node_versions WHERE node_id = ?1 AND version <= ?2",
            params![id, next_version - MAX_NODE_VERSIONS as i64],
        )?;
        tx.execute(
            "UPDATE nodes SET content = ?1 WHERE id = ?2",
            params![new_content, id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_node_versions(&self, id: NodeId) -> StoreResult<Vec<NodeVersion>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT node_id, version, content, created_at FROM node_versions
             WHERE node_id = ?1 ORDER BY version DESC",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            let created_at: String = row.get(3)?;
            Ok(NodeVersion {
                node_id: row.get(0)?,
                version: row.get(1)?,
                content: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(Utc::now()),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn touch_access(&self, id: NodeId) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE nodes SET last_accessed_at = ?1, access_count = access_count + 1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    pub fn set_pagerank(&self, id: NodeId, value: f32) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute("UPDATE nodes SET pagerank = ?1 WHERE id = ?2", params![value, id])?;
        Ok(())
    }

    /// Set a node's importance tier directly (§6 `set_importance`, §4.9
    /// step 2 anchor boost). Unlike [`Self::update_node_content`], this
    /// never snapshots a version — only content changes are versioned
    /// (§3 invariant 6 only names content snapshots).
    pub fn set_importance(&self, id: NodeId, importance: Importance) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE nodes SET importance = ?1 WHERE id = ?2",
            params![importance.as_str(), id],
        )?;
        Ok(())
    }

    /// Change a node's category in place (§6 `update`). Like
    /// [`Self::set_importance`], this never snapshots a version.
    pub fn set_category(&self, id: NodeId, category: &str) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute("UPDATE nodes SET category = ?1 WHERE id = ?2", params![category, id])?;
        Ok(())
    }

    pub fn set_community(&self, id: NodeId, community_id: Option<i64>) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE nodes SET community_id = ?1 WHERE id = ?2",
            params![community_id, id],
        )?;
        Ok(())
    }

    /// Replace the whole cluster-summary table with `summaries` (§4.9
    /// deep-sleep "cluster summary materialization"): one `(community_id,
    /// label_node_id)` pair per community, the label being the top-PageRank
    /// member. Communities are recomputed from scratch each deep-sleep, so
    /// the old table is cleared first; both happen in one transaction.
    pub fn replace_community_summaries(&self, summaries: &[(i64, NodeId)]) -> StoreResult<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        tx.execute("DELETE FROM community_summaries", [])?;
        for (community_id, label_node_id) in summaries {
            tx.execute(
                "INSERT INTO community_summaries (community_id, label_node_id, updated_at) VALUES (?1, ?2, ?3)",
                params![community_id, label_node_id, Utc::now().to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The label node for a single community, if one has been materialized.
    pub fn community_summary(&self, community_id: i64) -> StoreResult<Option<NodeId>> {
        let reader = self.reader()?;
        reader
            .query_row(
                "SELECT label_node_id FROM community_summaries WHERE community_id = ?1",
                params![community_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// All materialized cluster summaries as `(community_id, label_node_id)`.
    pub fn all_community_summaries(&self) -> StoreResult<Vec<(i64, NodeId)>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT community_id, label_node_id FROM community_summaries")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn delete_node(&self, id: NodeId) -> StoreResult<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn all_node_ids(&self) -> StoreResult<Vec<NodeId>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT id FROM nodes")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn filtered_node_ids(&self, filter: &NodeFilter) -> StoreResult<Vec<NodeId>> {
        // The filter's full semantics (including entity_type, which needs a
        // join) are applied in Rust via `NodeFilter::matches` once nodes are
        // fetched; this narrows the SQL scan on the indexed columns first.
        let reader = self.reader()?;
        let mut sql = String::from("SELECT id FROM nodes WHERE 1=1");
        if filter.category.is_some() {
            sql.push_str(" AND category = ?1");
        }
        let mut stmt = reader.prepare(&sql)?;
        let rows = if let Some(category) = &filter.category {
            stmt.query_map(params![category], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<NodeId>>>()?
        } else {
            stmt.query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<NodeId>>>()?
        };
        Ok(rows)
    }

    /// Node ids created at or after `since` (§4.9 deep-sleep "relation
    /// extraction on nodes added since last deep-sleep").
    pub fn nodes_created_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<NodeId>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT id FROM nodes WHERE created_at >= ?1")?;
        let rows = stmt.query_map(params![since.to_rfc3339()], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Number of entities linked to `node_id`, for the hub penalty (§4.6.1)
    /// without materializing every `Entity`.
    pub fn entity_count_for_node(&self, node_id: NodeId) -> StoreResult<usize> {
        let reader = self.reader()?;
        let count: i64 = reader.query_row(
            "SELECT COUNT(*) FROM entity_links WHERE node_id = ?1",
            params![node_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn node_count(&self) -> StoreResult<i64> {
        let reader = self.reader()?;
        reader
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .map_err(StoreError::from)
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let reader = self.reader()?;
        Ok(StoreStats {
            node_count: reader.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?,
            edge_count: reader.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?,
            entity_count: reader.query_row("SELECT COUNT(*) FROM entities", [], |r| r.get(0))?,
            nodes_with_embeddings: reader.query_row(
                "SELECT COUNT(*) FROM nodes WHERE has_embedding = 1",
                [],
                |r| r.get(0),
            )?,
        })
    }

    // ---- embeddings ------------------------------------------------------

    pub fn set_embedding(&self, id: NodeId, vector: &[f32]) -> StoreResult<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        Self::set_embedding_conn(&tx, id, vector)?;
        tx.commit()?;
        Ok(())
    }

    fn set_embedding_conn(conn: &Connection, id: NodeId, vector: &[f32]) -> StoreResult<()> {
        let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        conn.execute(
            "INSERT OR REPLACE INTO node_embeddings (node_id, embedding, dimensions, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, bytes, vector.len() as i64, Utc::now().to_rfc3339()],
        )?;
        conn.execute("UPDATE nodes SET has_embedding = 1 WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn get_embedding(&self, id: NodeId) -> StoreResult<Option<Vec<f32>>> {
        let reader = self.reader()?;
        let bytes: Option<Vec<u8>> = reader
            .query_row(
                "SELECT embedding FROM node_embeddings WHERE node_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| bytes_to_vector(&b)))
    }

    pub fn all_embeddings(&self) -> StoreResult<Vec<(NodeId, Vec<f32>)>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT node_id, embedding FROM node_embeddings")?;
        let rows = stmt.query_map([], |row| {
            let id: NodeId = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((id, bytes))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, bytes) = row?;
            out.push((id, bytes_to_vector(&bytes)));
        }
        Ok(out)
    }

    // ---- edges -----------------------------------------------------------

    /// Insert an edge, mirroring it per invariant 1 when `edge_type` requires
    /// it. Both sides are inserted under a single transaction so the pair
    /// never lands half-mirrored.
    pub fn insert_edge(&self, edge: &Edge) -> StoreResult<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        Self::insert_edge_one_sided_conn(&tx, edge)?;
        if edge.edge_type.requires_mirror() {
            Self::insert_edge_one_sided_conn(&tx, &edge.mirror())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_edge_one_sided_conn(conn: &Connection, edge: &Edge) -> StoreResult<()> {
        conn.execute(
            "INSERT INTO edges (source_id, target_id, edge_type, weight, created_at, last_touched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (source_id, target_id, edge_type) DO UPDATE SET
                weight = excluded.weight,
                last_touched_at = excluded.last_touched_at",
            params![
                edge.source_id,
                edge.target_id,
                edge.edge_type.to_db_string(),
                edge.weight,
                edge.created_at.to_rfc3339(),
                edge.last_touched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove an edge and its mirror (if any) under a single transaction.
    pub fn remove_edge(&self, source_id: NodeId, target_id: NodeId, edge_type: &EdgeType) -> StoreResult<bool> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        let rows = tx.execute(
            "DELETE FROM edges WHERE source_id = ?1 AND target_id = ?2 AND edge_type = ?3",
            params![source_id, target_id, edge_type.to_db_string()],
        )?;
        if edge_type.requires_mirror() {
            tx.execute(
                "DELETE FROM edges WHERE source_id = ?1 AND target_id = ?2 AND edge_type = ?3",
                params![target_id, source_id, edge_type.to_db_string()],
            )?;
        }
        tx.commit()?;
        Ok(rows > 0)
    }

    /// Multiply an edge's weight by `factor` without touching
    /// `last_touched_at` (§4.9 stale-edge decay: only the weight decays,
    /// else the staleness clock would reset and the edge could never decay
    /// twice in a row).
    pub fn decay_edge_weight(&self, source_id: NodeId, target_id: NodeId, edge_type: &EdgeType, factor: f32) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE edges SET weight = weight * ?1 WHERE source_id = ?2 AND target_id = ?3 AND edge_type = ?4",
            params![factor, source_id, target_id, edge_type.to_db_string()],
        )?;
        Ok(())
    }

    pub fn edges_from(&self, id: NodeId) -> StoreResult<Vec<Edge>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT * FROM edges WHERE source_id = ?1")?;
        let rows = stmt.query_map(params![id], Self::row_to_edge)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn edges_to(&self, id: NodeId) -> StoreResult<Vec<Edge>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT * FROM edges WHERE target_id = ?1")?;
        let rows = stmt.query_map(params![id], Self::row_to_edge)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn all_edges(&self) -> StoreResult<Vec<Edge>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT * FROM edges")?;
        let rows = stmt.query_map([], Self::row_to_edge)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
        let edge_type_str: String = row.get("edge_type")?;
        let created_at: String = row.get("created_at")?;
        let last_touched_at: String = row.get("last_touched_at")?;
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(Utc::now())
        };
        Ok(Edge {
            source_id: row.get("source_id")?,
            target_id: row.get("target_id")?,
            edge_type: EdgeType::from_db_string(&edge_type_str),
            weight: row.get("weight")?,
            created_at: parse(&created_at),
            last_touched_at: parse(&last_touched_at),
        })
    }

    // ---- entities ----------------------------------------------------------

    pub fn upsert_entity(&self, name: &str, entity_type: &EntityType) -> StoreResult<EntityId> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO entities (name, entity_type) VALUES (?1, ?2)
             ON CONFLICT (name, entity_type) DO NOTHING",
            params![name, entity_type.as_str()],
        )?;
        writer
            .query_row(
                "SELECT id FROM entities WHERE name = ?1 AND entity_type = ?2",
                params![name, entity_type.as_str()],
                |row| row.get(0),
            )
            .map_err(StoreError::from)
    }

    /// Look up an entity's id by its canonical name, regardless of type —
    /// used by the deep-sleep relation pass (§4.9) to resolve a surface
    /// form back to whichever nodes already link it.
    pub fn find_entity_by_name(&self, name: &str) -> StoreResult<Option<EntityId>> {
        let reader = self.reader()?;
        reader
            .query_row("SELECT id FROM entities WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)
    }

    pub fn link_entity(&self, node_id: NodeId, entity_id: EntityId) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT OR IGNORE INTO entity_links (node_id, entity_id) VALUES (?1, ?2)",
            params![node_id, entity_id],
        )?;
        Ok(())
    }

    pub fn unlink_all_entities(&self, node_id: NodeId) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute("DELETE FROM entity_links WHERE node_id = ?1", params![node_id])?;
        Ok(())
    }

    pub fn entities_for_node(&self, node_id: NodeId) -> StoreResult<Vec<Entity>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT e.id, e.name, e.entity_type FROM entities e
             JOIN entity_links l ON e.id = l.entity_id
             WHERE l.node_id = ?1",
        )?;
        let rows = stmt.query_map(params![node_id], Self::row_to_entity)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn nodes_for_entity(&self, entity_id: EntityId) -> StoreResult<Vec<NodeId>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT node_id FROM entity_links WHERE entity_id = ?1")?;
        let rows = stmt.query_map(params![entity_id], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
        let entity_type_str: String = row.get("entity_type")?;
        Ok(Entity {
            id: row.get("id")?,
            name: row.get("name")?,
            entity_type: EntityType::parse(&entity_type_str),
        })
    }

    // ---- keyword search (BM25 via FTS5, §4.4) -----------------------------

    /// Returns `(node_id, bm25_rank)` ordered best-first. `rank` is SQLite's
    /// raw FTS5 bm25() score (lower is better); callers normalize per §4.4.
    pub fn keyword_search(&self, sanitized_query: &str, limit: usize) -> StoreResult<Vec<(NodeId, f64)>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT nodes_fts.rowid, bm25(nodes_fts) FROM nodes_fts
             WHERE nodes_fts MATCH ?1
             ORDER BY bm25(nodes_fts)
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![sanitized_query, limit as i64], |row| {
            Ok((row.get::<_, NodeId>(0)?, row.get::<_, f64>(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // ---- search log (§4.10) ------------------------------------------------

    pub fn log_search(&self, entry: &SearchLogEntry) -> StoreResult<()> {
        let result_ids = serde_json::to_string(&entry.result_ids).unwrap_or_else(|_| "[]".into());
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO search_log (
                query_hash, timestamp, embedding_ms, ann_ms, spreading_ms, bm25_ms,
                temporal_ms, rerank_ms, total_ms, result_ids, zero_result, degraded
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                entry.query_hash as i64,
                entry.timestamp.to_rfc3339(),
                entry.durations.embedding_ms,
                entry.durations.ann_ms,
                entry.durations.spreading_ms,
                entry.durations.bm25_ms,
                entry.durations.temporal_ms,
                entry.durations.rerank_ms,
                entry.durations.total_ms,
                result_ids,
                entry.zero_result as i32,
                entry.degraded as i32,
            ],
        )?;
        Ok(())
    }

    /// The `total_ms` of the most recent `limit` searches, newest first —
    /// used by the logger's p50/p95/p99 aggregation (§4.10).
    pub fn recent_search_durations(&self, limit: usize) -> StoreResult<Vec<f64>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT total_ms FROM search_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // ---- sleep run tracking (§4.9) -----------------------------------------

    pub fn start_sleep_run(&self, kind: &str) -> StoreResult<i64> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO sleep_runs (kind, started_at) VALUES (?1, ?2)",
            params![kind, Utc::now().to_rfc3339()],
        )?;
        Ok(writer.last_insert_rowid())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finish_sleep_run(
        &self,
        run_id: i64,
        duration_ms: i64,
        nodes_considered: i64,
        edges_pruned: i64,
        edges_strengthened: i64,
        communities_found: i64,
        rolled_back: bool,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE sleep_runs SET
                finished_at = ?1, duration_ms = ?2, nodes_considered = ?3,
                edges_pruned = ?4, edges_strengthened = ?5, communities_found = ?6,
                rolled_back = ?7, error = ?8
             WHERE id = ?9",
            params![
                Utc::now().to_rfc3339(),
                duration_ms,
                nodes_considered,
                edges_pruned,
                edges_strengthened,
                communities_found,
                rolled_back as i32,
                error,
                run_id,
            ],
        )?;
        Ok(())
    }

    // ---- snapshot / restore (§4.9 "snapshot before mutating") --------------

    /// Back up the live database to `dest` via SQLite's online backup API.
    /// Used before each light/deep sleep run so a failed run can be rolled
    /// back by restoring this file.
    pub fn snapshot_to(&self, dest: &Path) -> StoreResult<()> {
        let writer = self.writer()?;
        let mut dest_conn = Connection::open(dest)?;
        let backup = rusqlite::backup::Backup::new(&writer, &mut dest_conn)?;
        backup.run_to_completion(5, std::time::Duration::from_millis(250), None)?;
        Ok(())
    }

    pub fn restore_from(&self, source: &Path) -> StoreResult<()> {
        let mut writer = self.writer()?;
        let source_conn = Connection::open(source)?;
        let backup = rusqlite::backup::Backup::new(&source_conn, &mut writer)?;
        backup.run_to_completion(5, std::time::Duration::from_millis(250), None)?;
        Ok(())
    }
}

fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Load `Config` from the OS config directory, falling back to defaults
/// when no file is present (§6 "Configuration").
pub fn load_config() -> Config {
    let Some(proj_dirs) = ProjectDirs::from("dev", "hippograph", "core") else {
        return Config::default().apply_env_overrides();
    };
    let path = proj_dirs.config_dir().join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => match Config::from_toml_str(&contents) {
            Ok(cfg) => cfg.apply_env_overrides(),
            Err(e) => {
                tracing::warn!(error = %e, path = ?path, "failed to parse config.toml, using defaults");
                Config::default().apply_env_overrides()
            }
        },
        Err(_) => Config::default().apply_env_overrides(),
    }
}
