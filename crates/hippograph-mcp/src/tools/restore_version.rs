//! §6 Ingest API: `restore_version`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::require_i64;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "description": "Node id"},
            "version": {"type": "integer", "description": "Version number to restore"}
        },
        "required": ["id", "version"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let id = require_i64(args, "id")?;
    let version = require_i64(args, "version")?;
    engine.restore_version(id, version).map_err(|e| e.to_string())?;
    Ok(json!({ "id": id, "restoredVersion": version }))
}
