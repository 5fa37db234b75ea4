//! §6 Ingest API: `get_history`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::require_i64;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "description": "Node id"}
        },
        "required": ["id"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let id = require_i64(args, "id")?;
    let versions = engine.get_history(id).map_err(|e| e.to_string())?;
    let versions: Vec<Value> = versions
        .into_iter()
        .map(|v| json!({
            "version": v.version,
            "content": v.content,
            "createdAt": v.created_at,
        }))
        .collect();
    Ok(json!({ "id": id, "versions": versions }))
}
