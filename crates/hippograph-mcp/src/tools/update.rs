//! §6 Ingest API: `update`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::{optional_str, require_i64};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "description": "Node id to update"},
            "content": {"type": "string", "description": "New content; omit to leave unchanged"},
            "category": {"type": "string", "description": "New category; omit to leave unchanged"}
        },
        "required": ["id"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let id = require_i64(args, "id")?;
    let content = optional_str(args, "content");
    let category = optional_str(args, "category");

    let version = engine.update(id, content, category).map_err(|e| e.to_string())?;
    Ok(json!({ "id": id, "version": version }))
}
