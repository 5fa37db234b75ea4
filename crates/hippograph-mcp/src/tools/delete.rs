//! §6 Ingest API: `delete`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::require_i64;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "description": "Node id to delete"}
        },
        "required": ["id"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let id = require_i64(args, "id")?;
    engine.delete(id).map_err(|e| e.to_string())?;
    Ok(json!({ "id": id, "deleted": true }))
}
