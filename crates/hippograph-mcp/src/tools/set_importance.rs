//! §6 Ingest API: `set_importance`.

use std::str::FromStr;
use std::sync::Arc;

use hippograph_core::{Engine, Importance};
use serde_json::{json, Value};

use super::{require_i64, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "description": "Node id"},
            "importance": {"type": "string", "enum": ["low", "normal", "critical"]}
        },
        "required": ["id", "importance"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let id = require_i64(args, "id")?;
    let level = Importance::from_str(require_str(args, "importance")?).map_err(|e| e)?;
    engine.set_importance(id, level).map_err(|e| e.to_string())?;
    Ok(json!({ "id": id, "importance": level.as_str() }))
}
