//! §6 Ingest API: `find_similar`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::{optional_f64, optional_usize, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {"type": "string", "description": "Text to find near-duplicates for"},
            "limit": {"type": "integer", "default": 5},
            "threshold": {"type": "number", "default": 0.0, "description": "Minimum cosine similarity to include"}
        },
        "required": ["content"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let content = require_str(args, "content")?;
    let limit = optional_usize(args, "limit", 5);
    let threshold = optional_f64(args, "threshold").unwrap_or(0.0) as f32;

    let hits = engine.find_similar(content, limit, threshold).map_err(|e| e.to_string())?;
    let results: Vec<Value> = hits
        .into_iter()
        .map(|h| json!({ "id": h.id, "similarity": h.similarity }))
        .collect();
    Ok(json!({ "results": results }))
}
