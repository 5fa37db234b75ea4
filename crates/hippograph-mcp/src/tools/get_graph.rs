//! §6 Query API: `get_graph`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::require_i64;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "description": "Node id to list outgoing edges for"}
        },
        "required": ["id"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let id = require_i64(args, "id")?;
    let edges = engine.get_graph(id).map_err(|e| e.to_string())?;
    let edges: Vec<Value> = edges
        .into_iter()
        .map(|(target_id, weight, edge_type)| json!({
            "targetId": target_id,
            "weight": weight,
            "edgeType": edge_type,
        }))
        .collect();
    Ok(json!({ "id": id, "edges": edges }))
}
