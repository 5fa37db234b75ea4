//! §6 Query/Maintenance API: `stats` and `search_stats`.

use std::sync::Arc;

use hippograph_core::Engine;
use serde_json::{json, Value};

use super::optional_usize;

pub fn stats_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

pub async fn execute_stats(engine: &Arc<Engine>) -> Result<Value, String> {
    let summary = engine.stats().map_err(|e| e.to_string())?;
    serde_json::to_value(summary).map_err(|e| e.to_string())
}

pub fn search_stats_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "window": {"type": "integer", "default": 100, "description": "Number of recent searches to sample"}
        }
    })
}

pub async fn execute_search_stats(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let window = optional_usize(args, "window", 100);
    let percentiles = engine.search_latency_percentiles(window).map_err(|e| e.to_string())?;
    serde_json::to_value(percentiles).map_err(|e| e.to_string())
}
