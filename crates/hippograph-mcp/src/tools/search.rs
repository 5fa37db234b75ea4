//! §6 Query API: `search`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hippograph_core::{DetailMode, Engine, Filters, SearchRequest};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::{optional_str, optional_usize, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": "Natural language query"},
            "maxResults": {"type": "integer", "default": 10},
            "detailMode": {"type": "string", "enum": ["brief", "full"], "default": "brief"},
            "category": {"type": "string"},
            "timeAfter": {"type": "string", "format": "date-time"},
            "timeBefore": {"type": "string", "format": "date-time"},
            "entityType": {"type": "string"}
        },
        "required": ["query"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value, cancel: &CancellationToken) -> Result<Value, String> {
    let query = require_str(args, "query")?.to_string();
    let max_results = optional_usize(args, "maxResults", 10);
    let detail_mode = match optional_str(args, "detailMode").as_deref() {
        Some("full") => DetailMode::Full,
        _ => DetailMode::Brief,
    };

    let filters = Filters {
        category: optional_str(args, "category"),
        time_after: optional_str(args, "timeAfter").and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
        time_before: optional_str(args, "timeBefore").and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
        entity_type: optional_str(args, "entityType"),
    };

    let request = SearchRequest { query, filters, max_results, detail_mode, blend_override: None };
    let response = engine.search(request, cancel).map_err(|e| e.to_string())?;

    Ok(json!({
        "results": response.results,
        "stats": {
            "totalActivated": response.stats.total_activated,
            "estimatedTokens": response.stats.estimated_tokens,
            "hasMore": response.stats.has_more,
            "durationsMs": response.stats.durations_ms,
            "degradations": response.stats.degradations,
        },
    }))
}
