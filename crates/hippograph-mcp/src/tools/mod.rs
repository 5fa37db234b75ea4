//! One `schema()` / `execute()` pair per HippoGraph operation (§6).
//!
//! Each module mirrors one entry of the Ingest, Query, or Maintenance API.
//! `execute()` takes the shared [`hippograph_core::Engine`] and the raw
//! `arguments` value from the `tools/call` request, and returns either a
//! JSON result value or a human-readable error string for
//! [`crate::protocol::messages::CallToolResult::error`].

pub mod add;
pub mod delete;
pub mod find_similar;
pub mod get_graph;
pub mod get_history;
pub mod restore_version;
pub mod run_sleep;
pub mod search;
pub mod set_importance;
pub mod stats;
pub mod update;

use serde_json::Value;

/// Pulls a required string field out of a tool call's `arguments` object.
pub(crate) fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, String> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing required argument '{field}'"))
}

/// Pulls a required integer field (used for node ids).
pub(crate) fn require_i64(args: &Value, field: &str) -> Result<i64, String> {
    args.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("missing required argument '{field}'"))
}

pub(crate) fn optional_str(args: &Value, field: &str) -> Option<String> {
    args.get(field).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn optional_f64(args: &Value, field: &str) -> Option<f64> {
    args.get(field).and_then(Value::as_f64)
}

pub(crate) fn optional_bool(args: &Value, field: &str, default: bool) -> bool {
    args.get(field).and_then(Value::as_bool).unwrap_or(default)
}

pub(crate) fn optional_usize(args: &Value, field: &str, default: usize) -> usize {
    args.get(field).and_then(Value::as_u64).map(|v| v as usize).unwrap_or(default)
}
