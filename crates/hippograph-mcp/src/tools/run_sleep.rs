//! §6 Maintenance API: `run_sleep`.

use std::sync::Arc;

use hippograph_core::{Engine, SleepMode};
use serde_json::{json, Value};

use super::optional_bool;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "mode": {"type": "string", "enum": ["light", "deep"], "default": "light"},
            "dryRun": {"type": "boolean", "default": false, "description": "Report what would change without mutating anything"}
        }
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let mode = match args.get("mode").and_then(Value::as_str) {
        Some("deep") => SleepMode::Deep,
        _ => SleepMode::Light,
    };
    let dry_run = optional_bool(args, "dryRun", false);

    let report = engine.run_sleep(mode, dry_run).map_err(|e| e.to_string())?;
    serde_json::to_value(report).map_err(|e| e.to_string())
}
