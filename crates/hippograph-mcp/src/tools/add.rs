//! §6 Ingest API: `add`.

use std::str::FromStr;
use std::sync::Arc;

use hippograph_core::{AddInput, Engine, Importance};
use serde_json::{json, Value};

use super::{optional_bool, optional_str, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {"type": "string", "description": "The note's text content"},
            "category": {"type": "string", "description": "Category label, e.g. 'fact', 'milestone', 'self-reflection'"},
            "importance": {"type": "string", "enum": ["low", "normal", "critical"]},
            "emotionalTone": {"type": "number", "description": "Valence in [-1, 1]"},
            "emotionalIntensity": {"type": "number", "description": "Intensity in [0, 1]"},
            "emotionalReflection": {"type": "string"},
            "force": {"type": "boolean", "description": "Add even if a near-duplicate is found"}
        },
        "required": ["content"]
    })
}

pub async fn execute(engine: &Arc<Engine>, args: &Value) -> Result<Value, String> {
    let content = require_str(args, "content")?.to_string();
    let importance = match optional_str(args, "importance") {
        Some(s) => Some(Importance::from_str(&s).map_err(|e| e.to_string())?),
        None => None,
    };

    let input = AddInput {
        content,
        category: optional_str(args, "category"),
        importance,
        emotional_tone: args.get("emotionalTone").and_then(Value::as_f64).map(|v| v as f32),
        emotional_intensity: args.get("emotionalIntensity").and_then(Value::as_f64).map(|v| v as f32),
        emotional_reflection: optional_str(args, "emotionalReflection"),
        force: optional_bool(args, "force", false),
    };

    let result = engine.add(input).map_err(|e| e.to_string())?;
    Ok(json!({
        "id": result.id,
        "duplicateWarning": result.duplicate_warning,
    }))
}
