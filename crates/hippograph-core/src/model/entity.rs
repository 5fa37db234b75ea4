use serde::{Deserialize, Serialize};

use super::EntityId;

/// Entity category (§3). Open-ended in spirit ("person, org, location,
/// tech, concept, …") so extractors can introduce new categories without a
/// schema change; `Other` carries the extractor's original label through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "label")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Technology,
    Concept,
    Other(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Person => "person",
            EntityType::Organization => "org",
            EntityType::Location => "location",
            EntityType::Technology => "tech",
            EntityType::Concept => "concept",
            EntityType::Other(label) => label,
        }
    }

    pub fn parse(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "person" => EntityType::Person,
            "org" | "organization" => EntityType::Organization,
            "location" | "place" => EntityType::Location,
            "tech" | "technology" => EntityType::Technology,
            "concept" => EntityType::Concept,
            other => EntityType::Other(other.to_string()),
        }
    }
}

/// A canonical concept extracted from note text (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub entity_type: EntityType,
}

/// Canonicalize a surface form per §4.7: lowercase, trim, collapse
/// whitespace. This is the identity function used before entity upsert so
/// that "Python", " python ", and "python  3" (after internal whitespace
/// collapse) compare equal.
pub fn canonicalize(surface: &str) -> String {
    surface
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
