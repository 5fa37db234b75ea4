//! Test doubles and content generators.
//!
//! None of the real external collaborators (`fastembed`, a cross-encoder
//! model, an NLP entity extractor, a date-resolution service) run inside a
//! test process, so this module supplies deterministic stand-ins that
//! satisfy the same narrow trait contracts `hippograph-core` defines for
//! them, the same way production wires up the `Null*` variants when a
//! service is unavailable — except these actually produce signal instead
//! of degrading, so the scoring pipeline has something real to blend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hippograph_core::{
    Embedder, EmbeddingError, EntityExtractor, EventRange, ExtractedEntity, ExtractedRelation,
};

/// A bag-of-words hashing embedder: every distinct lowercase word in the
/// input contributes to one fixed bucket of a 256-dimensional vector, which
/// is then L2-normalized. Deterministic and cheap, and similar content
/// collides into similar vectors — exactly the property duplicate
/// detection and semantic-edge tests need, without an ONNX runtime.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { dimensions: hippograph_core::VectorIndexConfig::default().dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".into()));
        }
        let mut vector = vec![0.0_f32; self.dimensions];
        for word in text.to_lowercase().split_whitespace() {
            let bucket = hash_word(word) % self.dimensions;
            vector[bucket] += 1.0;
        }
        hippograph_core::l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn hash_word(word: &str) -> usize {
    // FNV-1a: small, dependency-free, stable across runs.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash as usize
}

/// A keyword-table entity extractor: recognizes a fixed vocabulary of
/// proper nouns so entity-linking tests don't depend on a real NER model.
/// Unknown text simply yields no entities, matching `NullExtractor`'s
/// contract for anything outside the table.
pub struct KeywordExtractor {
    vocabulary: HashMap<&'static str, &'static str>,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        let vocabulary = [
            ("acme", "organization"),
            ("acme corp", "organization"),
            ("sarah", "person"),
            ("priya", "person"),
            ("tokyo", "place"),
            ("denver", "place"),
        ]
        .into_iter()
        .collect();
        Self { vocabulary }
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for KeywordExtractor {
    fn extract(&self, text: &str) -> Vec<ExtractedEntity> {
        let lower = text.to_lowercase();
        self.vocabulary
            .iter()
            .filter(|(surface, _)| lower.contains(*surface))
            .map(|(surface, entity_type)| ExtractedEntity {
                surface: surface.to_string(),
                entity_type: entity_type.to_string(),
                confidence: 0.9,
            })
            .collect()
    }
}

/// Always reports one fixed relation; enough to exercise the deep-sleep
/// relation-extraction pass without a real extraction service.
pub struct FixedRelationExtractor;

impl hippograph_core::RelationExtractor for FixedRelationExtractor {
    fn extract(&self, text: &str) -> Vec<ExtractedRelation> {
        if text.to_lowercase().contains("acme") {
            vec![ExtractedRelation {
                subject: "sarah".to_string(),
                relation: "works_with".to_string(),
                object: "acme".to_string(),
            }]
        } else {
            Vec::new()
        }
    }
}

/// Resolves event ranges from either an explicit `YYYY-MM-DD` fragment in
/// the text or a small table of relative phrases, enough to exercise
/// temporal scoring without a real date-parsing service.
pub struct FixedDateResolver;

impl hippograph_core::DateResolver for FixedDateResolver {
    fn resolve(&self, text: &str, base_time: DateTime<Utc>) -> Option<EventRange> {
        if let Some(date) = extract_iso_date(text) {
            return Some(EventRange { start: date, end: None });
        }
        let lower = text.to_lowercase();
        if lower.contains("last week") {
            Some(EventRange { start: base_time - chrono::Duration::days(7), end: None })
        } else if lower.contains("last month") {
            Some(EventRange { start: base_time - chrono::Duration::days(30), end: None })
        } else {
            None
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn extract_iso_date(text: &str) -> Option<DateTime<Utc>> {
    text.split(|c: char| c.is_whitespace()).find_map(|word| {
        let candidate: String = word.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
        chrono::NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}

/// Produces numbered note content sharing a common topic word, so repeated
/// calls generate content that is similar but not identical — useful for
/// tests that need several related-but-distinct notes.
pub fn topic_note(topic: &str, index: usize) -> String {
    format!("Note {index} about {topic}: detail variant {index} for the {topic} thread.")
}
