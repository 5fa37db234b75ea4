//! Runtime configuration (§6 "Configuration").
//!
//! A single [`Config`] aggregates every recognized option, loadable from a
//! TOML file (`serde` + the `toml` crate) and overridable by
//! `HIPPOGRAPH_*`-prefixed environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
    pub delta: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta: 0.10,
            gamma: 0.15,
            delta: 0.15,
        }
    }
}

impl BlendWeights {
    /// δ is auto-enabled only when the query carries a temporal signal;
    /// otherwise it is redistributed into α (§4.6 step 7).
    pub fn effective(&self, has_temporal_signal: bool) -> BlendWeights {
        if has_temporal_signal {
            self.clone()
        } else {
            BlendWeights {
                alpha: self.alpha + self.delta,
                beta: self.beta,
                gamma: self.gamma,
                delta: 0.0,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadConfig {
    pub iterations: u32,
    pub decay: f32,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            decay: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub half_life_days: f64,
    pub anchor_categories: HashSet<String>,
    /// Per-category decay-exponent multipliers (§4.5); categories not
    /// present default to `1.0`.
    pub category_multipliers: std::collections::HashMap<String, f64>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            half_life_days: 30.0,
            anchor_categories: [
                "self-reflection".to_string(),
                "milestone".to_string(),
                "security".to_string(),
                "relational-context".to_string(),
            ]
            .into_iter()
            .collect(),
            category_multipliers: std::collections::HashMap::new(),
        }
    }
}

impl TemporalConfig {
    pub fn is_anchor(&self, category: &str) -> bool {
        self.anchor_categories.contains(category)
    }

    pub fn category_multiplier(&self, category: &str) -> f64 {
        self.category_multipliers
            .get(category)
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub block_threshold: f32,
    pub warn_threshold: f32,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            block_threshold: 0.95,
            warn_threshold: 0.90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    pub weight: f32,
    pub top_n: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.3,
            top_n: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub threshold: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { threshold: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub light_every_new_nodes: u64,
    pub deep_interval_hours: u64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            light_every_new_nodes: 50,
            deep_interval_hours: 24,
        }
    }
}

/// Per-phase soft timeouts (§5 "Timeouts"). Exceeding a phase's timeout
/// degrades gracefully when that signal is optional (rerank, temporal);
/// exceeding `total_ms` fails the search with `RetrieverError::Timeout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embed_ms: u64,
    pub ann_ms: u64,
    pub bm25_ms: u64,
    pub rerank_ms: u64,
    pub total_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embed_ms: 500,
            ann_ms: 100,
            bm25_ms: 100,
            rerank_ms: 300,
            total_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// §9 Open Question: whether `update_node` re-runs entity extraction.
    /// Resolved as configurable, default off (conservative).
    pub relink_on_update: bool,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            relink_on_update: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub blend: BlendWeights,
    pub spread: SpreadConfig,
    pub bm25: Bm25Config,
    pub temporal: TemporalConfig,
    pub dup: DuplicateConfig,
    pub rerank: RerankConfig,
    pub hub: HubConfig,
    pub sleep: SleepConfig,
    pub entities: EntityConfig,
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blend: BlendWeights::default(),
            spread: SpreadConfig::default(),
            bm25: Bm25Config::default(),
            temporal: TemporalConfig::default(),
            dup: DuplicateConfig::default(),
            rerank: RerankConfig::default(),
            hub: HubConfig::default(),
            sleep: SleepConfig::default(),
            entities: EntityConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Apply `HIPPOGRAPH_*` environment overrides on top of a base config.
    /// Only the handful of values an operator is likely to tune at runtime
    /// are covered; everything else stays file/default-driven.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("HIPPOGRAPH_SLEEP_DEEP_INTERVAL_HOURS") {
            if let Ok(hours) = v.parse() {
                self.sleep.deep_interval_hours = hours;
            }
        }
        if let Ok(v) = std::env::var("HIPPOGRAPH_RERANK_ENABLED") {
            self.rerank.enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blend_weights_sum_close_to_one() {
        let b = BlendWeights::default();
        let sum = b.alpha + b.beta + b.gamma + b.delta;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn delta_redistributes_into_alpha_without_temporal_signal() {
        let b = BlendWeights::default();
        let effective = b.effective(false);
        assert_eq!(effective.delta, 0.0);
        assert!((effective.alpha - (b.alpha + b.delta)).abs() < 1e-6);
        assert_eq!(effective.beta, b.beta);
        assert_eq!(effective.gamma, b.gamma);
    }

    #[test]
    fn delta_stays_when_temporal_signal_present() {
        let b = BlendWeights::default();
        let effective = b.effective(true);
        assert_eq!(effective.delta, b.delta);
    }

    #[test]
    fn default_anchor_categories_match_glossary() {
        let t = TemporalConfig::default();
        assert!(t.is_anchor("milestone"));
        assert!(!t.is_anchor("grocery-list"));
    }

    #[test]
    fn default_timeouts_match_spec() {
        let t = TimeoutConfig::default();
        assert_eq!(t.embed_ms, 500);
        assert_eq!(t.ann_ms, 100);
        assert_eq!(t.bm25_ms, 100);
        assert_eq!(t.rerank_ms, 300);
        assert_eq!(t.total_ms, 2000);
    }

    #[test]
    fn parses_from_toml() {
        let toml = r#"
            [blend]
            alpha = 0.5
            beta = 0.2
            gamma = 0.2
            delta = 0.1
        "#;
        let cfg = Config::from_toml_str(toml).unwrap();
        assert_eq!(cfg.blend.alpha, 0.5);
        // Unset sections fall back to defaults.
        assert_eq!(cfg.bm25.k1, 1.5);
    }
}
