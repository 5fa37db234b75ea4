//! Temporal scoring (§4.5).
//!
//! Resolves §9 Open Question (a): non-anchor nodes decay by
//! `recency_factor = 0.5 ^ ((now - created_at) / half_life_days * category_multiplier)`;
//! anchor-category nodes (§3 invariant: "anchor categories are exempt from
//! temporal decay") always score `1.0`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::TemporalConfig;
use crate::date_resolver::EventRange;
use crate::model::NodeId;

/// Ordering tie-break direction detected in a query (§4.5 `decompose_query`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    None,
    Earliest,
    Latest,
}

/// Phrases that mark a query as asking for the earliest matching note.
const EARLIEST_MARKERS: &[&str] = &["first", "started", "began", "earliest", "originally", "initially"];
/// Phrases that mark a query as asking for the most recent matching note.
const LATEST_MARKERS: &[&str] = &["last", "latest", "finished", "most recent", "newest", "ended"];
/// Leading interrogatives stripped alongside a detected temporal marker.
/// Bare words like "what"/"when" aren't temporal signals on their own —
/// `has_temporal_signal` never checks this list — but once some other
/// marker has already flagged the query as temporal, they carry no
/// embedding/BM25 value either, same as the marker itself.
const INTERROGATIVES: &[&str] = &["what", "when", "how", "where", "why", "who"];

/// §4.5 `decompose_query`: strip temporal phrasing from the text used for
/// embedding/BM25, detect an ordering `direction`, and report whether a
/// temporal signal was present at all (driving δ in §4.6 step 7).
///
/// This only strips the small set of generic temporal marker words (§4.6.2
/// never asks for exact date extraction here; that is the `DateResolver`'s
/// job at ingest time). Words that double as ordinary content ("first",
/// "last") are only stripped when they actually flip `has_temporal_signal`.
pub fn decompose_query(text: &str) -> (String, Direction, bool) {
    let has_signal = has_temporal_signal(text);
    if !has_signal {
        return (text.to_string(), Direction::None, false);
    }

    let direction = detect_direction(text);

    let lower = text.to_lowercase();
    let mut stripped_words: Vec<&str> = Vec::new();
    'outer: for word in text.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        let cleaned = trimmed.to_lowercase();
        for marker in TEMPORAL_MARKERS.iter().chain(EARLIEST_MARKERS).chain(LATEST_MARKERS).chain(INTERROGATIVES) {
            if cleaned == *marker || (marker.contains(' ') && lower.contains(marker)) {
                continue 'outer;
            }
        }
        if looks_like_iso_date(&cleaned) {
            continue;
        }
        stripped_words.push(trimmed);
    }
    let stripped = stripped_words.join(" ");
    let stripped = if stripped.trim().is_empty() { text.to_string() } else { stripped };
    (stripped, direction, true)
}

fn detect_direction(text: &str) -> Direction {
    let lower = text.to_lowercase();
    if EARLIEST_MARKERS.iter().any(|m| lower.contains(m)) {
        Direction::Earliest
    } else if LATEST_MARKERS.iter().any(|m| lower.contains(m)) {
        Direction::Latest
    } else {
        Direction::None
    }
}

/// §4.5 `temporal_score(query_range, node) -> [0,1]`: overlap of
/// `[t_event_start, t_event_end]` with the query's detected range; zero if
/// either is missing (§9 "bi-temporal ambiguity... never guess").
pub fn temporal_score(
    query_range: Option<EventRange>,
    node_start: Option<DateTime<Utc>>,
    node_end: Option<DateTime<Utc>>,
) -> f64 {
    let Some(query_range) = query_range else { return 0.0 };
    let Some(node_start) = node_start else { return 0.0 };
    let node_end = node_end.unwrap_or(node_start);
    let query_end = query_range.end.unwrap_or(query_range.start);

    let overlap_start = node_start.max(query_range.start);
    let overlap_end = node_end.min(query_end);
    if overlap_end < overlap_start {
        return 0.0;
    }

    let overlap_secs = (overlap_end - overlap_start).num_seconds().max(0) as f64;
    let query_span = (query_end - query_range.start).num_seconds().max(1) as f64;
    (overlap_secs / query_span).clamp(0.0, 1.0)
}

/// Words and phrases that signal the query itself carries a temporal
/// constraint, enabling the δ (temporal) blend term (§4.6 step 7). This is
/// a lightweight heuristic, not the full `DateResolver` contract used
/// during ingestion (§6) — query-time temporal detection only needs to
/// decide whether to activate the signal, not parse an exact date.
const TEMPORAL_MARKERS: &[&str] = &[
    "yesterday", "today", "tomorrow", "last week", "last month", "last year",
    "this week", "this month", "this year", "ago", "recent", "recently",
    "before", "after", "since", "during", "when did", "when was",
];

/// Whether `query` carries an explicit temporal constraint (§4.6 step 7).
/// Checks the marker list first, then a bare ISO-8601 date fragment
/// (`YYYY-MM-DD`), which a marker-word scan alone would miss.
pub fn has_temporal_signal(query: &str) -> bool {
    let lower = query.to_lowercase();
    if TEMPORAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    looks_like_iso_date(&lower)
}

fn looks_like_iso_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return false;
    }
    bytes.windows(10).any(|w| {
        w[0].is_ascii_digit()
            && w[1].is_ascii_digit()
            && w[2].is_ascii_digit()
            && w[3].is_ascii_digit()
            && w[4] == b'-'
            && w[5].is_ascii_digit()
            && w[6].is_ascii_digit()
            && w[7] == b'-'
            && w[8].is_ascii_digit()
            && w[9].is_ascii_digit()
    })
}

/// Directional temporal scores for queries that carry an ordinal marker
/// ("first"/"last") but no date the `DateResolver` can resolve to a
/// concrete range — `temporal_score` has nothing to overlap against in
/// that case. Resolves the §9 Open Question left for implementers by
/// scoring each candidate's `t_event_start` relative to the candidate
/// set's own earliest/latest extreme (documented in `DESIGN.md`):
/// `Direction::Earliest` favors the oldest event time, `Direction::Latest`
/// the newest, linearly across the set's span. Candidates without an
/// event time, and every candidate when `direction` is `None`, score `0`.
pub fn directional_scores(
    direction: Direction,
    events: impl IntoIterator<Item = (NodeId, Option<DateTime<Utc>>)>,
) -> HashMap<NodeId, f64> {
    let mut scores = HashMap::new();
    if direction == Direction::None {
        return scores;
    }
    let dated: Vec<(NodeId, DateTime<Utc>)> = events.into_iter().filter_map(|(id, t)| t.map(|t| (id, t))).collect();
    let (Some(min), Some(max)) = (dated.iter().map(|(_, t)| *t).min(), dated.iter().map(|(_, t)| *t).max()) else {
        return scores;
    };
    let span = (max - min).num_seconds().max(1) as f64;
    for (id, t) in dated {
        let position = (t - min).num_seconds() as f64 / span;
        let score = match direction {
            Direction::Earliest => 1.0 - position,
            Direction::Latest => position,
            Direction::None => 0.0,
        };
        scores.insert(id, score.clamp(0.0, 1.0));
    }
    scores
}

/// Recency factor for a node (§4.5, §9 Open Question (a)). Anchor
/// categories (milestones, self-reflection, etc.) never decay.
pub fn recency_factor(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    category: &str,
    config: &TemporalConfig,
) -> f64 {
    if config.is_anchor(category) {
        return 1.0;
    }
    let elapsed_days = (now - created_at).num_seconds() as f64 / 86_400.0;
    let multiplier = config.category_multiplier(category);
    0.5_f64.powf((elapsed_days.max(0.0) / config.half_life_days) * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn anchor_category_never_decays() {
        let cfg = TemporalConfig::default();
        let created = Utc::now() - Duration::days(3650);
        let factor = recency_factor(created, Utc::now(), "milestone", &cfg);
        assert_eq!(factor, 1.0);
    }

    #[test]
    fn recency_halves_at_half_life() {
        let cfg = TemporalConfig::default();
        let created = Utc::now() - Duration::days(cfg.half_life_days as i64);
        let factor = recency_factor(created, Utc::now(), "journal", &cfg);
        assert!((factor - 0.5).abs() < 0.02);
    }

    #[test]
    fn recency_is_one_at_creation() {
        let cfg = TemporalConfig::default();
        let now = Utc::now();
        let factor = recency_factor(now, now, "journal", &cfg);
        assert!((factor - 1.0).abs() < 1e-6);
    }

    #[test]
    fn detects_explicit_temporal_markers() {
        assert!(has_temporal_signal("what did I say yesterday about rust"));
        assert!(has_temporal_signal("notes from 2026-01-15"));
        assert!(!has_temporal_signal("what do I know about rust ownership"));
    }

    #[test]
    fn decompose_strips_markers_and_detects_earliest_direction() {
        let (stripped, direction, has_signal) =
            decompose_query("what happened first in this project?");
        assert!(has_signal);
        assert_eq!(direction, Direction::Earliest);
        assert!(!stripped.to_lowercase().contains("first"));
        assert!(stripped.to_lowercase().contains("project"));
        assert_eq!(stripped, "happened in this project");
    }

    #[test]
    fn decompose_leaves_non_temporal_query_untouched() {
        let (stripped, direction, has_signal) = decompose_query("debugging tools in Python");
        assert!(!has_signal);
        assert_eq!(direction, Direction::None);
        assert_eq!(stripped, "debugging tools in Python");
    }

    #[test]
    fn temporal_score_is_zero_without_both_ranges() {
        let range = EventRange { start: Utc::now(), end: None };
        assert_eq!(temporal_score(None, Some(Utc::now()), None), 0.0);
        assert_eq!(temporal_score(Some(range), None, None), 0.0);
    }

    #[test]
    fn directional_scores_favor_oldest_for_earliest() {
        let base = Utc::now();
        let events = vec![(1, Some(base - Duration::days(30))), (2, Some(base))];
        let scores = directional_scores(Direction::Earliest, events);
        assert!(scores[&1] > scores[&2]);
    }

    #[test]
    fn directional_scores_favor_newest_for_latest() {
        let base = Utc::now();
        let events = vec![(1, Some(base - Duration::days(30))), (2, Some(base))];
        let scores = directional_scores(Direction::Latest, events);
        assert!(scores[&2] > scores[&1]);
    }

    #[test]
    fn directional_scores_empty_without_direction() {
        let base = Utc::now();
        let events = vec![(1, Some(base)), (2, Some(base))];
        assert!(directional_scores(Direction::None, events).is_empty());
    }

    #[test]
    fn temporal_score_rewards_overlap() {
        let base = Utc::now();
        let range = EventRange {
            start: base - Duration::days(5),
            end: Some(base + Duration::days(5)),
        };
        let score = temporal_score(Some(range), Some(base), Some(base + Duration::days(1)));
        assert!(score > 0.0);

        let disjoint_start = base + Duration::days(100);
        let score_disjoint = temporal_score(
            Some(range),
            Some(disjoint_start),
            Some(disjoint_start + Duration::days(1)),
        );
        assert_eq!(score_disjoint, 0.0);
    }
}
