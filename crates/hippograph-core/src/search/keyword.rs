//! BM25 keyword search over SQLite FTS5 (§4.4).
//!
//! The reference crate's own keyword layer is a thin wrapper over FTS5's
//! built-in `bm25()` ranking function plus a query-sanitizer guarding
//! against FTS5 syntax characters leaking in from free text; that shape is
//! kept unchanged, generalized to the new `nodes_fts` table.

use crate::model::NodeId;

/// Characters FTS5's query syntax treats specially. A bare user query is
/// quoted per-token so these never reach the parser as operators.
const FTS5_SPECIAL: &[char] = &['"', '*', '^', ':', '(', ')', '-'];

/// Quote every token of a free-text query so it is always interpreted as a
/// literal phrase search, never as FTS5 query syntax (§4.4 "the query
/// string must be sanitized before it reaches FTS5's MATCH operator").
pub fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| {
            let cleaned: String = token.chars().filter(|c| !FTS5_SPECIAL.contains(c)).collect();
            if cleaned.is_empty() {
                String::new()
            } else {
                format!("\"{cleaned}\"")
            }
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// BM25 scores pulled from FTS5, renormalized to `[0, 1]` (higher is
/// better) for blending with the other retrieval signals (§4.6 step 6).
///
/// FTS5's `bm25()` returns a *negative* score where more negative is a
/// better match; this inverts and min-max normalizes that scale.
pub fn normalize_bm25_scores(raw: &[(NodeId, f64)]) -> Vec<(NodeId, f32)> {
    if raw.is_empty() {
        return Vec::new();
    }
    // Flip sign so higher means better, matching every other signal.
    let flipped: Vec<f64> = raw.iter().map(|(_, score)| -score).collect();
    let min = flipped.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = flipped.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    raw.iter()
        .zip(flipped.iter())
        .map(|((id, _), &f)| {
            let normalized = if range > 1e-9 { (f - min) / range } else { 1.0 };
            (*id, normalized as f32)
        })
        .collect()
}
