//! `DateResolver` contract (§6, §9).
//!
//! Event-time extraction is an external collaborator: free text may mention
//! "last Tuesday" or "Q3 2025" and the core never parses that itself (§9
//! "bi-temporal ambiguity... never guess"). The resolver either returns a
//! range or nothing; a missing end is "unknown" per §9, never guessed.

use chrono::{DateTime, Utc};

/// An event-time range resolved from free text. `end` is `None` when the
/// text describes an open-ended or point-in-time event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRange {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// `DateResolver.resolve(text, base_time) -> optional(t_start, t_end)` (§6).
pub trait DateResolver: Send + Sync {
    fn resolve(&self, text: &str, base_time: DateTime<Utc>) -> Option<EventRange>;

    fn is_available(&self) -> bool;
}

/// The disabled variant: ingestion proceeds with `t_event_start`/`t_event_end`
/// left unset, exactly as if the note carried no event-time language.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDateResolver;

impl DateResolver for NullDateResolver {
    fn resolve(&self, _text: &str, _base_time: DateTime<Utc>) -> Option<EventRange> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_resolver_resolves_nothing() {
        assert!(!NullDateResolver.is_available());
        assert!(NullDateResolver.resolve("yesterday", Utc::now()).is_none());
    }
}
