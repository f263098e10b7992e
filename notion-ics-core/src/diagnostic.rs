//! Per-record diagnostics.
//!
//! A bad record never aborts a conversion. It is dropped (or degraded) and a
//! [`SkipWarning`] is collected so callers can report it however they like.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingId,
    MissingTitle,
    MissingStart,
    /// The input item did not have the expected page shape.
    UnreadablePage(String),
    /// The start literal could not be parsed.
    InvalidStart(String),
    /// The end literal could not be parsed. All-day events keep going with
    /// the single-day default; timed events are dropped.
    InvalidEnd(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => write!(f, "missing id"),
            SkipReason::MissingTitle => write!(f, "missing title"),
            SkipReason::MissingStart => write!(f, "missing start date"),
            SkipReason::UnreadablePage(e) => write!(f, "unreadable page: {e}"),
            SkipReason::InvalidStart(e) => write!(f, "invalid start: {e}"),
            SkipReason::InvalidEnd(e) => write!(f, "invalid end: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipWarning {
    /// Position of the record in its input sequence.
    pub index: usize,
    pub id: Option<String>,
    pub reason: SkipReason,
    /// False when the record was still emitted in a degraded form.
    pub skipped: bool,
}

impl SkipWarning {
    pub fn skipped(index: usize, id: Option<&str>, reason: SkipReason) -> Self {
        SkipWarning {
            index,
            id: id.map(str::to_string),
            reason,
            skipped: true,
        }
    }

    pub fn degraded(index: usize, id: Option<&str>, reason: SkipReason) -> Self {
        SkipWarning {
            skipped: false,
            ..Self::skipped(index, id, reason)
        }
    }
}

impl fmt::Display for SkipWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.skipped { "skipped" } else { "kept" };
        match &self.id {
            Some(id) => write!(f, "record #{} ({id}) {action}: {}", self.index, self.reason),
            None => write!(f, "record #{} {action}: {}", self.index, self.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let w = SkipWarning::skipped(3, Some("abc"), SkipReason::MissingTitle);
        assert_eq!(w.to_string(), "record #3 (abc) skipped: missing title");

        let w = SkipWarning::degraded(0, None, SkipReason::InvalidEnd("bad".into()));
        assert_eq!(w.to_string(), "record #0 kept: invalid end: bad");

        let w = SkipWarning::skipped(1, Some("p2"), SkipReason::UnreadablePage("bad shape".into()));
        assert_eq!(w.to_string(), "record #1 (p2) skipped: unreadable page: bad shape");
    }
}
