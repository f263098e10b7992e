//! Event records and the calendar bundle they travel in.
//!
//! Records are whatever the fetch stage produced: required fields may be
//! missing, so they are optional here and checked per event during
//! serialization rather than rejected up front.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{IcsError, IcsResult};

const MIN_ICS_YEAR: i32 = 0;
const MAX_ICS_YEAR: i32 = 9999;

/// A single calendar record as handed over by the fetch stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    /// Bare date ("2024-05-01") or full timestamp.
    #[serde(default, deserialize_with = "lenient_string")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Zone used for `start`/`end` literals that carry no offset. UTC when absent.
    #[serde(
        default,
        alias = "timeZone",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_zone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

impl EventRecord {
    pub fn id(&self) -> Option<&str> {
        present(&self.id)
    }

    pub fn title(&self) -> Option<&str> {
        present(&self.title)
    }

    pub fn start(&self) -> Option<&str> {
        present(&self.start)
    }

    pub fn end(&self) -> Option<&str> {
        present(&self.end)
    }

    pub fn time_zone(&self) -> Option<&str> {
        present(&self.time_zone)
    }

    pub fn description(&self) -> &str {
        present(&self.description).unwrap_or("")
    }

    pub fn location(&self) -> &str {
        present(&self.location).unwrap_or("")
    }

    pub fn url(&self) -> Option<&str> {
        present(&self.url)
    }
}

/// Empty strings count as absent.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Calendar name plus its events, in output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarBundle {
    #[serde(alias = "calname")]
    pub name: String,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl CalendarBundle {
    pub fn new(name: impl Into<String>, events: Vec<EventRecord>) -> Self {
        CalendarBundle {
            name: name.into(),
            events,
        }
    }

    /// Parse a bundle from JSON text.
    ///
    /// Structural problems (not an object, no name, `events` not an array) are
    /// `InvalidBundle`. Individual events that are not objects become empty
    /// records so the serializer reports and skips them.
    pub fn from_json(json: &str) -> IcsResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| IcsError::InvalidBundle(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> IcsResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(IcsError::InvalidBundle("expected a JSON object".into()));
        };

        let name = map
            .remove("name")
            .or_else(|| map.remove("calname"))
            .and_then(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .ok_or_else(|| IcsError::InvalidBundle("calendar name is missing or empty".into()))?;

        let events = match map.remove("events") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
            Some(_) => return Err(IcsError::InvalidBundle("`events` is not an array".into())),
            None => return Err(IcsError::InvalidBundle("`events` is missing".into())),
        };

        Ok(CalendarBundle { name, events })
    }
}

/// A normalized point in time: either a UTC instant or a plain calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Basic-format rendering: `yyyyMMddTHHmmssZ` or `yyyyMMdd`.
    pub fn format_ics(&self) -> String {
        match self {
            EventTime::DateTime(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            EventTime::Date(d) => d.format("%Y%m%d").to_string(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// True when the year fits the four digits DTSTART/DTEND allow.
    pub fn in_ics_range(&self) -> bool {
        (MIN_ICS_YEAR..=MAX_ICS_YEAR).contains(&self.date().year())
    }

    /// The calendar date, taking UTC's date for instants.
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::DateTime(dt) => dt.date_naive(),
            EventTime::Date(d) => *d,
        }
    }
}

/// Accepts strings as-is, stringifies numbers and booleans, and treats
/// anything else as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_json_accepts_calname_alias() {
        let bundle = CalendarBundle::from_json(
            r#"{"calname": "Team", "events": [{"id": "a", "title": "T", "start": "2024-06-01"}]}"#,
        )
        .unwrap();
        assert_eq!(bundle.name, "Team");
        assert_eq!(bundle.events.len(), 1);
        assert_eq!(bundle.events[0].start(), Some("2024-06-01"));
    }

    #[test]
    fn test_from_json_rejects_missing_name() {
        let err = CalendarBundle::from_json(r#"{"events": []}"#).unwrap_err();
        assert!(matches!(err, IcsError::InvalidBundle(_)), "got {err:?}");

        let err = CalendarBundle::from_json(r#"{"name": "", "events": []}"#).unwrap_err();
        assert!(matches!(err, IcsError::InvalidBundle(_)), "got {err:?}");
    }

    #[test]
    fn test_from_json_rejects_non_array_events() {
        let err = CalendarBundle::from_json(r#"{"name": "Cal", "events": {"id": "x"}}"#).unwrap_err();
        assert!(matches!(err, IcsError::InvalidBundle(_)), "got {err:?}");

        let err = CalendarBundle::from_json(r#"["not", "an", "object"]"#).unwrap_err();
        assert!(matches!(err, IcsError::InvalidBundle(_)), "got {err:?}");
    }

    #[test]
    fn test_from_json_keeps_malformed_events_as_empty_records() {
        let bundle =
            CalendarBundle::from_json(r#"{"name": "Cal", "events": [42, {"id": 7, "title": null}]}"#)
                .unwrap();
        assert_eq!(bundle.events[0], EventRecord::default());
        assert_eq!(bundle.events[1].id(), Some("7"));
        assert_eq!(bundle.events[1].title(), None);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let record = EventRecord {
            id: Some(String::new()),
            description: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(record.id(), None);
        assert_eq!(record.description(), "");
        assert_eq!(record.url(), None);
    }

    #[test]
    fn test_event_time_format() {
        let dt = EventTime::DateTime(Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap());
        assert_eq!(dt.format_ics(), "20240601T200000Z");

        let d = EventTime::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(d.format_ics(), "20240601");
        assert!(d.is_date());
    }
}
