//! Notion page shapes and their mapping onto [`EventRecord`]s.
//!
//! Fetching is someone else's job. This module takes the JSON a data-source
//! query returned (and optionally the data-source schema) and builds a
//! [`CalendarBundle`]. Property lookups go through a [`PropertyMap`] of
//! property IDs that is resolved once, before any page is read.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::diagnostic::{SkipReason, SkipWarning};
use crate::error::{IcsError, IcsResult};
use crate::event::{CalendarBundle, EventRecord, EventTime};
use crate::normalize::parse_instant;

static UNTITLED: &str = "(No Title)";

/// A page returned by a data-source query.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    /// Keyed by property name.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// One property of a page. Only the shapes used for calendar fields are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyValue {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: Vec<RichText>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub date: Option<DateValue>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateValue {
    pub start: Option<String>,
    pub end: Option<String>,
    pub time_zone: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RichText>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<RichText>>::deserialize(deserializer)?.unwrap_or_default())
}

fn plain_text(fragments: &[RichText]) -> String {
    fragments.iter().map(|f| f.plain_text.as_str()).collect()
}

/// Which page properties feed which event fields.
///
/// Values are property names or property IDs until [`PropertyMap::resolve`]
/// turns them all into IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMap {
    pub title: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for PropertyMap {
    fn default() -> Self {
        PropertyMap {
            title: "Name".to_string(),
            date: "Date".to_string(),
            description: None,
            location: None,
            url: None,
        }
    }
}

impl PropertyMap {
    /// Turn every entry into a property ID using a name → ID table.
    ///
    /// An entry that is a known name maps to its ID; an entry that already is
    /// one of the IDs is kept. Anything else is a schema error.
    pub fn resolve(&self, ids: &BTreeMap<String, String>) -> IcsResult<PropertyMap> {
        let lookup = |entry: &str| -> IcsResult<String> {
            if let Some(id) = ids.get(entry) {
                return Ok(id.clone());
            }
            if ids.values().any(|id| id == entry) {
                return Ok(entry.to_string());
            }
            Err(IcsError::Schema(format!("property '{entry}' not found")))
        };

        Ok(PropertyMap {
            title: lookup(self.title.as_str())?,
            date: lookup(self.date.as_str())?,
            description: self.description.as_deref().map(lookup).transpose()?,
            location: self.location.as_deref().map(lookup).transpose()?,
            url: self.url.as_deref().map(lookup).transpose()?,
        })
    }
}

/// Name → ID table from a data-source schema (`{"properties": {name: {"id": ..}}}`).
pub fn schema_property_ids(schema: &Value) -> IcsResult<BTreeMap<String, String>> {
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| IcsError::Schema("schema has no properties".into()))?;

    properties
        .iter()
        .map(|(name, prop)| {
            prop.get("id")
                .and_then(Value::as_str)
                .map(|id| (name.clone(), id.to_string()))
                .ok_or_else(|| IcsError::Schema(format!("property '{name}' has no id")))
        })
        .collect()
}

/// Name → ID table taken from the pages themselves, for when no schema is at hand.
pub fn page_property_ids(pages: &[Page]) -> BTreeMap<String, String> {
    pages
        .iter()
        .flat_map(|page| page.properties.iter())
        .map(|(name, prop)| (name.clone(), prop.id.clone()))
        .collect()
}

/// Read pages from a query response (`{"results": [...]}`) or a bare array.
///
/// Pages that do not have the page shape are reported and dropped.
pub fn pages_from_json(json: &str) -> IcsResult<(Vec<Page>, Vec<SkipWarning>)> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| IcsError::Serialization(format!("query result: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(IcsError::Serialization("query result has no `results` array".into())),
        },
        _ => return Err(IcsError::Serialization("query result is not an object or array".into())),
    };

    let mut pages = Vec::with_capacity(items.len());
    let mut warnings = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let id = item.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<Page>(item) {
            Ok(page) => pages.push(page),
            Err(e) => {
                let reason = match id {
                    None => SkipReason::MissingId,
                    Some(_) => SkipReason::UnreadablePage(e.to_string()),
                };
                let warning = SkipWarning::skipped(index, id.as_deref(), reason);
                warn!("{warning}");
                warnings.push(warning);
            }
        }
    }

    Ok((pages, warnings))
}

/// Build a bundle from pages. `properties` must already be resolved to IDs.
///
/// Pages without a date start are dropped with a warning. A missing title
/// becomes `(No Title)`. An end equal to the start is treated as no end.
/// Events come out ordered by start, ties in input order.
pub fn bundle_from_pages(
    calendar_name: &str,
    pages: &[Page],
    properties: &PropertyMap,
) -> (CalendarBundle, Vec<SkipWarning>) {
    let mut events = Vec::with_capacity(pages.len());
    let mut warnings = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        let by_id: HashMap<&str, &PropertyValue> =
            page.properties.values().map(|p| (p.id.as_str(), p)).collect();
        let get = |id: Option<&str>| id.and_then(|id| by_id.get(id).copied());

        let Some(date) = get(Some(properties.date.as_str()))
            .and_then(|p| p.date.as_ref())
            .filter(|d| d.start.as_deref().is_some_and(|s| !s.is_empty()))
        else {
            let warning = SkipWarning::skipped(index, Some(page.id.as_str()), SkipReason::MissingStart);
            warn!("{warning}");
            warnings.push(warning);
            continue;
        };

        let title = get(Some(properties.title.as_str()))
            .map(|p| plain_text(&p.title))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        let text = |id: Option<&str>| get(id).map(|p| plain_text(&p.rich_text)).unwrap_or_default();
        let end = date.end.clone().filter(|end| !end.is_empty() && date.start.as_ref() != Some(end));

        events.push(EventRecord {
            id: Some(page.id.clone()),
            title: Some(title),
            start: date.start.clone(),
            end,
            time_zone: date.time_zone.clone(),
            description: Some(text(properties.description.as_deref())),
            location: Some(text(properties.location.as_deref())),
            url: Some(
                get(properties.url.as_deref())
                    .and_then(|p| p.url.clone())
                    .unwrap_or_default(),
            ),
        });
    }

    events.sort_by_key(sort_key);

    (CalendarBundle::new(calendar_name, events), warnings)
}

/// Start instant for ordering; unparseable starts sort last.
fn sort_key(record: &EventRecord) -> (bool, Option<DateTime<Utc>>) {
    let instant = record
        .start()
        .and_then(|start| parse_instant(start, record.time_zone()).ok())
        .map(|time| match time {
            EventTime::DateTime(dt) => dt,
            EventTime::Date(d) => d.and_time(NaiveTime::MIN).and_utc(),
        });
    (instant.is_none(), instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn page(id: &str, title: &str, date: Value) -> Value {
        json!({
            "object": "page",
            "id": id,
            "properties": {
                "Name": {"id": "title", "type": "title", "title": [{"plain_text": title}]},
                "When": {"id": "d%3Ax", "type": "date", "date": date},
                "Notes": {"id": "n1", "type": "rich_text", "rich_text": [
                    {"plain_text": "Bring "}, {"plain_text": "snacks"}
                ]},
                "Where": {"id": "l1", "type": "rich_text", "rich_text": []},
                "Link": {"id": "u1", "type": "url", "url": "https://example.com"}
            }
        })
    }

    fn ids() -> PropertyMap {
        PropertyMap {
            title: "title".to_string(),
            date: "d%3Ax".to_string(),
            description: Some("n1".to_string()),
            location: Some("l1".to_string()),
            url: Some("u1".to_string()),
        }
    }

    fn pages(values: Vec<Value>) -> Vec<Page> {
        let (pages, warnings) = pages_from_json(&json!({ "results": values }).to_string()).unwrap();
        assert!(warnings.is_empty());
        pages
    }

    #[test]
    fn test_schema_property_ids() {
        let schema = json!({"properties": {"Name": {"id": "title"}, "When": {"id": "d%3Ax"}}});
        let map = schema_property_ids(&schema).unwrap();
        assert_eq!(map.get("When").map(String::as_str), Some("d%3Ax"));

        let err = schema_property_ids(&json!({"object": "data_source"})).unwrap_err();
        assert!(matches!(err, IcsError::Schema(_)), "got {err:?}");
    }

    #[test]
    fn test_resolve_names_and_ids() {
        let table: BTreeMap<String, String> = [("Name", "title"), ("When", "d%3Ax"), ("Link", "u1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let map = PropertyMap {
            title: "Name".to_string(),
            date: "d%3Ax".to_string(),
            url: Some("Link".to_string()),
            ..PropertyMap::default()
        };

        let resolved = map.resolve(&table).unwrap();
        assert_eq!(resolved.title, "title");
        assert_eq!(resolved.date, "d%3Ax");
        assert_eq!(resolved.url.as_deref(), Some("u1"));

        let missing = PropertyMap {
            location: Some("Room".to_string()),
            ..map
        };
        assert!(matches!(missing.resolve(&table), Err(IcsError::Schema(_))));
    }

    #[test]
    fn test_page_becomes_record() {
        let pages = pages(vec![page(
            "p1",
            "Launch",
            json!({"start": "2024-06-01T10:00:00.000-05:00", "end": "2024-06-01T11:00:00.000-05:00", "time_zone": null}),
        )]);
        let (bundle, warnings) = bundle_from_pages("Team", &pages, &ids());

        assert!(warnings.is_empty());
        assert_eq!(bundle.name, "Team");
        assert_eq!(
            bundle.events,
            vec![EventRecord {
                id: Some("p1".to_string()),
                title: Some("Launch".to_string()),
                start: Some("2024-06-01T10:00:00.000-05:00".to_string()),
                end: Some("2024-06-01T11:00:00.000-05:00".to_string()),
                time_zone: None,
                description: Some("Bring snacks".to_string()),
                location: Some(String::new()),
                url: Some("https://example.com".to_string()),
            }]
        );
    }

    #[test]
    fn test_equal_end_is_dropped_and_zone_attached() {
        let pages = pages(vec![page(
            "p1",
            "Day off",
            json!({"start": "2024-06-01", "end": "2024-06-01", "time_zone": "America/Chicago"}),
        )]);
        let (bundle, _) = bundle_from_pages("Team", &pages, &ids());

        assert_eq!(bundle.events[0].end, None);
        assert_eq!(bundle.events[0].time_zone(), Some("America/Chicago"));
        // Bare date survives untouched so all-day detection still works.
        assert_eq!(bundle.events[0].start(), Some("2024-06-01"));
    }

    #[test]
    fn test_missing_date_is_skipped_and_missing_title_defaulted() {
        let pages = pages(vec![
            page("p1", "No date", Value::Null),
            page("p2", "", json!({"start": "2024-06-02", "end": null})),
        ]);
        let (bundle, warnings) = bundle_from_pages("Team", &pages, &ids());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].id.as_deref(), Some("p1"));
        assert_eq!(warnings[0].reason, SkipReason::MissingStart);
        assert_eq!(bundle.events.len(), 1);
        assert_eq!(bundle.events[0].title(), Some("(No Title)"));
    }

    #[test]
    fn test_events_are_sorted_by_start() {
        let pages = pages(vec![
            page("late", "Late", json!({"start": "2024-06-03"})),
            page("early", "Early", json!({"start": "2024-06-01T23:00:00-05:00"})),
            page("mid", "Mid", json!({"start": "2024-06-02T01:00:00Z"})),
        ]);
        let (bundle, _) = bundle_from_pages("Team", &pages, &ids());

        let order: Vec<_> = bundle.events.iter().filter_map(|e| e.id()).collect();
        assert_eq!(order, vec!["mid", "early", "late"]);
    }

    #[test]
    fn test_pages_from_bare_array_and_bad_items() {
        let json = json!([
            page("p1", "Ok", json!({"start": "2024-06-01"})),
            {"object": "page"},
            {"id": "p2", "properties": "not a map"}
        ])
        .to_string();
        let (pages, warnings) = pages_from_json(&json).unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].reason, SkipReason::MissingId);
        assert_eq!(warnings[1].index, 2);
        assert_eq!(warnings[1].id.as_deref(), Some("p2"));
        assert!(matches!(warnings[1].reason, SkipReason::UnreadablePage(_)), "{:?}", warnings[1]);
    }

    #[test]
    fn test_page_property_ids_from_pages() {
        let pages = pages(vec![page("p1", "Ok", json!({"start": "2024-06-01"}))]);
        let table = page_property_ids(&pages);

        assert_eq!(table.get("When").map(String::as_str), Some("d%3Ax"));
        let resolved = PropertyMap {
            date: "When".to_string(),
            ..PropertyMap::default()
        }
        .resolve(&table)
        .unwrap();
        assert_eq!(resolved.title, "title");
    }
}
