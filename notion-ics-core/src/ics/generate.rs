//! ICS calendar generation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::text::{escape_text, fold_line};
use crate::diagnostic::{SkipReason, SkipWarning};
use crate::error::{IcsError, IcsResult};
use crate::event::{CalendarBundle, EventRecord, EventTime};
use crate::normalize::{calendar_date, has_time_component, normalize, parse_instant};

static DEFAULT_DISPLAY_TIME_ZONE: &str = "America/Chicago";
static DEFAULT_UID_NAMESPACE: &str = "notion";

/// Knobs for calendar generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// Label written to X-WR-TIMEZONE. Display only: every time is emitted in UTC.
    pub display_time_zone: String,
    /// Suffix appended to record ids to form UIDs (`<id>@<namespace>`).
    pub uid_namespace: String,
    /// Escape TEXT values (`\`, `;`, `,`, newlines). Off writes them as-is.
    pub escape_text: bool,
    /// Fold content lines longer than 75 octets.
    pub fold_lines: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            display_time_zone: DEFAULT_DISPLAY_TIME_ZONE.to_string(),
            uid_namespace: DEFAULT_UID_NAMESPACE.to_string(),
            escape_text: true,
            fold_lines: true,
        }
    }
}

impl SerializeOptions {
    /// Unescaped, unfolded output. Lines for a missing DTEND or URL are
    /// still left out rather than written blank.
    pub fn raw() -> Self {
        SerializeOptions {
            escape_text: false,
            fold_lines: false,
            ..Self::default()
        }
    }

    fn text(&self, value: &str) -> String {
        if self.escape_text {
            escape_text(value)
        } else {
            value.to_string()
        }
    }
}

/// Result of a conversion: the calendar text plus what was dropped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub ics: String,
    pub warnings: Vec<SkipWarning>,
    /// Number of VEVENT blocks written.
    pub emitted: usize,
}

impl Conversion {
    pub fn skipped(&self) -> usize {
        self.warnings.iter().filter(|w| w.skipped).count()
    }
}

/// Generate the full calendar text for a bundle.
///
/// Only a structurally invalid bundle is an error. Records with missing or
/// unparseable required fields are left out and reported in
/// [`Conversion::warnings`].
pub fn serialize(bundle: &CalendarBundle, options: &SerializeOptions) -> IcsResult<Conversion> {
    if bundle.name.is_empty() {
        return Err(IcsError::InvalidBundle("calendar name is empty".into()));
    }

    let name = options.text(&bundle.name);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:-//{name}//EN"),
        format!("X-WR-CALNAME:{name}"),
        format!("X-WR-TIMEZONE:{}", options.display_time_zone),
    ];
    let mut warnings = Vec::new();
    let mut emitted = 0;

    for (index, record) in bundle.events.iter().enumerate() {
        match render_event(index, record, options) {
            Ok(rendered) => {
                debug!(index, id = record.id(), all_day = rendered.all_day, "emitting event");
                lines.extend(rendered.lines);
                warnings.extend(rendered.warning);
                emitted += 1;
            }
            Err(warning) => warnings.push(warning),
        }
    }

    lines.push("END:VCALENDAR".to_string());
    // Trailing empty element gives the closing CRLF.
    lines.push(String::new());

    for warning in &warnings {
        warn!(calendar = %bundle.name, "{warning}");
    }
    info!(
        calendar = %bundle.name,
        emitted,
        skipped = warnings.iter().filter(|w| w.skipped).count(),
        "calendar generated"
    );

    let lines: Vec<String> = if options.fold_lines {
        lines.iter().map(|l| fold_line(l)).collect()
    } else {
        lines
    };

    Ok(Conversion {
        ics: lines.join("\r\n"),
        warnings,
        emitted,
    })
}

struct RenderedEvent {
    lines: Vec<String>,
    all_day: bool,
    /// Set when the event was emitted despite a problem.
    warning: Option<SkipWarning>,
}

/// DTSTART/DTEND lines for an event, DTEND omitted when open-ended.
struct Span {
    start: String,
    end: Option<String>,
    all_day: bool,
    warning: Option<SkipWarning>,
}

fn render_event(
    index: usize,
    record: &EventRecord,
    options: &SerializeOptions,
) -> Result<RenderedEvent, SkipWarning> {
    let skip = |reason| SkipWarning::skipped(index, record.id(), reason);

    let id = record.id().ok_or_else(|| skip(SkipReason::MissingId))?;
    let title = record.title().ok_or_else(|| skip(SkipReason::MissingTitle))?;
    let start = record.start().ok_or_else(|| skip(SkipReason::MissingStart))?;

    let span = if has_time_component(start) {
        timed_span(index, record, start)?
    } else {
        all_day_span(index, record, start)?
    };

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@{}", options.text(id), options.uid_namespace),
        format!("SUMMARY:{}", options.text(title)),
        span.start,
    ];
    lines.extend(span.end);
    lines.push(format!("DESCRIPTION:{}", options.text(record.description())));
    lines.push(format!("LOCATION:{}", options.text(record.location())));
    if let Some(url) = record.url() {
        lines.push(format!("URL:{url}"));
    }
    lines.push("END:VEVENT".to_string());

    Ok(RenderedEvent {
        lines,
        all_day: span.all_day,
        warning: span.warning,
    })
}

/// Date-only range with an exclusive end: the day after `end`, or the day
/// after `start` when there is no usable end.
fn all_day_span(index: usize, record: &EventRecord, start: &str) -> Result<Span, SkipWarning> {
    let invalid_start = |reason: String| SkipWarning::skipped(index, record.id(), SkipReason::InvalidStart(reason));

    let start_date = match parse_instant(start, record.time_zone()) {
        Ok(EventTime::Date(date)) => date,
        Ok(EventTime::DateTime(_)) => return Err(invalid_start("expected a bare date".into())),
        Err(e) => return Err(invalid_start(e.to_string())),
    };

    let mut warning = None;
    let (last_day, from_end) = match record.end().map(calendar_date) {
        Some(Ok(end_date)) => (end_date, true),
        Some(Err(e)) => {
            warning = Some(SkipWarning::degraded(
                index,
                record.id(),
                SkipReason::InvalidEnd(e.to_string()),
            ));
            (start_date, false)
        }
        None => (start_date, false),
    };

    let Some(end_date) = next_day(last_day) else {
        let reason = format!("{last_day} has no following day in years 0000-9999");
        return Err(if from_end {
            SkipWarning::skipped(index, record.id(), SkipReason::InvalidEnd(reason))
        } else {
            invalid_start(reason)
        });
    };

    Ok(Span {
        start: format!("DTSTART;VALUE=DATE:{}", EventTime::Date(start_date).format_ics()),
        end: Some(format!("DTEND;VALUE=DATE:{}", EventTime::Date(end_date).format_ics())),
        all_day: true,
        warning,
    })
}

/// UTC date-time range; no DTEND when the record has no end.
fn timed_span(index: usize, record: &EventRecord, start: &str) -> Result<Span, SkipWarning> {
    let zone = record.time_zone();

    let start = normalize(start, zone).map_err(|e| {
        SkipWarning::skipped(index, record.id(), SkipReason::InvalidStart(e.to_string()))
    })?;
    let end = record
        .end()
        .map(|end| normalize(end, zone))
        .transpose()
        .map_err(|e| SkipWarning::skipped(index, record.id(), SkipReason::InvalidEnd(e.to_string())))?;

    Ok(Span {
        start: format!("DTSTART:{start}"),
        end: end.map(|end| format!("DTEND:{end}")),
        all_day: false,
        warning: None,
    })
}

fn next_day(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(1))
        .filter(|next| EventTime::Date(*next).in_ics_range())
}
