//! Date normalization.
//!
//! Turns ISO-8601-like literals into [`EventTime`] values and renders them in
//! the UTC basic format used by DTSTART/DTEND (`yyyyMMddTHHmmssZ`).
//!
//! An explicit offset in the literal always wins over the `zone` argument.
//! Literals without one are read in `zone`, or UTC when no zone is given.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{IcsError, IcsResult};
use crate::event::EventTime;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%H%M%S", "%H%M"];

/// Normalize `value` to a UTC timestamp string (`yyyyMMddTHHmmssZ`).
///
/// Bare dates are taken as midnight in `zone`.
pub fn normalize(value: &str, zone: Option<&str>) -> IcsResult<String> {
    let instant = match parse_instant(value, zone)? {
        EventTime::DateTime(dt) => dt,
        EventTime::Date(date) => {
            let zone = Zone::parse(zone).map_err(|reason| IcsError::invalid_date(value, reason))?;
            zone.to_utc(date.and_time(NaiveTime::MIN))
                .map_err(|reason| IcsError::invalid_date(value, reason))?
        }
    };
    Ok(in_ics_range(value, EventTime::DateTime(instant))?.format_ics())
}

/// Parse `value` into a canonical instant.
///
/// Literals without a time-of-day component stay plain dates; everything
/// else becomes a UTC instant at second precision.
pub fn parse_instant(value: &str, zone: Option<&str>) -> IcsResult<EventTime> {
    let literal = Literal::parse(value)?;
    let Some(time) = literal.time else {
        return in_ics_range(value, EventTime::Date(literal.date));
    };

    let naive = literal.date.and_time(time);
    let utc = match literal.offset {
        Some(offset) => (naive - offset).and_utc(),
        None => {
            let zone = Zone::parse(zone).map_err(|reason| IcsError::invalid_date(value, reason))?;
            zone.to_utc(naive)
                .map_err(|reason| IcsError::invalid_date(value, reason))?
        }
    };
    in_ics_range(value, EventTime::DateTime(truncate_subsec(utc)))
}

/// Years outside 0000-9999 have no `yyyyMMdd` rendering.
fn in_ics_range(value: &str, time: EventTime) -> IcsResult<EventTime> {
    if time.in_ics_range() {
        Ok(time)
    } else {
        Err(IcsError::invalid_date(value, "year outside 0000-9999"))
    }
}

/// The calendar date exactly as written in the literal, ignoring any offset.
pub fn calendar_date(value: &str) -> IcsResult<NaiveDate> {
    Ok(Literal::parse(value)?.date)
}

/// True when the literal spells out a time of day.
pub fn has_time_component(value: &str) -> bool {
    value.contains('T')
}

fn truncate_subsec(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}

/// A literal split into its date, optional time and optional offset.
#[derive(Debug, PartialEq)]
struct Literal {
    date: NaiveDate,
    time: Option<NaiveTime>,
    offset: Option<FixedOffset>,
}

impl Literal {
    fn parse(value: &str) -> IcsResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IcsError::invalid_date(value, "empty value"));
        }

        let (date_part, time_part) = match trimmed.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (trimmed, None),
        };

        let date = parse_date(date_part, time_part.is_none())
            .ok_or_else(|| IcsError::invalid_date(value, "unrecognized date"))?;

        let Some(time_part) = time_part else {
            return Ok(Literal {
                date,
                time: None,
                offset: None,
            });
        };

        let (clock, designator) = match time_part.find(['+', '-', 'Z', 'z']) {
            Some(i) => (&time_part[..i], Some(&time_part[i..])),
            None => (time_part, None),
        };

        let time = parse_time(clock).ok_or_else(|| IcsError::invalid_date(value, "unrecognized time"))?;
        let offset = designator
            .map(|d| parse_offset(d).ok_or_else(|| IcsError::invalid_date(value, "unrecognized offset")))
            .transpose()?;

        Ok(Literal {
            date,
            time: Some(time),
            offset,
        })
    }
}

/// Full dates in either format. Bare literals may also be reduced to
/// `YYYY-MM` or `YYYY`, which mean the first day of that month or year.
fn parse_date(date_part: &str, bare: bool) -> Option<NaiveDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
    {
        return Some(date);
    }
    if !bare {
        return None;
    }

    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    match date_part.split_once('-') {
        Some((year, month)) if year.len() == 4 && month.len() == 2 && digits(year) && digits(month) => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
        }
        None if date_part.len() == 4 && digits(date_part) => {
            NaiveDate::from_ymd_opt(date_part.parse().ok()?, 1, 1)
        }
        _ => None,
    }
}

fn parse_time(clock: &str) -> Option<NaiveTime> {
    // chrono wants at least hours and minutes; "15" alone is handled here.
    if clock.len() == 2 && clock.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveTime::from_hms_opt(clock.parse().ok()?, 0, 0);
    }
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(clock, fmt).ok())
}

/// `Z`, `±HH:MM`, `±HHMM` or `±HH`.
fn parse_offset(designator: &str) -> Option<FixedOffset> {
    if designator.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match designator.as_bytes().first()? {
        b'+' => (1, &designator[1..]),
        b'-' => (-1, &designator[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes): (i32, i32) = match digits.len() {
        2 => (digits.parse().ok()?, 0),
        4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// The zone a floating literal is read in.
#[derive(Debug, Clone, Copy)]
enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl Zone {
    /// `None`, "UTC" and "Z" mean UTC; `±HH:MM` is a fixed offset; anything
    /// else must be an IANA name.
    fn parse(zone: Option<&str>) -> Result<Self, String> {
        let Some(zone) = zone.map(str::trim).filter(|z| !z.is_empty()) else {
            return Ok(Zone::Fixed(Utc.fix()));
        };
        if zone.eq_ignore_ascii_case("utc") || zone.eq_ignore_ascii_case("z") {
            return Ok(Zone::Fixed(Utc.fix()));
        }
        if let Some(offset) = parse_offset(zone) {
            return Ok(Zone::Fixed(offset));
        }
        zone.parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| format!("unknown time zone '{zone}'"))
    }

    fn to_utc(self, naive: NaiveDateTime) -> Result<DateTime<Utc>, String> {
        let local = match self {
            Zone::Fixed(offset) => offset.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc)),
            // Folded times resolve to the earlier instant.
            Zone::Named(tz) => tz.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc)),
        };
        local.ok_or_else(|| format!("{naive} does not exist in this time zone"))
    }
}
