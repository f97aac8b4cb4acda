//! ICS payload parsing using the icalendar crate's parser.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use famdash_core::{FamDashError, FamDashResult, RawEvent, RecurrenceSpec};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::warn;

/// Parse a full ICS document into raw events, one per VEVENT.
///
/// Components without a UID or a usable DTSTART are skipped with a
/// warning rather than failing the whole feed; one broken entry must not
/// empty a calendar.
pub fn parse_events(content: &str) -> FamDashResult<Vec<RawEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| FamDashError::Parse(e.to_string()))?;

    let mut events = Vec::new();
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match parse_vevent(component) {
            Some(event) => events.push(event),
            None => warn!("skipping VEVENT without UID or usable DTSTART"),
        }
    }

    Ok(events)
}

fn parse_vevent(vevent: &Component) -> Option<RawEvent> {
    let uid = vevent.find_prop("UID")?.val.to_string();
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| "(No title)".to_string());

    let start_value = DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?;
    // All-day iff the start carries only a date component.
    let all_day = matches!(start_value, DatePerhapsTime::Date(_));
    let start = to_utc(&start_value)?;

    // DTEND is optional: all-day events default to the exclusive next-day
    // boundary, timed events to a zero-length end.
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .as_ref()
        .and_then(to_utc)
        .unwrap_or(if all_day { start + Duration::days(1) } else { start });

    let recurrence = vevent
        .find_prop("RRULE")
        .map(|p| RecurrenceSpec::Text(p.val.to_string()));

    // EXDATE may appear once with a comma list, or as repeated properties;
    // either way the engine gets one flat sequence.
    let exception_dates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();

    Some(RawEvent {
        uid,
        summary,
        start,
        end,
        all_day,
        recurrence,
        exception_dates,
    })
}

/// Flatten any ICS date/time form to UTC.
///
/// Floating times are read as UTC; zoned times resolve through the IANA
/// database and fall back to a plain UTC reading when the TZID is unknown.
fn to_utc(value: &DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(*dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Some(naive.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            Some(zoned_to_utc(*date_time, tzid))
        }
    }
}

fn zoned_to_utc(naive: NaiveDateTime, tzid: &str) -> DateTime<Utc> {
    match tzid.parse::<Tz>() {
        Ok(tz) => naive
            .and_local_timezone(tz)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
        Err(_) => {
            warn!(%tzid, "unknown TZID, reading timestamp as UTC");
            naive.and_utc()
        }
    }
}

/// Parse one EXDATE property into UTC instants.
///
/// Handles:
/// - `EXDATE;VALUE=DATE:20260108`
/// - `EXDATE:20260108T100000Z`
/// - `EXDATE:20260108T100000` (floating)
/// - `EXDATE;TZID=Europe/Zurich:20260108T100000`
/// - comma-separated value lists in any of the above
fn parse_exdate_property(prop: &Property) -> Vec<DateTime<Utc>> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            } else if let Some(ref tz) = tzid {
                let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()?;
                Some(zoned_to_utc(naive, tz))
            } else if let Some(stripped) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            }
        })
        .collect()
}
