//! Source-neutral calendar types.
//!
//! Subscription feeds are converted into [`RawEvent`] values by the webcal
//! collaborator; the expansion engine consumes those together with the
//! configured [`CalendarSource`] list and produces [`EventInstance`]
//! values for the dashboard. The engine never mutates its inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceSpec;

/// A configured calendar subscription, injected into the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSource {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Display color; falls back to the kind's default when unset or empty.
    pub color: Option<String>,
    pub enabled: bool,
    pub kind: CalendarKind,
}

/// Where a subscription comes from. Determines the fallback display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    Google,
    Icloud,
}

impl CalendarKind {
    /// Default display color for sources of this kind.
    pub fn default_color(self) -> &'static str {
        match self {
            CalendarKind::Google => "#4285f4",
            CalendarKind::Icloud => "#ff2d55",
        }
    }
}

/// A single VEVENT as delivered by the parsing collaborator.
///
/// `all_day` is true iff the source start value carried only a date; for
/// those events `end` is the exclusive day boundary (midnight after the
/// last included day), per the ICS all-day convention.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub uid: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub recurrence: Option<RecurrenceSpec>,
    /// EXDATE values. An exception anywhere on a calendar day suppresses
    /// every occurrence starting on that day.
    pub exception_dates: Vec<DateTime<Utc>>,
}

/// One day-bounded, displayable unit derived from an event.
///
/// Serializes with camelCase field names and ISO-8601 timestamps; the
/// multi-day fields are omitted for single-day instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInstance {
    /// `<uid>_<start millis>`; unique per occurrence even when a recurring
    /// event shares its uid across all of them.
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub calendar: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub multi_day: bool,
    /// 1-based position within a multi-day span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<u32>,
}

impl EventInstance {
    /// Occurrence-unique id: the event uid plus the instance start in
    /// epoch milliseconds.
    pub fn instance_id(uid: &str, start: DateTime<Utc>) -> String {
        format!("{}_{}", uid, start.timestamp_millis())
    }
}

fn is_false(value: &bool) -> bool {
    !value
}
