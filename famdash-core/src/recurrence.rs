//! Recurrence-rule resolution and occurrence enumeration.
//!
//! Feeds deliver recurrence descriptions in three equivalent shapes: raw
//! RRULE text, a pre-parsed option set, or an already-constructed rule.
//! All three normalize to an [`rrule::RRuleSet`] here, so the rest of the
//! pipeline never branches on shape.

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;
use tracing::warn;

use crate::error::{FamDashError, FamDashResult};
use crate::window::Window;

/// Upper bound on occurrences enumerated per rule and window.
const MAX_OCCURRENCES: u16 = 365;

/// A recurrence description in any of the shapes a feed may deliver.
#[derive(Debug, Clone)]
pub enum RecurrenceSpec {
    /// Raw rule text, with or without the `RRULE:` prefix.
    Text(String),
    /// A pre-parsed option set.
    Options(RecurrenceOptions),
    /// An already-constructed rule set (carries its own DTSTART).
    Rule(Box<RRuleSet>),
}

/// Recurrence frequency, the FREQ part of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceFreq {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceFreq {
    fn as_ics(self) -> &'static str {
        match self {
            RecurrenceFreq::Secondly => "SECONDLY",
            RecurrenceFreq::Minutely => "MINUTELY",
            RecurrenceFreq::Hourly => "HOURLY",
            RecurrenceFreq::Daily => "DAILY",
            RecurrenceFreq::Weekly => "WEEKLY",
            RecurrenceFreq::Monthly => "MONTHLY",
            RecurrenceFreq::Yearly => "YEARLY",
        }
    }
}

/// The option-set shape of [`RecurrenceSpec`].
///
/// Rendered to canonical RRULE text and resolved through the same parser
/// as the text shape, so the two can never drift apart.
#[derive(Debug, Clone)]
pub struct RecurrenceOptions {
    pub freq: RecurrenceFreq,
    pub interval: Option<u32>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    /// BYDAY values as ICS weekday codes ("MO", "2TU", "-1FR").
    pub by_day: Vec<String>,
    pub by_month_day: Vec<i8>,
    pub by_month: Vec<u8>,
}

impl RecurrenceOptions {
    pub fn new(freq: RecurrenceFreq) -> Self {
        RecurrenceOptions {
            freq,
            interval: None,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
        }
    }

    /// Render the options as RRULE text.
    pub fn to_rule_text(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.freq.as_ics())];

        if let Some(interval) = self.interval {
            parts.push(format!("INTERVAL={}", interval));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={}", count));
        }
        if let Some(until) = self.until {
            parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
        }
        if !self.by_day.is_empty() {
            parts.push(format!("BYDAY={}", self.by_day.join(",")));
        }
        if !self.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join_values(&self.by_month_day)));
        }
        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", join_values(&self.by_month)));
        }

        parts.join(";")
    }
}

fn join_values<T: std::fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Normalize any recurrence shape into an enumerable rule set.
///
/// `dtstart` anchors the text and option shapes; a pre-built rule keeps
/// the DTSTART it was constructed with. An unparseable or contradictory
/// rule comes back as [`FamDashError::Recurrence`] — never a panic — and
/// the orchestrator decides the fallback.
pub fn resolve(spec: &RecurrenceSpec, dtstart: DateTime<Utc>) -> FamDashResult<RRuleSet> {
    match spec {
        RecurrenceSpec::Rule(set) => Ok((**set).clone()),
        RecurrenceSpec::Text(text) => parse_rule_text(text, dtstart),
        RecurrenceSpec::Options(options) => parse_rule_text(&options.to_rule_text(), dtstart),
    }
}

fn parse_rule_text(text: &str, dtstart: DateTime<Utc>) -> FamDashResult<RRuleSet> {
    let rule = text.trim().trim_start_matches("RRULE:");
    let source = format!(
        "DTSTART:{}\nRRULE:{}",
        dtstart.format("%Y%m%dT%H%M%SZ"),
        rule
    );

    source
        .parse::<RRuleSet>()
        .map_err(|e| FamDashError::Recurrence(e.to_string()))
}

/// Enumerate occurrence start instants within the window, inclusive of
/// both edges.
///
/// rrule's `after`/`before` are exclusive, so the window is widened by a
/// second on each side. Enumeration past [`MAX_OCCURRENCES`] is truncated
/// with a warning; a runaway rule must not stall the dashboard.
pub fn enumerate(rule: &RRuleSet, window: &Window) -> Vec<DateTime<Utc>> {
    let tz = rrule::Tz::Tz(chrono_tz::UTC);
    let after = (window.start - Duration::seconds(1)).with_timezone(&tz);
    let before = (window.end + Duration::seconds(1)).with_timezone(&tz);

    let result = rule.clone().after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        warn!(limit = MAX_OCCURRENCES, "recurrence enumeration truncated");
    }

    result
        .dates
        .into_iter()
        .map(|occurrence| occurrence.with_timezone(&Utc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_window() -> Window {
        Window::around(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn text_and_options_shapes_resolve_identically() {
        let dtstart = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let window = test_window();

        let text = RecurrenceSpec::Text("FREQ=WEEKLY;BYDAY=MO;COUNT=4".to_string());
        let options = RecurrenceSpec::Options(RecurrenceOptions {
            count: Some(4),
            by_day: vec!["MO".to_string()],
            ..RecurrenceOptions::new(RecurrenceFreq::Weekly)
        });

        let from_text = enumerate(&resolve(&text, dtstart).unwrap(), &window);
        let from_options = enumerate(&resolve(&options, dtstart).unwrap(), &window);

        assert_eq!(from_text.len(), 4);
        assert_eq!(from_text, from_options);
    }

    #[test]
    fn prebuilt_rule_shape_is_used_as_is() {
        let dtstart = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let window = test_window();

        let prebuilt = resolve(
            &RecurrenceSpec::Text("FREQ=DAILY;COUNT=3".to_string()),
            dtstart,
        )
        .unwrap();
        let spec = RecurrenceSpec::Rule(Box::new(prebuilt));

        // A different dtstart is ignored; the rule keeps its own anchor.
        let other_start = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let occurrences = enumerate(&resolve(&spec, other_start).unwrap(), &window);

        assert_eq!(occurrences.len(), 3);
        assert_eq!(occurrences[0], dtstart);
    }

    #[test]
    fn rrule_prefix_in_text_is_accepted() {
        let dtstart = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let spec = RecurrenceSpec::Text("RRULE:FREQ=DAILY;COUNT=2".to_string());

        let occurrences = enumerate(&resolve(&spec, dtstart).unwrap(), &test_window());
        assert_eq!(occurrences.len(), 2);
    }

    #[test]
    fn unparseable_text_is_a_recurrence_error() {
        let dtstart = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let spec = RecurrenceSpec::Text("FREQ=SOMETIMES".to_string());

        match resolve(&spec, dtstart) {
            Err(FamDashError::Recurrence(_)) => {}
            other => panic!("expected Recurrence error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn enumeration_includes_window_edges() {
        // dtstart exactly at the window start must be included.
        let window = test_window();
        let spec = RecurrenceSpec::Text("FREQ=DAILY;COUNT=2".to_string());

        let occurrences = enumerate(&resolve(&spec, window.start).unwrap(), &window);
        assert_eq!(occurrences.first(), Some(&window.start));
    }

    #[test]
    fn occurrences_outside_window_are_not_enumerated() {
        let window = test_window();
        let dtstart = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let spec = RecurrenceSpec::Text("FREQ=WEEKLY;COUNT=4".to_string());

        // All four weekly occurrences end in January, before the window.
        let occurrences = enumerate(&resolve(&spec, dtstart).unwrap(), &window);
        assert!(occurrences.is_empty());
    }

    #[test]
    fn options_render_all_fields() {
        let until = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let options = RecurrenceOptions {
            interval: Some(2),
            until: Some(until),
            by_day: vec!["MO".to_string(), "FR".to_string()],
            by_month_day: vec![1, 15],
            by_month: vec![3, 6],
            ..RecurrenceOptions::new(RecurrenceFreq::Monthly)
        };

        assert_eq!(
            options.to_rule_text(),
            "FREQ=MONTHLY;INTERVAL=2;UNTIL=20260601T000000Z;BYDAY=MO,FR;BYMONTHDAY=1,15;BYMONTH=3,6"
        );
    }
}
