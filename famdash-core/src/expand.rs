//! Per-event expansion: recurring vs. single path, exception filtering,
//! and instance construction.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::event::{EventInstance, RawEvent};
use crate::exception::is_excluded;
use crate::recurrence;
use crate::split::{DayBounds, split_days};
use crate::window::Window;

/// Expand one raw event into its displayable instances.
///
/// Non-recurring events go straight through the day splitter. Recurring
/// events are enumerated over the window, exception days removed, and
/// each surviving occurrence split with the original duration reapplied.
/// A malformed rule demotes the event to its single, un-recurred form
/// instead of dropping it, so a bad feed entry still shows up once.
pub fn expand_event(
    event: &RawEvent,
    calendar_name: &str,
    color: &str,
    window: &Window,
) -> Vec<EventInstance> {
    let Some(spec) = &event.recurrence else {
        return expand_occurrence(event, event.start, event.end, calendar_name, color, window);
    };

    let rule = match recurrence::resolve(spec, event.start) {
        Ok(rule) => rule,
        Err(err) => {
            warn!(
                uid = %event.uid,
                summary = %event.summary,
                %err,
                "bad recurrence rule, treating event as non-recurring"
            );
            return expand_occurrence(event, event.start, event.end, calendar_name, color, window);
        }
    };

    let duration = event.end - event.start;
    let mut instances = Vec::new();

    for occurrence in recurrence::enumerate(&rule, window) {
        if is_excluded(occurrence, &event.exception_dates) {
            continue;
        }
        instances.extend(expand_occurrence(
            event,
            occurrence,
            occurrence + duration,
            calendar_name,
            color,
            window,
        ));
    }

    instances
}

/// Split one concrete occurrence and wrap the parts into instances.
fn expand_occurrence(
    event: &RawEvent,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    calendar_name: &str,
    color: &str,
    window: &Window,
) -> Vec<EventInstance> {
    split_days(start, end, event.all_day, window)
        .into_iter()
        .map(|part| into_instance(event, part, calendar_name, color))
        .collect()
}

fn into_instance(
    event: &RawEvent,
    part: DayBounds,
    calendar_name: &str,
    color: &str,
) -> EventInstance {
    EventInstance {
        id: EventInstance::instance_id(&event.uid, part.start),
        title: event.summary.clone(),
        start: part.start,
        end: part.end,
        all_day: event.all_day,
        calendar: calendar_name.to_string(),
        color: color.to_string(),
        multi_day: part.multi_day(),
        day_index: part.day_index,
        total_days: part.total_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::RecurrenceSpec;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn test_window() -> Window {
        Window::around(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
    }

    fn timed_event(recurrence: Option<RecurrenceSpec>) -> RawEvent {
        let start = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        RawEvent {
            uid: "standup@family".to_string(),
            summary: "Standup".to_string(),
            start,
            end: start + Duration::minutes(30),
            all_day: false,
            recurrence,
            exception_dates: Vec::new(),
        }
    }

    #[test]
    fn non_recurring_event_yields_one_instance() {
        let event = timed_event(None);
        let instances = expand_event(&event, "Family", "#4285f4", &test_window());

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].title, "Standup");
        assert_eq!(instances[0].calendar, "Family");
        assert_eq!(instances[0].color, "#4285f4");
        assert_eq!(instances[0].start, event.start);
        assert_eq!(instances[0].end, event.end);
        assert!(!instances[0].multi_day);
    }

    #[test]
    fn weekly_rule_expands_across_the_window_with_unique_ids() {
        // Mondays from 2026-03-09 inside [2026-03-08, 2026-05-15]:
        // Mar 9/16/23/30, Apr 6/13/20/27, May 4/11.
        let event = timed_event(Some(RecurrenceSpec::Text("FREQ=WEEKLY".to_string())));
        let instances = expand_event(&event, "Family", "#4285f4", &test_window());

        assert_eq!(instances.len(), 10);

        let ids: HashSet<&str> = instances.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), instances.len(), "instance ids must be unique");

        for instance in &instances {
            assert_eq!(instance.end - instance.start, Duration::minutes(30));
        }
    }

    #[test]
    fn exception_day_suppresses_one_occurrence() {
        let mut event = timed_event(Some(RecurrenceSpec::Text("FREQ=WEEKLY".to_string())));
        // Declared at a different time-of-day than the 09:00 occurrence.
        event.exception_dates = vec![Utc.with_ymd_and_hms(2026, 3, 23, 0, 0, 0).unwrap()];

        let instances = expand_event(&event, "Family", "#4285f4", &test_window());

        assert_eq!(instances.len(), 9);
        assert!(
            !instances
                .iter()
                .any(|i| i.start.date_naive() == chrono::NaiveDate::from_ymd_opt(2026, 3, 23).unwrap()),
            "the excepted Monday must not appear"
        );
    }

    #[test]
    fn bad_rule_falls_back_to_the_single_event() {
        let event = timed_event(Some(RecurrenceSpec::Text("FREQ=SOMETIMES".to_string())));
        let instances = expand_event(&event, "Family", "#4285f4", &test_window());

        let expected = expand_event(&timed_event(None), "Family", "#4285f4", &test_window());
        assert_eq!(instances, expected, "fallback must equal the non-recurring expansion");
        assert_eq!(instances.len(), 1, "a bad rule must never empty the event");
    }

    #[test]
    fn recurring_multi_day_occurrences_are_split_per_day() {
        // A two-day timed event recurring weekly: every occurrence is
        // split, and the splitter runs on the shifted bounds.
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap();
        let event = RawEvent {
            uid: "nightshift@family".to_string(),
            summary: "Night shift".to_string(),
            start,
            end: start + Duration::hours(8),
            all_day: false,
            recurrence: Some(RecurrenceSpec::Text("FREQ=WEEKLY;COUNT=2".to_string())),
            exception_dates: Vec::new(),
        };

        let instances = expand_event(&event, "Family", "#ff2d55", &test_window());

        assert_eq!(instances.len(), 4);
        assert!(instances.iter().all(|i| i.multi_day));
        assert_eq!(instances[0].day_index, Some(1));
        assert_eq!(instances[1].day_index, Some(2));
        assert_eq!(instances[1].start, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(instances[3].end, Utc.with_ymd_and_hms(2026, 3, 18, 6, 0, 0).unwrap());
    }

    #[test]
    fn all_day_recurring_event_keeps_all_day_flag() {
        let start = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let event = RawEvent {
            uid: "chores@family".to_string(),
            summary: "Chores".to_string(),
            start,
            end: start + Duration::days(1),
            all_day: true,
            recurrence: Some(RecurrenceSpec::Text("FREQ=WEEKLY;COUNT=3".to_string())),
            exception_dates: Vec::new(),
        };

        let instances = expand_event(&event, "Family", "#4285f4", &test_window());

        assert_eq!(instances.len(), 3);
        assert!(instances.iter().all(|i| i.all_day));
        assert!(instances.iter().all(|i| !i.multi_day));
    }
}
