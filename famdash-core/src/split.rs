//! Day-by-day splitting of event occurrences.
//!
//! A concrete occurrence (start, end, all-day flag) becomes one instance
//! per calendar day it spans. All-day feeds store an exclusive end (the
//! day after the last included day), so that day is trimmed off before
//! the span is measured. Both the non-recurring path and every occurrence
//! of a recurring event go through this one implementation.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::window::Window;

/// Per-day time bounds produced by [`split_days`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// 1-based day position, set only when the occurrence spans multiple days.
    pub day_index: Option<u32>,
    /// Span length in days, set only when the occurrence spans multiple days.
    pub total_days: Option<u32>,
}

impl DayBounds {
    pub fn multi_day(&self) -> bool {
        self.day_index.is_some()
    }
}

/// Split one occurrence into day-bounded parts inside the window.
///
/// Single-day occurrences pass through with their original bounds. For a
/// span of N calendar days, the first day keeps the original start time,
/// the last keeps the original end time, and the days between get
/// `[00:00:00.000, 23:59:59.999]` bounds; all-day spans get
/// `[00:00, next midnight)` per day. Parts whose start falls outside the
/// window are dropped silently.
pub fn split_days(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    all_day: bool,
    window: &Window,
) -> Vec<DayBounds> {
    // All-day ends are exclusive; step back one day before counting.
    let effective_end = if all_day { end - Duration::days(1) } else { end };

    let days_diff = (effective_end.date_naive() - start.date_naive()).num_days();

    if days_diff <= 0 {
        if !window.contains(start) {
            return Vec::new();
        }
        return vec![DayBounds {
            start,
            end,
            day_index: None,
            total_days: None,
        }];
    }

    let total_days = days_diff as u32 + 1;
    let first_day = start.date_naive();
    let mut parts = Vec::with_capacity(total_days as usize);

    for i in 0..=days_diff {
        let day = first_day + Duration::days(i);

        let (part_start, part_end) = if all_day {
            (day_start(day), day_start(day + Duration::days(1)))
        } else {
            let part_start = if i == 0 { start } else { day_start(day) };
            let part_end = if i == days_diff { end } else { day_end(day) };
            (part_start, part_end)
        };

        if !window.contains(part_start) {
            continue;
        }

        parts.push(DayBounds {
            start: part_start,
            end: part_end,
            day_index: Some(i as u32 + 1),
            total_days: Some(total_days),
        });
    }

    parts
}

/// Midnight at the start of the given calendar day.
fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// Last representable millisecond of the given calendar day.
fn day_end(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window_for_march_2026() -> Window {
        Window::around(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn single_day_timed_event_passes_through() {
        let window = window_for_march_2026();
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 10, 30, 0).unwrap();

        let parts = split_days(start, end, false, &window);

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].start, start);
        assert_eq!(parts[0].end, end);
        assert!(!parts[0].multi_day());
    }

    #[test]
    fn single_day_all_day_event_keeps_exclusive_end() {
        // One all-day day: start on the 10th, exclusive end on the 11th.
        let window = window_for_march_2026();
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();

        let parts = split_days(start, end, true, &window);

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].start, start);
        assert_eq!(parts[0].end, end);
        assert!(!parts[0].multi_day());
    }

    #[test]
    fn all_day_span_splits_into_one_part_per_included_day() {
        // 2026-03-10 .. 2026-03-13 exclusive = the 10th, 11th and 12th.
        let window = window_for_march_2026();
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 13, 0, 0, 0).unwrap();

        let parts = split_days(start, end, true, &window);

        assert_eq!(parts.len(), 3);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.day_index, Some(i as u32 + 1));
            assert_eq!(part.total_days, Some(3));
            assert_eq!(part.end - part.start, Duration::days(1));
        }
        assert_eq!(parts[0].start, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(parts[2].end, Utc.with_ymd_and_hms(2026, 3, 13, 0, 0, 0).unwrap());
    }

    #[test]
    fn timed_span_keeps_original_bounds_on_first_and_last_day() {
        let window = window_for_march_2026();
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 12, 6, 0, 0).unwrap();

        let parts = split_days(start, end, false, &window);

        assert_eq!(parts.len(), 3);

        assert_eq!(parts[0].start, start);
        assert_eq!(
            parts[0].end,
            Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );

        assert_eq!(parts[1].start, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(
            parts[1].end,
            Utc.with_ymd_and_hms(2026, 3, 11, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );

        assert_eq!(parts[2].start, Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap());
        assert_eq!(parts[2].end, end);
    }

    #[test]
    fn days_before_the_window_are_dropped() {
        // Span starts before the window opens on 2026-03-08; only the
        // in-window days survive, with their original day indices.
        let window = window_for_march_2026();
        let start = Utc.with_ymd_and_hms(2026, 3, 6, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();

        let parts = split_days(start, end, true, &window);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].day_index, Some(3));
        assert_eq!(parts[0].start, window.start);
        assert_eq!(parts[1].day_index, Some(4));
        assert_eq!(parts[0].total_days, Some(4));
    }

    #[test]
    fn single_day_event_outside_window_is_dropped() {
        let window = window_for_march_2026();
        let start = Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap();

        assert!(split_days(start, end, false, &window).is_empty());
    }
}
