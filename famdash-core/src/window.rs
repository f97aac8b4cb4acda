//! The fixed viewing window for event expansion.

use chrono::{DateTime, Duration, Months, Utc};

/// Time range within which occurrences are enumerated and instances kept:
/// one week back (from midnight) to two months ahead (end of day).
///
/// Built from an explicit reference instant rather than the wall clock so
/// expansion stays deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The dashboard window around `now`.
    pub fn around(now: DateTime<Utc>) -> Self {
        let start = (now - Duration::days(7))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let end = (now + Months::new(2))
            .date_naive()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap()
            .and_utc();

        Window { start, end }
    }

    /// Inclusive containment test applied to every emitted instance start.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_spans_one_week_back_to_two_months_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap();
        let window = Window::around(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap());
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2026, 5, 15, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn containment_is_inclusive_at_both_edges() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap();
        let window = Window::around(now);

        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
    }

    #[test]
    fn month_arithmetic_clamps_at_short_months() {
        // Dec 31 + 2 months clamps to the end of February.
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 10, 0, 0).unwrap();
        let window = Window::around(now);

        assert_eq!(window.end.date_naive(), chrono::NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }
}
