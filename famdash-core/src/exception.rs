//! Exception-date filtering for recurring events.

use chrono::{DateTime, Utc};

/// True when an occurrence start falls on the same calendar day as any
/// declared exception date.
///
/// Matching is by day, not exact instant: feeds routinely emit EXDATE
/// values whose time-of-day differs from the occurrence (all-day masters,
/// zone-shifted exports), and an exception anywhere on a day is meant to
/// suppress that whole day's occurrence.
pub fn is_excluded(occurrence_start: DateTime<Utc>, exception_dates: &[DateTime<Utc>]) -> bool {
    exception_dates
        .iter()
        .any(|exception| exception.date_naive() == occurrence_start.date_naive())
}
