//! Day-granular date helpers. Everything here works on calendar days
//! (local midnight), never on elapsed time, so DST shifts cannot move a
//! reservation across a day boundary.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime};

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

pub fn add_days(day: NaiveDate, days: i64) -> NaiveDate {
    day.checked_add_signed(Duration::days(days)).unwrap_or(day)
}

/// Column index of `day` in a Sunday-first week (Sunday = 0).
pub fn sunday_first_index(day: NaiveDate) -> u32 {
    day.weekday().num_days_from_sunday()
}

/// Half-open window of whole days: `[start, start + len_days)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    start: NaiveDate,
    len_days: i64,
}

impl DayWindow {
    pub fn starting(start: NaiveDate, len_days: i64) -> Self {
        Self { start, len_days }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        let offset = days_between(self.start, day);
        (0..self.len_days).contains(&offset)
    }
}

/// Parse a date column value and truncate it to its local calendar day.
///
/// Accepts `YYYY-MM-DD`, naive `YYYY-MM-DDTHH:MM:SS` (taken as local) and
/// RFC 3339 timestamps (converted to local time first).
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local).date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
