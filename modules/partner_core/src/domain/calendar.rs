//! Month grid for the dashboard calendar.

use chrono::NaiveDate;

use crate::contract::model::{BusinessVertical, CalendarCell, Reservation, Schedule, YearMonth};
use crate::domain::dates::{add_days, sunday_first_index};

/// Build the cells of `month`: Sunday-first leading padding, then one cell per
/// day flagged when a non-canceled reservation touches it.
///
/// Accommodation reads stays as half-open `[check_in, check_out)`, every other
/// vertical matches the appointment day. No trailing padding is emitted.
pub fn generate_calendar(
    month: YearMonth,
    reservations: &[Reservation],
    vertical: BusinessVertical,
) -> Vec<CalendarCell> {
    let first = month.first_day();
    let padding = sunday_first_index(first);
    let days = month.days_in_month();

    let mut cells = Vec::with_capacity((padding + days) as usize);
    cells.extend((0..padding).map(|_| CalendarCell::padding()));

    for day_number in 1..=days {
        let date = add_days(first, i64::from(day_number) - 1);
        cells.push(CalendarCell {
            day_number,
            date: Some(date),
            has_activity: has_activity(reservations, vertical, date),
        });
    }
    cells
}

/// Whether any non-canceled reservation of the right shape covers `day`.
pub fn has_activity(reservations: &[Reservation], vertical: BusinessVertical, day: NaiveDate) -> bool {
    reservations
        .iter()
        .filter(|r| !r.is_canceled())
        .any(|r| matches_vertical(&r.schedule, vertical) && r.schedule.covers(day))
}

/// Date equality for today/selected-day highlighting.
pub fn is_same_day(cell: &CalendarCell, day: NaiveDate) -> bool {
    cell.date == Some(day)
}

pub(crate) fn matches_vertical(schedule: &Schedule, vertical: BusinessVertical) -> bool {
    match schedule {
        Schedule::Stay { .. } => vertical.is_stay_based(),
        Schedule::Appointment { .. } => !vertical.is_stay_based(),
    }
}
