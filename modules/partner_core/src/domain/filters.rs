//! List filters for the reservations screen and the dashboard day list.
//! Inputs are never mutated; each call returns a fresh, owned selection.

use chrono::NaiveDate;

use crate::contract::model::{BusinessVertical, Reservation, ReservationStatus, ReservationTab};
use crate::domain::calendar::matches_vertical;

/// Select and order reservations for a tab, pivoting on `today`.
///
/// - upcoming: not canceled and dated today or later, oldest first
/// - past: dated before today or already completed, newest first
/// - canceled: status only, newest first
pub fn filter_by_tab(
    reservations: &[Reservation],
    tab: ReservationTab,
    today: NaiveDate,
) -> Vec<Reservation> {
    let keep = |r: &Reservation| {
        let date = r.schedule.anchor_date();
        match tab {
            ReservationTab::Upcoming => !r.is_canceled() && date >= today,
            ReservationTab::Past => date < today || r.status == ReservationStatus::Completed,
            ReservationTab::Canceled => r.is_canceled(),
        }
    };

    let mut selected: Vec<Reservation> = reservations.iter().filter(|r| keep(r)).cloned().collect();
    match tab {
        ReservationTab::Upcoming => selected.sort_by_key(|r| r.schedule.anchor_date()),
        ReservationTab::Past | ReservationTab::Canceled => {
            selected.sort_by(|a, b| b.schedule.anchor_date().cmp(&a.schedule.anchor_date()))
        }
    }
    selected
}

/// Reservations taking place on `day`: the appointment day, or a stay whose
/// nights include it. Canceled entries stay in the list so they can be shown.
pub fn filter_by_day(
    reservations: &[Reservation],
    vertical: BusinessVertical,
    day: NaiveDate,
) -> Vec<Reservation> {
    reservations
        .iter()
        .filter(|r| matches_vertical(&r.schedule, vertical) && r.schedule.covers(day))
        .cloned()
        .collect()
}
