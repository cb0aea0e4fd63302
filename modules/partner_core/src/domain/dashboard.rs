use chrono::NaiveDate;

use crate::contract::model::{
    BusinessProfile, BusinessVertical, DashboardView, Reservation, YearMonth,
};
use crate::domain::calendar::generate_calendar;
use crate::domain::filters::filter_by_day;
use crate::domain::stats::compute_stats;

impl DashboardView {
    pub fn derive(
        vertical: BusinessVertical,
        reservations: &[Reservation],
        profile: Option<&BusinessProfile>,
        month: YearMonth,
        selected_day: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        Self {
            vertical,
            month,
            selected_day,
            calendar: generate_calendar(month, reservations, vertical),
            day_reservations: filter_by_day(reservations, vertical, selected_day),
            stats: compute_stats(vertical, reservations, today, profile),
        }
    }
}
