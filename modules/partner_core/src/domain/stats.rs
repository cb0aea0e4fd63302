//! Dashboard counters, one shape per vertical family.
//!
//! Every forward-looking window is half-open in whole days: `[today, today + N)`.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::contract::model::{
    AdventureStats, BeautyStats, BusinessProfile, BusinessVertical, DashboardStats, DiningStats,
    FitnessStats, Reservation, ReservationStatus, Schedule, StayStats,
};
use crate::domain::calendar::matches_vertical;
use crate::domain::dates::{add_days, DayWindow};

pub const WEEK_DAYS: i64 = 7;
pub const ADVENTURE_WINDOW_DAYS: i64 = 14;
pub const MONTHLY_CLIENTS_LOOKBACK_DAYS: i64 = 30;

/// Derive the dashboard counters for `vertical` from the current reservation set.
/// `profile` supplies the room count for occupancy and may be absent.
pub fn compute_stats(
    vertical: BusinessVertical,
    reservations: &[Reservation],
    today: NaiveDate,
    profile: Option<&BusinessProfile>,
) -> DashboardStats {
    match vertical {
        BusinessVertical::Restaurant | BusinessVertical::Cafebar => {
            DashboardStats::Dining(dining_stats(reservations, vertical, today))
        }
        BusinessVertical::Accommodation => {
            let rooms = profile.and_then(|p| p.details.num_rooms());
            DashboardStats::Stay(stay_stats(reservations, today, rooms))
        }
        BusinessVertical::Fitness => DashboardStats::Fitness(fitness_stats(reservations, today)),
        BusinessVertical::Beauty => DashboardStats::Beauty(beauty_stats(reservations, today)),
        BusinessVertical::Adventure => {
            DashboardStats::Adventure(adventure_stats(reservations, today))
        }
    }
}

/// Mean of the non-zero ratings, one decimal; 0 when nothing is rated.
pub fn average_rating(reservations: &[Reservation]) -> f64 {
    let rated: Vec<f64> = reservations
        .iter()
        .filter_map(|r| r.rating)
        .filter(|rating| *rating != 0.0)
        .collect();
    if rated.is_empty() {
        return 0.0;
    }
    let mean = rated.iter().sum::<f64>() / rated.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn appointment_days(reservations: &[Reservation]) -> impl Iterator<Item = (&Reservation, NaiveDate)> {
    reservations.iter().filter_map(|r| match r.schedule {
        Schedule::Appointment { date, .. } => Some((r, date)),
        Schedule::Stay { .. } => None,
    })
}

fn count_pending(reservations: &[Reservation]) -> usize {
    reservations
        .iter()
        .filter(|r| r.status == ReservationStatus::Pending)
        .count()
}

fn count_active_in(reservations: &[Reservation], window: DayWindow) -> usize {
    appointment_days(reservations)
        .filter(|(r, day)| !r.is_canceled() && window.contains(*day))
        .count()
}

fn dining_stats(
    reservations: &[Reservation],
    vertical: BusinessVertical,
    today: NaiveDate,
) -> DiningStats {
    // every status counts towards today's dining total
    let today_reservations = reservations
        .iter()
        .filter(|r| matches_vertical(&r.schedule, vertical) && r.schedule.covers(today))
        .count();

    DiningStats {
        today_reservations,
        pending_reservations: count_pending(reservations),
        total_reservations: reservations.len(),
        average_rating: average_rating(reservations),
    }
}

fn stay_stats(reservations: &[Reservation], today: NaiveDate, rooms: Option<u32>) -> StayStats {
    let window = DayWindow::starting(today, WEEK_DAYS);
    let mut upcoming_check_ins = 0;
    let mut current_guests = 0;

    for r in reservations {
        let Schedule::Stay { check_in, .. } = r.schedule else {
            continue;
        };
        if !r.is_canceled() && window.contains(check_in) {
            upcoming_check_ins += 1;
        }
        if r.status == ReservationStatus::Confirmed && r.schedule.covers(today) {
            current_guests += 1;
        }
    }

    let occupancy_rate = match rooms {
        Some(rooms) if rooms > 0 => {
            (current_guests as f64 / f64::from(rooms) * 100.0).round() as u32
        }
        _ => 0,
    };

    StayStats {
        upcoming_check_ins,
        current_guests,
        total_reservations: reservations.len(),
        occupancy_rate,
    }
}

fn fitness_stats(reservations: &[Reservation], today: NaiveDate) -> FitnessStats {
    let since = add_days(today, -MONTHLY_CLIENTS_LOOKBACK_DAYS);
    let monthly_clients: HashSet<String> = appointment_days(reservations)
        .filter(|(r, day)| {
            r.status == ReservationStatus::Completed && *day >= since && *day <= today
        })
        .map(|(r, _)| client_key(r))
        .collect();

    FitnessStats {
        today_classes: count_active_in(reservations, DayWindow::starting(today, 1)),
        weekly_classes: count_active_in(reservations, DayWindow::starting(today, WEEK_DAYS)),
        monthly_clients: monthly_clients.len(),
        average_rating: average_rating(reservations),
    }
}

fn beauty_stats(reservations: &[Reservation], today: NaiveDate) -> BeautyStats {
    BeautyStats {
        today_appointments: count_active_in(reservations, DayWindow::starting(today, 1)),
        pending_appointments: count_pending(reservations),
        weekly_appointments: count_active_in(reservations, DayWindow::starting(today, WEEK_DAYS)),
        average_rating: average_rating(reservations),
    }
}

fn adventure_stats(reservations: &[Reservation], today: NaiveDate) -> AdventureStats {
    let sizes: Vec<u32> = reservations
        .iter()
        .filter_map(|r| r.num_people)
        .filter(|n| *n > 0)
        .collect();
    let average_group_size = if sizes.is_empty() {
        0
    } else {
        (sizes.iter().map(|n| f64::from(*n)).sum::<f64>() / sizes.len() as f64).round() as u32
    };

    AdventureStats {
        upcoming_activities: count_active_in(
            reservations,
            DayWindow::starting(today, ADVENTURE_WINDOW_DAYS),
        ),
        confirmed_bookings: reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Confirmed)
            .count(),
        total_bookings: reservations.len(),
        average_group_size,
    }
}

/// Identity of a client for distinct counting: account id, then email, then name.
fn client_key(r: &Reservation) -> String {
    r.client_id
        .map(|id| id.to_string())
        .or_else(|| r.client_email.as_ref().map(|e| e.trim().to_lowercase()))
        .unwrap_or_else(|| r.client_name.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::VerticalDetails;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn appt(date: NaiveDate, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            business_id: Uuid::nil(),
            status,
            client_name: "Ana".into(),
            client_phone: None,
            client_email: None,
            client_id: None,
            notes: None,
            num_people: None,
            rating: None,
            schedule: Schedule::Appointment { date, time: None },
        }
    }

    fn stay(check_in: NaiveDate, check_out: NaiveDate, status: ReservationStatus) -> Reservation {
        Reservation {
            schedule: Schedule::Stay {
                check_in,
                check_out,
            },
            ..appt(check_in, status)
        }
    }

    fn hotel(rooms: Option<u32>) -> BusinessProfile {
        BusinessProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Hotel".into(),
            description: String::new(),
            address: String::new(),
            phone_number: String::new(),
            website: None,
            location: None,
            details: VerticalDetails::Accommodation {
                accommodation_type: Some("hotel".into()),
                amenities: None,
                num_rooms: rooms,
                price_range: None,
                check_in_out: None,
            },
        }
    }

    #[test]
    fn average_rating_is_zero_without_ratings() {
        let items = vec![appt(d(1), ReservationStatus::Completed)];
        assert_eq!(average_rating(&items), 0.0);
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_rating_rounds_to_one_decimal() {
        let items: Vec<_> = [4.0, 5.0, 5.0]
            .into_iter()
            .map(|rating| Reservation {
                rating: Some(rating),
                ..appt(d(1), ReservationStatus::Completed)
            })
            .collect();
        assert_eq!(average_rating(&items), 4.7);
    }

    #[test]
    fn dining_today_counts_every_status() {
        let items = vec![
            appt(d(10), ReservationStatus::Pending),
            appt(d(10), ReservationStatus::Canceled),
            appt(d(11), ReservationStatus::Pending),
        ];
        let DashboardStats::Dining(stats) =
            compute_stats(BusinessVertical::Restaurant, &items, d(10), None)
        else {
            panic!("restaurant yields dining stats");
        };
        assert_eq!(stats.today_reservations, 2);
        assert_eq!(stats.pending_reservations, 2);
        assert_eq!(stats.total_reservations, 3);
    }

    #[test]
    fn weekly_window_is_half_open() {
        let items = vec![
            appt(d(10), ReservationStatus::Confirmed),
            appt(d(16), ReservationStatus::Confirmed),
            appt(d(17), ReservationStatus::Confirmed),
            appt(d(12), ReservationStatus::Canceled),
        ];
        let DashboardStats::Beauty(stats) =
            compute_stats(BusinessVertical::Beauty, &items, d(10), None)
        else {
            panic!("beauty yields beauty stats");
        };
        assert_eq!(stats.weekly_appointments, 2);
        assert_eq!(stats.today_appointments, 1);
    }

    #[test]
    fn occupancy_uses_confirmed_current_guests() {
        let items = vec![
            stay(d(9), d(12), ReservationStatus::Confirmed),
            stay(d(10), d(11), ReservationStatus::Pending),
            stay(d(8), d(10), ReservationStatus::Confirmed),
        ];
        let profile = hotel(Some(4));
        let DashboardStats::Stay(stats) =
            compute_stats(BusinessVertical::Accommodation, &items, d(10), Some(&profile))
        else {
            panic!("accommodation yields stay stats");
        };
        assert_eq!(stats.current_guests, 1);
        assert_eq!(stats.occupancy_rate, 25);
        assert_eq!(stats.upcoming_check_ins, 1);

        let DashboardStats::Stay(unknown) =
            compute_stats(BusinessVertical::Accommodation, &items, d(10), Some(&hotel(None)))
        else {
            panic!("accommodation yields stay stats");
        };
        assert_eq!(unknown.occupancy_rate, 0);
    }

    #[test]
    fn monthly_clients_are_distinct() {
        let client = Uuid::new_v4();
        let mut a = appt(d(5), ReservationStatus::Completed);
        a.client_id = Some(client);
        let mut b = appt(d(8), ReservationStatus::Completed);
        b.client_id = Some(client);
        let mut c = appt(d(9), ReservationStatus::Completed);
        c.client_email = Some("Iva@Example.com".into());
        let pending = appt(d(9), ReservationStatus::Pending);
        let DashboardStats::Fitness(stats) =
            compute_stats(BusinessVertical::Fitness, &[a, b, c, pending], d(10), None)
        else {
            panic!("fitness yields fitness stats");
        };
        assert_eq!(stats.monthly_clients, 2);
    }

    #[test]
    fn adventure_group_size_is_rounded_mean() {
        let items: Vec<_> = [Some(2), Some(5), None]
            .into_iter()
            .map(|n| Reservation {
                num_people: n,
                ..appt(d(20), ReservationStatus::Confirmed)
            })
            .collect();
        let DashboardStats::Adventure(stats) =
            compute_stats(BusinessVertical::Adventure, &items, d(10), None)
        else {
            panic!("adventure yields adventure stats");
        };
        assert_eq!(stats.average_group_size, 4);
        assert_eq!(stats.upcoming_activities, 3);
        assert_eq!(stats.confirmed_bookings, 3);
    }
}
