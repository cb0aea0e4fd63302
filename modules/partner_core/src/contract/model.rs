use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type BusinessId = Uuid;
pub type ReservationId = Uuid;

/// Authenticated identity as seen by the rest of the app.
/// Tokens stay inside the auth adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    pub fn display_name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(|v| v.as_str())
    }
}

/// The fixed set of business kinds the app supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessVertical {
    Restaurant,
    Cafebar,
    Accommodation,
    Fitness,
    Beauty,
    Adventure,
}

impl BusinessVertical {
    pub const ALL: [BusinessVertical; 6] = [
        BusinessVertical::Restaurant,
        BusinessVertical::Cafebar,
        BusinessVertical::Accommodation,
        BusinessVertical::Fitness,
        BusinessVertical::Beauty,
        BusinessVertical::Adventure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessVertical::Restaurant => "restaurant",
            BusinessVertical::Cafebar => "cafebar",
            BusinessVertical::Accommodation => "accommodation",
            BusinessVertical::Fitness => "fitness",
            BusinessVertical::Beauty => "beauty",
            BusinessVertical::Adventure => "adventure",
        }
    }

    /// Accommodation books date ranges; every other vertical books single days.
    pub fn is_stay_based(&self) -> bool {
        matches!(self, BusinessVertical::Accommodation)
    }

    /// Column the reservation list is ordered by.
    pub fn date_column(&self) -> &'static str {
        if self.is_stay_based() {
            "check_in_date"
        } else {
            "reservation_date"
        }
    }
}

impl fmt::Display for BusinessVertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessVertical {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| format!("unknown business vertical: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Initial map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub center: GeoPoint,
    pub lat_delta: f64,
    pub lng_delta: f64,
}

/// A confirmed location together with its human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickedLocation {
    pub point: GeoPoint,
    pub label: String,
}

/// Fields that only exist for one vertical, tagged by the `type` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerticalDetails {
    Restaurant {
        #[serde(default)]
        cuisine_type: Option<String>,
        #[serde(default)]
        capacity: Option<u32>,
        #[serde(default)]
        opening_hours: Option<String>,
    },
    Cafebar {
        #[serde(default)]
        capacity: Option<u32>,
        #[serde(default)]
        opening_hours: Option<String>,
    },
    Accommodation {
        #[serde(default)]
        accommodation_type: Option<String>,
        #[serde(default)]
        amenities: Option<String>,
        #[serde(default)]
        num_rooms: Option<u32>,
        #[serde(default)]
        price_range: Option<String>,
        #[serde(default)]
        check_in_out: Option<String>,
    },
    Fitness {
        #[serde(default)]
        fitness_type: Option<String>,
        #[serde(default)]
        classes_offered: Option<String>,
        #[serde(default)]
        opening_hours: Option<String>,
    },
    Beauty {
        #[serde(default)]
        beauty_type: Option<String>,
        #[serde(default)]
        services_offered: Option<String>,
        #[serde(default)]
        specialists: Option<String>,
        #[serde(default)]
        products: Option<String>,
        #[serde(default)]
        opening_hours: Option<String>,
    },
    Adventure {
        #[serde(default)]
        adventure_type: Option<String>,
        #[serde(default)]
        activities: Option<String>,
        #[serde(default)]
        equipment_provided: Option<String>,
        #[serde(default)]
        difficulty: Option<String>,
        #[serde(default)]
        seasonality: Option<String>,
    },
}

impl VerticalDetails {
    pub fn vertical(&self) -> BusinessVertical {
        match self {
            VerticalDetails::Restaurant { .. } => BusinessVertical::Restaurant,
            VerticalDetails::Cafebar { .. } => BusinessVertical::Cafebar,
            VerticalDetails::Accommodation { .. } => BusinessVertical::Accommodation,
            VerticalDetails::Fitness { .. } => BusinessVertical::Fitness,
            VerticalDetails::Beauty { .. } => BusinessVertical::Beauty,
            VerticalDetails::Adventure { .. } => BusinessVertical::Adventure,
        }
    }

    /// Known room capacity; only accommodation carries one.
    pub fn num_rooms(&self) -> Option<u32> {
        match self {
            VerticalDetails::Accommodation { num_rooms, .. } => *num_rooms,
            _ => None,
        }
    }

    /// The sub-type field each profile form asks for, if the vertical has one.
    pub fn kind_label(&self) -> Option<&str> {
        match self {
            VerticalDetails::Restaurant { cuisine_type, .. } => cuisine_type.as_deref(),
            VerticalDetails::Accommodation {
                accommodation_type, ..
            } => accommodation_type.as_deref(),
            VerticalDetails::Fitness { fitness_type, .. } => fitness_type.as_deref(),
            VerticalDetails::Beauty { beauty_type, .. } => beauty_type.as_deref(),
            VerticalDetails::Adventure { adventure_type, .. } => adventure_type.as_deref(),
            VerticalDetails::Cafebar { .. } => None,
        }
    }

    /// Empty details for a vertical, used as the starting point of a form.
    pub fn empty(vertical: BusinessVertical) -> Self {
        match vertical {
            BusinessVertical::Restaurant => VerticalDetails::Restaurant {
                cuisine_type: None,
                capacity: None,
                opening_hours: None,
            },
            BusinessVertical::Cafebar => VerticalDetails::Cafebar {
                capacity: None,
                opening_hours: None,
            },
            BusinessVertical::Accommodation => VerticalDetails::Accommodation {
                accommodation_type: None,
                amenities: None,
                num_rooms: None,
                price_range: None,
                check_in_out: None,
            },
            BusinessVertical::Fitness => VerticalDetails::Fitness {
                fitness_type: None,
                classes_offered: None,
                opening_hours: None,
            },
            BusinessVertical::Beauty => VerticalDetails::Beauty {
                beauty_type: None,
                services_offered: None,
                specialists: None,
                products: None,
                opening_hours: None,
            },
            BusinessVertical::Adventure => VerticalDetails::Adventure {
                adventure_type: None,
                activities: None,
                equipment_provided: None,
                difficulty: None,
                seasonality: None,
            },
        }
    }
}

/// One business owned by a user; at most one per (user, vertical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub id: BusinessId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone_number: String,
    pub website: Option<String>,
    pub location: Option<GeoPoint>,
    pub details: VerticalDetails,
}

impl BusinessProfile {
    pub fn vertical(&self) -> BusinessVertical {
        self.details.vertical()
    }
}

/// Input of the profile-creation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBusinessProfile {
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone_number: String,
    pub website: Option<String>,
    pub location: Option<GeoPoint>,
    pub details: VerticalDetails,
}

/// Partial update of the shared profile fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessProfilePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub location: Option<GeoPoint>,
}

impl BusinessProfilePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "completed" => Ok(ReservationStatus::Completed),
            // both spellings show up in existing rows
            "canceled" | "cancelled" => Ok(ReservationStatus::Canceled),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// When a reservation takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Schedule {
    /// A single day, optionally with a start time.
    Appointment {
        date: NaiveDate,
        time: Option<NaiveTime>,
    },
    /// Nights from `check_in` (inclusive) to `check_out` (exclusive).
    Stay {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

impl Schedule {
    /// The day used for ordering and tab filtering.
    pub fn anchor_date(&self) -> NaiveDate {
        match self {
            Schedule::Appointment { date, .. } => *date,
            Schedule::Stay { check_in, .. } => *check_in,
        }
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        match self {
            Schedule::Appointment { date, .. } => *date == day,
            Schedule::Stay {
                check_in,
                check_out,
            } => *check_in <= day && day < *check_out,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub business_id: BusinessId,
    pub status: ReservationStatus,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub client_email: Option<String>,
    pub client_id: Option<Uuid>,
    pub notes: Option<String>,
    pub num_people: Option<u32>,
    pub rating: Option<f64>,
    pub schedule: Schedule,
}

impl Reservation {
    pub fn is_canceled(&self) -> bool {
        self.status == ReservationStatus::Canceled
    }
}

/// One cell of the month grid. `date == None` marks leading padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub day_number: u32,
    pub date: Option<NaiveDate>,
    pub has_activity: bool,
}

impl CalendarCell {
    pub fn padding() -> Self {
        Self {
            day_number: 0,
            date: None,
            has_activity: false,
        }
    }

    pub fn is_padding(&self) -> bool {
        self.date.is_none()
    }
}

/// A calendar month, e.g. 2024-06.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructors only admit valid (year, month) pairs.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month, or `None` past the last representable date.
    pub fn next(&self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year.checked_add(1)?, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// The preceding month, or `None` before the first representable date.
    pub fn prev(&self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year.checked_sub(1)?, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if is_leap_year(self.year) => 29,
            2 => 28,
            _ => 31,
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        YearMonth::new(year, month).ok_or_else(|| format!("invalid month in '{s}'"))
    }
}

/// Reservation list tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationTab {
    Upcoming,
    Past,
    Canceled,
}

impl FromStr for ReservationTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(ReservationTab::Upcoming),
            "past" => Ok(ReservationTab::Past),
            "canceled" | "cancelled" => Ok(ReservationTab::Canceled),
            other => Err(format!("unknown tab: {other}")),
        }
    }
}

/// Dashboard counters for restaurants and cafe-bars.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DiningStats {
    pub today_reservations: usize,
    pub pending_reservations: usize,
    pub total_reservations: usize,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StayStats {
    pub upcoming_check_ins: usize,
    pub current_guests: usize,
    pub total_reservations: usize,
    /// Percent of rooms occupied today, 0 when the room count is unknown.
    pub occupancy_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FitnessStats {
    pub today_classes: usize,
    pub weekly_classes: usize,
    pub monthly_clients: usize,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BeautyStats {
    pub today_appointments: usize,
    pub pending_appointments: usize,
    pub weekly_appointments: usize,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AdventureStats {
    pub upcoming_activities: usize,
    pub confirmed_bookings: usize,
    pub total_bookings: usize,
    pub average_group_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DashboardStats {
    Dining(DiningStats),
    Stay(StayStats),
    Fitness(FitnessStats),
    Beauty(BeautyStats),
    Adventure(AdventureStats),
}

/// Everything a dashboard screen shows, derived in one pass from the
/// reservation list. Recompute it whenever the list changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub vertical: BusinessVertical,
    pub month: YearMonth,
    pub selected_day: NaiveDate,
    pub calendar: Vec<CalendarCell>,
    pub day_reservations: Vec<Reservation>,
    pub stats: DashboardStats,
}
