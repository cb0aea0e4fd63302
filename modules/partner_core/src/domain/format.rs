//! Display helpers for dates, phone numbers and names.

use chrono::{NaiveDate, NaiveTime};

use crate::contract::model::GeoPoint;
use crate::domain::dates::days_between;

/// `dd.mm.yyyy.`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y.").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Group a Croatian number for display: `+385 91 234 5678` or `091 234 5678`.
/// Anything else is returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with("385") && digits.len() >= 8 {
        format!("+385 {} {} {}", &digits[3..5], &digits[5..8], &digits[8..])
    } else if digits.starts_with('0') && digits.len() >= 6 {
        format!("0{} {} {}", &digits[1..3], &digits[3..6], &digits[6..])
    } else {
        phone.to_string()
    }
}

/// First letter of every word, upper-cased.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Absolute number of whole days between two dates.
pub fn days_difference(start: NaiveDate, end: NaiveDate) -> u64 {
    days_between(start, end).unsigned_abs()
}

/// WKT point as stored by the backend: longitude first.
pub fn coords_to_point(point: GeoPoint) -> String {
    format!("POINT({} {})", point.lng, point.lat)
}
