//! Wire rows of the backend and their mapping to domain models.

use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::contract::model::{
    BusinessProfile, BusinessProfilePatch, BusinessVertical, GeoPoint, NewBusinessProfile,
    Reservation, ReservationStatus, Schedule, Session, VerticalDetails,
};
use crate::domain::dates::parse_day;
use crate::domain::error::DataError;
use crate::domain::format::coords_to_point;

/// Auth user as returned by `/auth/v1`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl From<UserDto> for Session {
    fn from(u: UserDto) -> Self {
        Session {
            user_id: u.id,
            email: u.email.unwrap_or_default(),
            metadata: u.user_metadata,
        }
    }
}

/// Token grant response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenDto {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserDto,
}

/// Sign-up answers with a full token grant when confirmation is off, or
/// with the bare user when a confirmation email was sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpDto {
    Granted(TokenDto),
    Pending(UserDto),
}

impl SignUpDto {
    pub fn user(self) -> UserDto {
        match self {
            SignUpDto::Granted(t) => t.user,
            SignUpDto::Pending(u) => u,
        }
    }
}

// -------- businesses --------

fn str_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

fn uuid_field(row: &Map<String, Value>, key: &str, entity: &'static str) -> Result<Uuid, DataError> {
    str_field(row, key)
        .and_then(|s| Uuid::parse_str(&s).ok())
        .ok_or_else(|| DataError::malformed(entity, format!("missing or invalid `{key}`")))
}

pub fn business_from_row(row: Value) -> Result<BusinessProfile, DataError> {
    let Value::Object(map) = row else {
        return Err(DataError::malformed("business", "row is not an object"));
    };

    let id = uuid_field(&map, "id", "business")?;
    let user_id = uuid_field(&map, "user_id", "business")?;
    let location = map.get("location").and_then(parse_location);
    let details: VerticalDetails = serde_json::from_value(Value::Object(map.clone()))
        .map_err(|e| DataError::malformed("business", e.to_string()))?;

    Ok(BusinessProfile {
        id,
        user_id,
        name: str_field(&map, "name").unwrap_or_default(),
        description: str_field(&map, "description").unwrap_or_default(),
        address: str_field(&map, "address").unwrap_or_default(),
        phone_number: str_field(&map, "phone_number").unwrap_or_default(),
        website: str_field(&map, "website").filter(|w| !w.is_empty()),
        location,
        details,
    })
}

/// Insert body: shared columns, `type`, the vertical's own columns.
pub fn business_insert_body(user_id: Uuid, p: &NewBusinessProfile) -> Result<Value, DataError> {
    let mut body = match serde_json::to_value(&p.details) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => return Err(DataError::malformed("business", "unencodable details")),
    };
    body.retain(|_, v| !v.is_null());
    body.insert("user_id".into(), Value::String(user_id.to_string()));
    body.insert("name".into(), Value::String(p.name.trim().to_string()));
    body.insert("description".into(), Value::String(p.description.clone()));
    body.insert("address".into(), Value::String(p.address.clone()));
    body.insert("phone_number".into(), Value::String(p.phone_number.clone()));
    if let Some(website) = p.website.as_ref().filter(|w| !w.trim().is_empty()) {
        body.insert("website".into(), Value::String(website.clone()));
    }
    if let Some(point) = p.location {
        body.insert("location".into(), Value::String(coords_to_point(point)));
    }
    Ok(Value::Object(body))
}

pub fn business_patch_body(patch: &BusinessProfilePatch) -> Value {
    let mut body = Map::new();
    let text_fields = [
        ("name", &patch.name),
        ("description", &patch.description),
        ("address", &patch.address),
        ("phone_number", &patch.phone_number),
        ("website", &patch.website),
    ];
    for (key, value) in text_fields {
        if let Some(v) = value {
            body.insert(key.into(), Value::String(v.clone()));
        }
    }
    if let Some(point) = patch.location {
        body.insert("location".into(), Value::String(coords_to_point(point)));
    }
    Value::Object(body)
}

/// Location as stored: WKT `POINT(lng lat)`, GeoJSON, or hex (E)WKB.
pub fn parse_location(raw: &Value) -> Option<GeoPoint> {
    match raw {
        Value::String(s) => parse_wkt_point(s).or_else(|| parse_ewkb_point(s)),
        Value::Object(obj) => {
            let coords = obj.get("coordinates")?.as_array()?;
            let lng = coords.first()?.as_f64()?;
            let lat = coords.get(1)?.as_f64()?;
            Some(GeoPoint { lat, lng })
        }
        _ => None,
    }
}

fn parse_wkt_point(s: &str) -> Option<GeoPoint> {
    let s = s.trim();
    // optional "SRID=4326;" prefix
    let s = s.split_once(';').map_or(s, |(_, rest)| rest);
    let inner = s
        .strip_prefix("POINT")
        .or_else(|| s.strip_prefix("point"))?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let lng = parts.next()?.parse().ok()?;
    let lat = parts.next()?.parse().ok()?;
    Some(GeoPoint { lat, lng })
}

fn parse_ewkb_point(hex: &str) -> Option<GeoPoint> {
    let bytes = decode_hex(hex.trim())?;
    let little = *bytes.first()? == 1;
    let read_u32 = |at: usize| -> Option<u32> {
        let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
        Some(if little { u32::from_le_bytes(raw) } else { u32::from_be_bytes(raw) })
    };
    let read_f64 = |at: usize| -> Option<f64> {
        let raw: [u8; 8] = bytes.get(at..at + 8)?.try_into().ok()?;
        Some(if little { f64::from_le_bytes(raw) } else { f64::from_be_bytes(raw) })
    };

    let geometry_type = read_u32(1)?;
    if geometry_type & 0xff != 1 {
        return None;
    }
    let has_srid = geometry_type & 0x2000_0000 != 0;
    let offset = if has_srid { 9 } else { 5 };
    Some(GeoPoint {
        lng: read_f64(offset)?,
        lat: read_f64(offset + 8)?,
    })
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || s.is_empty() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

// -------- reservations --------

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRow {
    pub id: Uuid,
    pub business_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub num_people: Option<u32>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reservation_date: Option<String>,
    #[serde(default)]
    pub reservation_time: Option<String>,
    #[serde(default)]
    pub check_in_date: Option<String>,
    #[serde(default)]
    pub check_out_date: Option<String>,
}

impl ReservationRow {
    /// Map onto the domain model; the vertical decides which date columns
    /// are required.
    pub fn into_domain(self, vertical: BusinessVertical) -> Result<Reservation, DataError> {
        let status: ReservationStatus = self
            .status
            .parse()
            .map_err(|e: String| DataError::malformed("reservation", e))?;

        let schedule = if vertical.is_stay_based() {
            let check_in = self.check_in_date.as_deref().and_then(parse_day);
            let check_out = self.check_out_date.as_deref().and_then(parse_day);
            match (check_in, check_out) {
                (Some(check_in), Some(check_out)) => Schedule::Stay {
                    check_in,
                    check_out,
                },
                _ => {
                    return Err(DataError::malformed(
                        "reservation",
                        format!("{} has no usable check-in/check-out dates", self.id),
                    ))
                }
            }
        } else {
            let date = self
                .reservation_date
                .as_deref()
                .and_then(parse_day)
                .ok_or_else(|| {
                    DataError::malformed(
                        "reservation",
                        format!("{} has no usable reservation_date", self.id),
                    )
                })?;
            let time = self.reservation_time.as_deref().and_then(parse_time);
            Schedule::Appointment { date, time }
        };

        Ok(Reservation {
            id: self.id,
            business_id: self.business_id,
            status,
            client_name: self.client_name.unwrap_or_default(),
            client_phone: self.client_phone,
            client_email: self.client_email,
            client_id: self.client_id,
            notes: self.notes,
            num_people: self.num_people,
            rating: self.rating,
            schedule,
        })
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw.trim(), fmt).ok())
}
