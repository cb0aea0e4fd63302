use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::model::{BusinessId, Session};

/// Auth-state change pushed by the auth backend (sign-in elsewhere,
/// token refresh, remote sign-out, metadata update).
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    UserUpdated(Session),
    SignedOut,
}

impl AuthEvent {
    /// The session dependents should see after this event.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::SignedIn(s) | AuthEvent::TokenRefreshed(s) | AuthEvent::UserUpdated(s) => {
                Some(s)
            }
            AuthEvent::SignedOut => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Transport-agnostic row change on the reservations table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationChange {
    pub kind: ChangeKind,
    pub business_id: BusinessId,
    #[serde(default)]
    pub reservation_id: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}
