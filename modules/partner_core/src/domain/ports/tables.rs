use async_trait::async_trait;

use crate::contract::model::{
    BusinessId, BusinessProfile, BusinessProfilePatch, BusinessVertical, NewBusinessProfile,
    Reservation, ReservationId, ReservationStatus, UserId,
};
use crate::domain::error::DataError;

/// Port for the `businesses` table.
#[async_trait]
pub trait BusinessesTable: Send + Sync {
    /// The unique profile of `user_id` for `vertical`. "No rows" is `Ok(None)`.
    async fn find_for_user(
        &self,
        user_id: UserId,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, DataError>;
    async fn insert(
        &self,
        user_id: UserId,
        profile: &NewBusinessProfile,
    ) -> Result<BusinessProfile, DataError>;
    async fn update(
        &self,
        id: BusinessId,
        patch: &BusinessProfilePatch,
    ) -> Result<BusinessProfile, DataError>;
}

/// Port for the `reservations` table.
#[async_trait]
pub trait ReservationsTable: Send + Sync {
    /// Every reservation of a business, ordered ascending by the vertical's date column.
    async fn list_for_business(
        &self,
        business_id: BusinessId,
        vertical: BusinessVertical,
    ) -> Result<Vec<Reservation>, DataError>;
    async fn update_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), DataError>;
}
