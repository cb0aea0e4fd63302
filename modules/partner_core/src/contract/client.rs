use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;

use crate::contract::{
    error::PartnerDeskError,
    model::{
        BusinessProfile, BusinessProfilePatch, BusinessVertical, CalendarCell, DashboardStats,
        DashboardView,
        GeoPoint, NewBusinessProfile, PickedLocation, Region, Reservation, ReservationId,
        ReservationStatus, ReservationTab, Session, YearMonth,
    },
};

/// Public API of the partner desk that screens and tools depend on.
#[async_trait]
pub trait PartnerDeskApi: Send + Sync {
    /// Create an account. Does not sign the new user in.
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, PartnerDeskError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, PartnerDeskError>;

    /// Always signs out locally; a remote failure is still reported.
    async fn sign_out(&self) -> Result<(), PartnerDeskError>;

    async fn reset_password(&self, email: &str) -> Result<(), PartnerDeskError>;

    /// Merge fields into the signed-in user's metadata.
    async fn update_account(
        &self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), PartnerDeskError>;

    fn current_session(&self) -> Option<Session>;

    /// Switch to another vertical and load (and activate) its business.
    async fn select_vertical(
        &self,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, PartnerDeskError>;

    async fn clear_vertical(&self) -> Result<(), PartnerDeskError>;

    fn current_vertical(&self) -> Option<BusinessVertical>;

    fn business_profile(&self) -> Option<BusinessProfile>;

    async fn create_business(
        &self,
        profile: NewBusinessProfile,
    ) -> Result<BusinessProfile, PartnerDeskError>;

    async fn update_business(
        &self,
        patch: BusinessProfilePatch,
    ) -> Result<BusinessProfile, PartnerDeskError>;

    /// Re-fetch the reservations of the active business.
    async fn refresh_reservations(&self) -> Result<(), PartnerDeskError>;

    fn reservations(&self) -> Arc<Vec<Reservation>>;

    /// Reservation lists as they change, starting with the current one.
    fn watch_reservations(&self) -> BoxStream<'static, Arc<Vec<Reservation>>>;

    fn reservations_by_tab(&self, tab: ReservationTab, today: NaiveDate) -> Vec<Reservation>;

    fn reservations_on(&self, day: NaiveDate) -> Result<Vec<Reservation>, PartnerDeskError>;

    fn calendar(&self, month: YearMonth) -> Result<Vec<CalendarCell>, PartnerDeskError>;

    fn stats(&self, today: NaiveDate) -> Result<DashboardStats, PartnerDeskError>;

    fn dashboard(
        &self,
        month: YearMonth,
        selected_day: NaiveDate,
        today: NaiveDate,
    ) -> Result<DashboardView, PartnerDeskError>;

    async fn set_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), PartnerDeskError>;

    fn default_region(&self) -> Region;

    async fn pick_location(&self, point: GeoPoint) -> PickedLocation;
}
