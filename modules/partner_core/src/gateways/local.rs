use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::contract::{
    client::PartnerDeskApi,
    error::PartnerDeskError,
    model::{
        BusinessProfile, BusinessProfilePatch, BusinessVertical, CalendarCell, DashboardStats,
        DashboardView, GeoPoint, NewBusinessProfile, PickedLocation, Region, Reservation,
        ReservationId, ReservationStatus, ReservationTab, Session, YearMonth,
    },
};
use crate::domain::service::Service;

/// In-process implementation of [`PartnerDeskApi`] delegating to the domain service.
pub struct PartnerDeskLocalClient {
    service: Arc<Service>,
}

impl PartnerDeskLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl PartnerDeskApi for PartnerDeskLocalClient {
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, PartnerDeskError> {
        self.service
            .register(email, password, name)
            .await
            .map_err(Into::into)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, PartnerDeskError> {
        self.service.sign_in(email, password).await.map_err(Into::into)
    }

    async fn sign_out(&self) -> Result<(), PartnerDeskError> {
        self.service.sign_out().await.map_err(Into::into)
    }

    async fn reset_password(&self, email: &str) -> Result<(), PartnerDeskError> {
        self.service.reset_password(email).await.map_err(Into::into)
    }

    async fn update_account(
        &self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), PartnerDeskError> {
        self.service
            .update_account(metadata)
            .await
            .map_err(Into::into)
    }

    fn current_session(&self) -> Option<Session> {
        self.service.session().current()
    }

    async fn select_vertical(
        &self,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, PartnerDeskError> {
        self.service
            .select_vertical(vertical)
            .await
            .map_err(Into::into)
    }

    async fn clear_vertical(&self) -> Result<(), PartnerDeskError> {
        self.service.clear_vertical().await.map_err(Into::into)
    }

    fn current_vertical(&self) -> Option<BusinessVertical> {
        self.service.business().vertical()
    }

    fn business_profile(&self) -> Option<BusinessProfile> {
        self.service.business().profile()
    }

    async fn create_business(
        &self,
        profile: NewBusinessProfile,
    ) -> Result<BusinessProfile, PartnerDeskError> {
        self.service
            .create_business(profile)
            .await
            .map_err(Into::into)
    }

    async fn update_business(
        &self,
        patch: BusinessProfilePatch,
    ) -> Result<BusinessProfile, PartnerDeskError> {
        self.service.update_business(patch).await.map_err(Into::into)
    }

    async fn refresh_reservations(&self) -> Result<(), PartnerDeskError> {
        self.service.refresh_reservations().await.map_err(Into::into)
    }

    fn reservations(&self) -> Arc<Vec<Reservation>> {
        self.service.reservations().snapshot().items
    }

    fn watch_reservations(&self) -> BoxStream<'static, Arc<Vec<Reservation>>> {
        WatchStream::new(self.service.reservations().subscribe())
            .map(|snapshot| snapshot.items)
            .boxed()
    }

    fn reservations_by_tab(&self, tab: ReservationTab, today: NaiveDate) -> Vec<Reservation> {
        self.service.reservations_by_tab(tab, today)
    }

    fn reservations_on(&self, day: NaiveDate) -> Result<Vec<Reservation>, PartnerDeskError> {
        self.service.reservations_on(day).map_err(Into::into)
    }

    fn calendar(&self, month: YearMonth) -> Result<Vec<CalendarCell>, PartnerDeskError> {
        self.service.calendar(month).map_err(Into::into)
    }

    fn stats(&self, today: NaiveDate) -> Result<DashboardStats, PartnerDeskError> {
        self.service.stats(today).map_err(Into::into)
    }

    fn dashboard(
        &self,
        month: YearMonth,
        selected_day: NaiveDate,
        today: NaiveDate,
    ) -> Result<DashboardView, PartnerDeskError> {
        self.service
            .dashboard(month, selected_day, today)
            .map_err(Into::into)
    }

    async fn set_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), PartnerDeskError> {
        self.service
            .set_reservation_status(id, status)
            .await
            .map_err(Into::into)
    }

    fn default_region(&self) -> Region {
        self.service.default_region()
    }

    async fn pick_location(&self, point: GeoPoint) -> PickedLocation {
        self.service.pick_location(point).await
    }
}
