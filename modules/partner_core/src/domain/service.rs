use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{
    BusinessProfile, BusinessProfilePatch, BusinessVertical, CalendarCell, DashboardStats,
    DashboardView, GeoPoint, NewBusinessProfile, PickedLocation, Region, Reservation,
    ReservationId, ReservationStatus, ReservationTab, Session, YearMonth,
};
use crate::domain::business::BusinessProfileStore;
use crate::domain::calendar::generate_calendar;
use crate::domain::error::{DataError, DomainError, ValidationError};
use crate::domain::filters::{filter_by_day, filter_by_tab};
use crate::domain::ports::LocationPicker;
use crate::domain::reservations::ReservationRepository;
use crate::domain::session::SessionStore;
use crate::domain::stats::compute_stats;
use crate::domain::validation::{validate_email, validate_password, validate_required};

/// Orchestrates the stores so that cross-store ordering holds: the
/// reservation repository is always torn down before the business it
/// belongs to changes, and activated only once the new profile is known.
#[derive(Clone)]
pub struct Service {
    session: Arc<SessionStore>,
    business: Arc<BusinessProfileStore>,
    reservations: ReservationRepository,
    locations: Arc<dyn LocationPicker>,
}

impl Service {
    pub fn new(
        session: Arc<SessionStore>,
        business: Arc<BusinessProfileStore>,
        reservations: ReservationRepository,
        locations: Arc<dyn LocationPicker>,
    ) -> Self {
        Self {
            session,
            business,
            reservations,
            locations,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn business(&self) -> &Arc<BusinessProfileStore> {
        &self.business
    }

    pub fn reservations(&self) -> &ReservationRepository {
        &self.reservations
    }

    /// Restore the previous session and selection, then start streaming
    /// reservations if a business is known.
    #[instrument(name = "partner_core.service.start", skip(self))]
    pub async fn start(&self) -> Result<(), DomainError> {
        if self.session.restore().await.is_none() {
            debug!("No stored session, waiting for sign-in");
            return Ok(());
        }
        self.business.load_vertical().await?;
        self.activate_current().await
    }

    #[instrument(name = "partner_core.service.register", skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, DomainError> {
        let mut errors = Vec::new();
        if let Err(e) = validate_required("name", Some(name)) {
            errors.push(("name".to_string(), e));
        }
        if let Err(e) = validate_email(email) {
            errors.push(("email".to_string(), e));
        }
        if let Err(e) = validate_password(password) {
            errors.push(("password".to_string(), e));
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        Ok(self.session.sign_up(email.trim(), password, name.trim()).await?)
    }

    #[instrument(name = "partner_core.service.sign_in", skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(DomainError::validation(
                "email",
                ValidationError::required("email and password"),
            ));
        }
        let session = self.session.sign_in(email.trim(), password).await?;
        if self.business.vertical().is_some() {
            self.business.load_profile().await?;
        } else {
            self.business.load_vertical().await?;
        }
        self.activate_current().await?;
        Ok(session)
    }

    #[instrument(name = "partner_core.service.sign_out", skip(self))]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.reservations.deactivate();
        self.business.forget_profile();
        Ok(self.session.sign_out().await?)
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), DomainError> {
        validate_email(email).map_err(|e| DomainError::validation("email", e))?;
        Ok(self.session.reset_password(email.trim()).await?)
    }

    pub async fn update_account(
        &self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), DomainError> {
        Ok(self.session.update_profile(metadata).await?)
    }

    /// Switch verticals. Reservations of the old business are dropped and
    /// its subscription closed before the new profile is requested.
    #[instrument(name = "partner_core.service.select_vertical", skip(self), fields(vertical = %vertical))]
    pub async fn select_vertical(
        &self,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, DomainError> {
        self.reservations.deactivate();
        let profile = match self.business.set_vertical(vertical).await {
            Ok(profile) => profile,
            Err(e) => {
                // the store rolled back; follow the restored profile again
                if let Some(previous) = self.business.profile() {
                    if let Err(reactivate) = self.reservations.activate(&previous).await {
                        warn!(error = %reactivate, "Reloading reservations of the previous business failed");
                    }
                }
                return Err(e);
            }
        };
        match &profile {
            Some(p) => self.reservations.activate(p).await?,
            None => info!("No business registered for this vertical yet"),
        }
        Ok(profile)
    }

    #[instrument(name = "partner_core.service.clear_vertical", skip(self))]
    pub async fn clear_vertical(&self) -> Result<(), DomainError> {
        self.reservations.deactivate();
        self.business.clear_profile().await
    }

    pub async fn create_business(
        &self,
        profile: NewBusinessProfile,
    ) -> Result<BusinessProfile, DomainError> {
        self.reservations.deactivate();
        let created = self.business.create_profile(profile).await?;
        self.reservations.activate(&created).await?;
        Ok(created)
    }

    pub async fn update_business(
        &self,
        patch: BusinessProfilePatch,
    ) -> Result<BusinessProfile, DomainError> {
        self.business.update_profile(patch).await
    }

    pub async fn refresh_reservations(&self) -> Result<(), DomainError> {
        Ok(self.reservations.refresh().await?)
    }

    pub async fn set_reservation_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), DomainError> {
        Ok(self.reservations.update_status(id, status).await?)
    }

    pub fn reservations_by_tab(&self, tab: ReservationTab, today: NaiveDate) -> Vec<Reservation> {
        filter_by_tab(&self.reservations.snapshot().items, tab, today)
    }

    pub fn reservations_on(&self, day: NaiveDate) -> Result<Vec<Reservation>, DomainError> {
        let vertical = self.active_vertical()?;
        Ok(filter_by_day(&self.reservations.snapshot().items, vertical, day))
    }

    pub fn calendar(&self, month: YearMonth) -> Result<Vec<CalendarCell>, DomainError> {
        let vertical = self.active_vertical()?;
        Ok(generate_calendar(
            month,
            &self.reservations.snapshot().items,
            vertical,
        ))
    }

    pub fn stats(&self, today: NaiveDate) -> Result<DashboardStats, DomainError> {
        let vertical = self.active_vertical()?;
        let profile = self.business.profile();
        Ok(compute_stats(
            vertical,
            &self.reservations.snapshot().items,
            today,
            profile.as_ref(),
        ))
    }

    pub fn dashboard(
        &self,
        month: YearMonth,
        selected_day: NaiveDate,
        today: NaiveDate,
    ) -> Result<DashboardView, DomainError> {
        let vertical = self.active_vertical()?;
        let profile = self.business.profile();
        Ok(DashboardView::derive(
            vertical,
            &self.reservations.snapshot().items,
            profile.as_ref(),
            month,
            selected_day,
            today,
        ))
    }

    pub fn default_region(&self) -> Region {
        self.locations.default_region()
    }

    pub async fn pick_location(&self, point: GeoPoint) -> PickedLocation {
        self.locations.pick(point).await
    }

    /// Follow an auth-state change pushed by the backend. A remote sign-out
    /// drops the business data the same way a local one does.
    pub fn on_session_changed(&self, session: Option<&Session>) {
        if session.is_none() && self.reservations.active_business().is_some() {
            info!("Signed out remotely, dropping business data");
            self.reservations.deactivate();
            self.business.forget_profile();
        }
    }

    async fn activate_current(&self) -> Result<(), DomainError> {
        let Some(profile) = self.business.profile() else {
            return Ok(());
        };
        if self.reservations.active_business().map(|(id, _)| id) == Some(profile.id) {
            return Ok(());
        }
        self.reservations.activate(&profile).await?;
        Ok(())
    }

    fn active_vertical(&self) -> Result<BusinessVertical, DomainError> {
        self.reservations
            .active_business()
            .map(|(_, v)| v)
            .ok_or(DataError::NoActiveBusiness.into())
    }
}
