use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{
    BusinessProfile, BusinessProfilePatch, BusinessVertical, NewBusinessProfile, Session,
};
use crate::domain::error::{AuthError, DataError, DomainError};
use crate::domain::ports::{BusinessesTable, KeyValueStore};
use crate::domain::validation::ensure_valid;

/// Local storage key of the selected vertical.
pub const VERTICAL_KEY: &str = "businessType";

const PROFILE_REQUIRED: [&str; 3] = ["name", "address", "phone_number"];

/// Selected vertical plus the profile loaded for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub vertical: Option<BusinessVertical>,
    pub profile: Option<BusinessProfile>,
    pub loading: bool,
}

/// Active business selection for the signed-in user.
///
/// Every switch or clear bumps a generation counter; a profile lookup that
/// finishes after a newer switch is discarded instead of applied.
pub struct BusinessProfileStore {
    table: Arc<dyn BusinessesTable>,
    kv: Arc<dyn KeyValueStore>,
    session: watch::Receiver<Option<Session>>,
    state: watch::Sender<ProfileState>,
    generation: AtomicU64,
}

impl BusinessProfileStore {
    pub fn new(
        table: Arc<dyn BusinessesTable>,
        kv: Arc<dyn KeyValueStore>,
        session: watch::Receiver<Option<Session>>,
    ) -> Self {
        let (state, _) = watch::channel(ProfileState::default());
        Self {
            table,
            kv,
            session,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ProfileState {
        self.state.borrow().clone()
    }

    pub fn vertical(&self) -> Option<BusinessVertical> {
        self.state.borrow().vertical
    }

    pub fn profile(&self) -> Option<BusinessProfile> {
        self.state.borrow().profile.clone()
    }

    /// Read the persisted vertical and load its profile. Nothing is loaded
    /// when no vertical was ever chosen.
    #[instrument(name = "partner_core.business.load_vertical", skip(self))]
    pub async fn load_vertical(&self) -> Result<Option<BusinessVertical>, DomainError> {
        let stored = self
            .kv
            .get(VERTICAL_KEY)
            .await
            .map_err(|e| DataError::local(format!("{e:#}")))?;

        let vertical = match stored.as_deref().map(str::parse::<BusinessVertical>) {
            None => {
                debug!("No vertical persisted yet");
                return Ok(None);
            }
            Some(Err(e)) => {
                warn!(error = %e, "Ignoring unreadable persisted vertical");
                return Ok(None);
            }
            Some(Ok(v)) => v,
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            if s.vertical != Some(vertical) {
                s.profile = None;
            }
            s.vertical = Some(vertical);
        });
        self.load_profile().await?;
        Ok(Some(vertical))
    }

    /// Switch verticals: the old profile is dropped before anything else
    /// happens, then the tag is persisted and the new profile loaded.
    ///
    /// When the tag cannot be persisted the previous selection is restored,
    /// so memory never disagrees with what the next start will load.
    #[instrument(name = "partner_core.business.set_vertical", skip(self), fields(vertical = %vertical))]
    pub async fn set_vertical(
        &self,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, DomainError> {
        let previous = self.snapshot();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.vertical = Some(vertical);
            s.profile = None;
        });

        if let Err(e) = self.kv.set(VERTICAL_KEY, vertical.as_str()).await {
            warn!(error = %format!("{e:#}"), "Persisting the vertical failed, keeping the previous selection");
            if self.generation.load(Ordering::SeqCst) == generation {
                self.state.send_replace(previous);
            }
            return Err(DataError::local(format!("{e:#}")).into());
        }
        info!("Business vertical selected");

        self.load_profile().await
    }

    /// Look up the profile for (signed-in user, selected vertical).
    /// A missing row is `Ok(None)`, not an error.
    #[instrument(name = "partner_core.business.load_profile", skip(self))]
    pub async fn load_profile(&self) -> Result<Option<BusinessProfile>, DomainError> {
        let Some(vertical) = self.vertical() else {
            return Ok(None);
        };
        let Some(user_id) = self.user_id() else {
            debug!("Not signed in, skipping profile lookup");
            return Ok(None);
        };

        let generation = self.generation.load(Ordering::SeqCst);
        self.state.send_modify(|s| s.loading = true);

        let result = self.table.find_for_user(user_id, vertical).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding profile lookup superseded by a newer selection");
            return Ok(self.profile());
        }

        match result {
            Ok(profile) => {
                debug!(found = profile.is_some(), "Profile lookup finished");
                self.state.send_modify(|s| {
                    s.profile = profile.clone();
                    s.loading = false;
                });
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Profile lookup failed");
                self.state.send_modify(|s| s.loading = false);
                Err(e.into())
            }
        }
    }

    /// Forget the selection: tag removed, vertical and profile cleared together.
    #[instrument(name = "partner_core.business.clear_profile", skip(self))]
    pub async fn clear_profile(&self) -> Result<(), DomainError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(ProfileState::default());
        self.kv
            .remove(VERTICAL_KEY)
            .await
            .map_err(|e| DataError::local(format!("{e:#}")))?;
        info!("Business selection cleared");
        Ok(())
    }

    /// Drop the loaded profile but keep the persisted vertical, e.g. on sign-out.
    pub fn forget_profile(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.profile = None;
            s.loading = false;
        });
    }

    /// Insert a new business for the signed-in user and make it active.
    #[instrument(
        name = "partner_core.business.create_profile",
        skip(self, new_profile),
        fields(vertical = %new_profile.details.vertical(), name = %new_profile.name)
    )]
    pub async fn create_profile(
        &self,
        new_profile: NewBusinessProfile,
    ) -> Result<BusinessProfile, DomainError> {
        let website = new_profile.website.clone().unwrap_or_default();
        ensure_valid(
            &[
                ("name", new_profile.name.as_str()),
                ("address", new_profile.address.as_str()),
                ("phone_number", new_profile.phone_number.as_str()),
                ("website", website.as_str()),
            ],
            &PROFILE_REQUIRED,
        )?;
        let user_id = self.user_id().ok_or(AuthError::NotSignedIn)?;
        let vertical = new_profile.details.vertical();

        let created = self.table.insert(user_id, &new_profile).await?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(ProfileState {
            vertical: Some(vertical),
            profile: Some(created.clone()),
            loading: false,
        });
        self.kv
            .set(VERTICAL_KEY, vertical.as_str())
            .await
            .map_err(|e| DataError::local(format!("{e:#}")))?;
        info!(business_id = %created.id, "Business profile created");
        Ok(created)
    }

    /// Patch the shared fields of the active profile.
    #[instrument(name = "partner_core.business.update_profile", skip(self, patch))]
    pub async fn update_profile(
        &self,
        patch: BusinessProfilePatch,
    ) -> Result<BusinessProfile, DomainError> {
        let current = self.profile().ok_or(DataError::NoActiveBusiness)?;
        if patch.is_empty() {
            return Ok(current);
        }

        // only the fields being changed are checked; blanking a required one fails
        let mut fields: Vec<(&str, &str)> = Vec::new();
        let mut required: Vec<&str> = Vec::new();
        for (name, value) in [
            ("name", &patch.name),
            ("address", &patch.address),
            ("phone_number", &patch.phone_number),
        ] {
            if let Some(v) = value {
                fields.push((name, v.as_str()));
                required.push(name);
            }
        }
        if let Some(website) = &patch.website {
            fields.push(("website", website.as_str()));
        }
        ensure_valid(&fields, &required)?;

        let generation = self.generation.load(Ordering::SeqCst);
        let updated = self.table.update(current.id, &patch).await?;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.state.send_modify(|s| s.profile = Some(updated.clone()));
        }
        info!(business_id = %updated.id, "Business profile updated");
        Ok(updated)
    }

    fn user_id(&self) -> Option<uuid::Uuid> {
        self.session.borrow().as_ref().map(|s| s.user_id)
    }
}
