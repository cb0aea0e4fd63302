#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use partner_core::config::{LocationPickerKind, PartnerCoreConfig, RealtimeMode};
use partner_core::domain::error::{AuthError, DataError};
use partner_core::domain::events::{AuthEvent, ChangeKind, ReservationChange};
use partner_core::domain::ports::{
    AuthBackend, BusinessesTable, EventPublisher, KeyValueStore, ReservationsTable,
};
use partner_core::infra::location::StaticLocationPicker;
use partner_core::infra::realtime::BroadcastRealtime;
use partner_core::infra::storage::MemoryKeyValueStore;
use partner_core::model::{
    BusinessId, BusinessProfile, BusinessProfilePatch, BusinessVertical, NewBusinessProfile,
    Reservation, ReservationId, ReservationStatus, Schedule, Session, UserId, VerticalDetails,
};
use partner_core::{PartnerDesk, Ports};

pub const PASSWORD: &str = "secret123";

// -------- auth --------

#[derive(Default)]
pub struct FakeAuth {
    accounts: Mutex<HashMap<String, (String, Session)>>,
    current: Mutex<Option<Session>>,
    events: Mutex<Option<broadcast::Sender<AuthEvent>>>,
    pub fail_sign_out: AtomicBool,
    pub reset_requests: Mutex<Vec<(String, String)>>,
}

impl FakeAuth {
    /// Account that can sign in with [`PASSWORD`].
    pub fn add_account(&self, email: &str) -> Session {
        let session = Session {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            metadata: serde_json::Map::new(),
        };
        self.accounts
            .lock()
            .insert(email.to_string(), (PASSWORD.to_string(), session.clone()));
        session
    }

    /// Pretend a session survived from an earlier run.
    pub fn preload_session(&self, session: Session) {
        *self.current.lock() = Some(session);
    }

    /// Push an auth-state change as if it came from the server.
    pub fn emit(&self, event: AuthEvent) {
        *self.current.lock() = event.session().cloned();
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    fn sender(&self) -> broadcast::Sender<AuthEvent> {
        self.events
            .lock()
            .get_or_insert_with(|| broadcast::channel(16).0)
            .clone()
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session, AuthError> {
        let mut accounts = self.accounts.lock();
        if accounts.contains_key(email) {
            return Err(AuthError::DuplicateAccount {
                email: email.to_string(),
            });
        }
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".into(), serde_json::Value::String(name.to_string()));
        let session = Session {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            metadata,
        };
        accounts.insert(email.to_string(), (password.to_string(), session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let found = self.accounts.lock().get(email).cloned();
        match found {
            Some((expected, session)) if expected == password => {
                *self.current.lock() = Some(session.clone());
                Ok(session)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.current.lock() = None;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::unexpected("logout endpoint unavailable"));
        }
        Ok(())
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        self.reset_requests
            .lock()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn update_user(
        &self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AuthError> {
        let mut current = self.current.lock();
        let session = current.as_mut().ok_or(AuthError::NotSignedIn)?;
        session.metadata.extend(metadata);
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.current.lock().clone()
    }

    fn auth_events(&self) -> BoxStream<'static, AuthEvent> {
        BroadcastStream::new(self.sender().subscribe())
            .filter_map(|res| async move { res.ok() })
            .boxed()
    }
}

// -------- businesses --------

#[derive(Default)]
pub struct FakeBusinesses {
    rows: Mutex<Vec<BusinessProfile>>,
    delays: Mutex<HashMap<BusinessVertical, Duration>>,
    pub lookups: AtomicUsize,
}

impl FakeBusinesses {
    pub fn add(&self, user_id: UserId, vertical: BusinessVertical, name: &str) -> BusinessProfile {
        let profile = BusinessProfile {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            description: String::new(),
            address: "Ilica 1, Zagreb".to_string(),
            phone_number: "385911234567".to_string(),
            website: None,
            location: None,
            details: VerticalDetails::empty(vertical),
        };
        self.rows.lock().push(profile.clone());
        profile
    }

    pub fn add_profile(&self, profile: BusinessProfile) {
        self.rows.lock().push(profile);
    }

    /// Make lookups for `vertical` take `delay`.
    pub fn delay(&self, vertical: BusinessVertical, delay: Duration) {
        self.delays.lock().insert(vertical, delay);
    }

    pub fn all(&self) -> Vec<BusinessProfile> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl BusinessesTable for FakeBusinesses {
    async fn find_for_user(
        &self,
        user_id: UserId,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, DataError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().get(&vertical).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|p| p.user_id == user_id && p.vertical() == vertical)
            .cloned())
    }

    async fn insert(
        &self,
        user_id: UserId,
        profile: &NewBusinessProfile,
    ) -> Result<BusinessProfile, DataError> {
        let created = BusinessProfile {
            id: Uuid::new_v4(),
            user_id,
            name: profile.name.clone(),
            description: profile.description.clone(),
            address: profile.address.clone(),
            phone_number: profile.phone_number.clone(),
            website: profile.website.clone(),
            location: profile.location,
            details: profile.details.clone(),
        };
        self.rows.lock().push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: BusinessId,
        patch: &BusinessProfilePatch,
    ) -> Result<BusinessProfile, DataError> {
        let mut rows = self.rows.lock();
        let row = rows.iter_mut().find(|p| p.id == id).ok_or(DataError::NotFound {
            entity: "business",
            id,
        })?;
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(description) = &patch.description {
            row.description = description.clone();
        }
        if let Some(address) = &patch.address {
            row.address = address.clone();
        }
        if let Some(phone) = &patch.phone_number {
            row.phone_number = phone.clone();
        }
        if let Some(website) = &patch.website {
            row.website = Some(website.clone());
        }
        if patch.location.is_some() {
            row.location = patch.location;
        }
        Ok(row.clone())
    }
}

// -------- reservations --------

#[derive(Default)]
pub struct FakeReservations {
    rows: Mutex<Vec<Reservation>>,
    pub list_calls: Mutex<Vec<BusinessId>>,
    pub fail_list: AtomicBool,
    pub fail_updates: AtomicBool,
    update_delay: Mutex<Duration>,
    list_delay: Mutex<Duration>,
}

impl FakeReservations {
    pub fn insert(&self, reservation: Reservation) {
        self.rows.lock().push(reservation);
    }

    pub fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock() = delay;
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = delay;
    }

    pub fn list_count_for(&self, business_id: BusinessId) -> usize {
        self.list_calls
            .lock()
            .iter()
            .filter(|id| **id == business_id)
            .count()
    }

    pub fn status_of(&self, id: ReservationId) -> Option<ReservationStatus> {
        self.rows.lock().iter().find(|r| r.id == id).map(|r| r.status)
    }
}

#[async_trait]
impl ReservationsTable for FakeReservations {
    async fn list_for_business(
        &self,
        business_id: BusinessId,
        _vertical: BusinessVertical,
    ) -> Result<Vec<Reservation>, DataError> {
        self.list_calls.lock().push(business_id);
        let delay = *self.list_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DataError::remote("reservations table unavailable"));
        }
        let mut items: Vec<Reservation> = self
            .rows
            .lock()
            .iter()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect();
        items.sort_by_key(|r| r.schedule.anchor_date());
        Ok(items)
    }

    async fn update_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), DataError> {
        let delay = *self.update_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DataError::remote("permission denied for table reservations"));
        }
        let mut rows = self.rows.lock();
        let row = rows.iter_mut().find(|r| r.id == id).ok_or(DataError::NotFound {
            entity: "reservation",
            id,
        })?;
        row.status = status;
        Ok(())
    }
}

// -------- builders --------

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn appointment(business_id: BusinessId, date: NaiveDate, status: ReservationStatus) -> Reservation {
    Reservation {
        id: Uuid::new_v4(),
        business_id,
        status,
        client_name: "Ana Horvat".to_string(),
        client_phone: None,
        client_email: None,
        client_id: None,
        notes: None,
        num_people: Some(2),
        rating: None,
        schedule: Schedule::Appointment { date, time: None },
    }
}

pub fn stay(
    business_id: BusinessId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    status: ReservationStatus,
) -> Reservation {
    Reservation {
        schedule: Schedule::Stay {
            check_in,
            check_out,
        },
        ..appointment(business_id, check_in, status)
    }
}

pub fn change(business_id: BusinessId, kind: ChangeKind) -> ReservationChange {
    ReservationChange {
        kind,
        business_id,
        reservation_id: None,
        at: Utc::now(),
    }
}

// -------- local storage --------

/// In-memory key-value store whose writes can be made to fail.
pub struct FakeKv {
    inner: Arc<MemoryKeyValueStore>,
    fail_writes: AtomicBool,
}

impl FakeKv {
    pub fn new(inner: Arc<MemoryKeyValueStore>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FakeKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.check_writable()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.check_writable()?;
        self.inner.remove(key).await
    }
}

/// Service wired on fakes, with the in-process realtime feed.
pub struct Harness {
    pub auth: Arc<FakeAuth>,
    pub businesses: Arc<FakeBusinesses>,
    pub reservations: Arc<FakeReservations>,
    pub feed: Arc<BroadcastRealtime>,
    pub kv: Arc<FakeKv>,
    pub desk: PartnerDesk,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_kv(Arc::new(MemoryKeyValueStore::default()))
    }

    pub fn with_kv(kv: Arc<MemoryKeyValueStore>) -> Self {
        let kv = Arc::new(FakeKv::new(kv));
        let auth = Arc::new(FakeAuth::default());
        let businesses = Arc::new(FakeBusinesses::default());
        let reservations = Arc::new(FakeReservations::default());
        let feed = Arc::new(BroadcastRealtime::default());

        let cfg = PartnerCoreConfig {
            realtime: RealtimeMode::Local,
            location_picker: LocationPickerKind::Static,
            reconnect_initial_ms: 10,
            reconnect_max_ms: 50,
            ..PartnerCoreConfig::default()
        };
        let ports = Ports {
            auth: auth.clone(),
            businesses: businesses.clone(),
            reservations: reservations.clone(),
            realtime: feed.clone(),
            kv: kv.clone(),
            locations: Arc::new(StaticLocationPicker),
        };
        let desk = PartnerDesk::with_ports(ports, &cfg);

        Self {
            auth,
            businesses,
            reservations,
            feed,
            kv,
            desk,
        }
    }

    pub fn publish(&self, change: ReservationChange) {
        self.feed.publish(&change);
    }
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
