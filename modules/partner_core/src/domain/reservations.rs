use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::contract::model::{
    BusinessId, BusinessProfile, BusinessVertical, Reservation, ReservationId, ReservationStatus,
};
use crate::domain::error::DataError;
use crate::domain::ports::{RealtimeChannel, ReservationsTable};

/// What the repository currently holds. `items` always belongs to `business_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationSnapshot {
    pub business_id: Option<BusinessId>,
    pub vertical: Option<BusinessVertical>,
    pub items: Arc<Vec<Reservation>>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Delays between realtime reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

struct Active {
    business_id: BusinessId,
    vertical: BusinessVertical,
    generation: u64,
    listener: CancellationToken,
}

struct Inner {
    table: Arc<dyn ReservationsTable>,
    realtime: Arc<dyn RealtimeChannel>,
    reconnect: ReconnectPolicy,
    state: watch::Sender<ReservationSnapshot>,
    generation: AtomicU64,
    active: Mutex<Option<Active>>,
    in_flight: DashSet<ReservationId>,
}

/// Sole owner of the in-memory reservation list of the active business.
///
/// The list is refreshed by full re-fetches only: after activation, after
/// every realtime change and after every successful status update.
#[derive(Clone)]
pub struct ReservationRepository {
    inner: Arc<Inner>,
}

impl ReservationRepository {
    pub fn new(
        table: Arc<dyn ReservationsTable>,
        realtime: Arc<dyn RealtimeChannel>,
        reconnect: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ReservationSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                table,
                realtime,
                reconnect,
                state,
                generation: AtomicU64::new(0),
                active: Mutex::new(None),
                in_flight: DashSet::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReservationSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> ReservationSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn active_business(&self) -> Option<(BusinessId, BusinessVertical)> {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|a| (a.business_id, a.vertical))
    }

    /// Fetch every reservation of `business_id`, ordered by the vertical's
    /// date column. The result replaces the held list only when that
    /// business is still the active one.
    #[instrument(name = "partner_core.reservations.fetch", skip(self), fields(business_id = %business_id, vertical = %vertical))]
    pub async fn fetch(
        &self,
        business_id: BusinessId,
        vertical: BusinessVertical,
    ) -> Result<Vec<Reservation>, DataError> {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.fetch_and_apply(generation, business_id, vertical).await
    }

    /// Re-fetch the active business, if any.
    pub async fn refresh(&self) -> Result<(), DataError> {
        let Some((business_id, vertical)) = self.active_business() else {
            return Err(DataError::NoActiveBusiness);
        };
        self.fetch(business_id, vertical).await.map(|_| ())
    }

    /// Make `profile` the active business: the previous subscription is torn
    /// down and its reservations dropped before anything is requested for the
    /// new one.
    #[instrument(name = "partner_core.reservations.activate", skip(self, profile), fields(business_id = %profile.id))]
    pub async fn activate(&self, profile: &BusinessProfile) -> Result<(), DataError> {
        let business_id = profile.id;
        let vertical = profile.vertical();

        let listener = CancellationToken::new();
        let generation = {
            let mut active = self.inner.active.lock();
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(previous) = active.take() {
                previous.listener.cancel();
                debug!(previous = %previous.business_id, "Previous business deactivated");
            }
            self.inner.state.send_replace(ReservationSnapshot {
                business_id: Some(business_id),
                vertical: Some(vertical),
                items: Arc::new(Vec::new()),
                loading: true,
                error: None,
            });
            *active = Some(Active {
                business_id,
                vertical,
                generation,
                listener: listener.clone(),
            });
            generation
        };
        info!("Business activated");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(
            inner
                .listen(generation, business_id, vertical, listener)
                .instrument(tracing::debug_span!("partner_core.reservations.realtime", business_id = %business_id)),
        );

        self.inner
            .fetch_and_apply(generation, business_id, vertical)
            .await
            .map(|_| ())
    }

    /// Drop the active business: subscription torn down, list cleared.
    #[instrument(name = "partner_core.reservations.deactivate", skip(self))]
    pub fn deactivate(&self) {
        let mut active = self.inner.active.lock();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = active.take() {
            previous.listener.cancel();
            info!(business_id = %previous.business_id, "Business deactivated");
        }
        self.inner.state.send_replace(ReservationSnapshot::default());
    }

    /// Change the status of one reservation, then re-fetch. A second update
    /// for the same reservation is refused while the first is running; a
    /// failed update leaves the held list untouched.
    #[instrument(name = "partner_core.reservations.update_status", skip(self), fields(reservation_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), DataError> {
        let Some((business_id, vertical)) = self.active_business() else {
            return Err(DataError::NoActiveBusiness);
        };
        let _guard = InFlight::claim(&self.inner.in_flight, id)?;

        self.inner.table.update_status(id, status).await?;
        info!("Reservation status updated");

        if let Err(e) = self.fetch(business_id, vertical).await {
            // the mutation itself went through; the snapshot carries the error
            warn!(error = %e, "Re-fetch after status update failed");
        }
        Ok(())
    }

    pub fn is_updating(&self, id: ReservationId) -> bool {
        self.inner.in_flight.contains(&id)
    }
}

impl Inner {
    fn is_live(&self, generation: u64, business_id: BusinessId) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
            && self
                .active
                .lock()
                .as_ref()
                .is_some_and(|a| a.business_id == business_id && a.generation == generation)
    }

    async fn fetch_and_apply(
        &self,
        generation: u64,
        business_id: BusinessId,
        vertical: BusinessVertical,
    ) -> Result<Vec<Reservation>, DataError> {
        if self.is_live(generation, business_id) {
            self.state.send_modify(|s| s.loading = true);
        }

        let result = self.table.list_for_business(business_id, vertical).await;

        // re-check under the lock so a concurrent switch cannot interleave
        let active = self.active.lock();
        let live = self.generation.load(Ordering::SeqCst) == generation
            && active
                .as_ref()
                .is_some_and(|a| a.business_id == business_id && a.generation == generation);
        if !live {
            debug!("Discarding reservations of an inactive business");
            return result;
        }

        match &result {
            Ok(items) => {
                debug!(count = items.len(), "Reservations loaded");
                self.state.send_modify(|s| {
                    s.items = Arc::new(items.clone());
                    s.loading = false;
                    s.error = None;
                });
            }
            Err(e) => {
                warn!(error = %e, "Loading reservations failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
        drop(active);
        result
    }

    /// Realtime loop: any change for the business triggers a full re-fetch.
    /// A lost connection is retried with exponential backoff and followed by
    /// a re-fetch, since changes may have been missed meanwhile.
    async fn listen(
        self: Arc<Self>,
        generation: u64,
        business_id: BusinessId,
        vertical: BusinessVertical,
        cancel: CancellationToken,
    ) {
        let mut delay = self.reconnect.initial;
        let mut reconnecting = false;

        loop {
            let subscribed = tokio::select! {
                _ = cancel.cancelled() => break,
                s = self.realtime.subscribe(business_id) => s,
            };

            match subscribed {
                Ok(mut changes) => {
                    debug!("Realtime subscription established");
                    delay = self.reconnect.initial;
                    if reconnecting {
                        let _ = self.fetch_and_apply(generation, business_id, vertical).await;
                    }
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            change = changes.next() => match change {
                                Some(change) if change.business_id == business_id => {
                                    debug!(kind = ?change.kind, reservation_id = ?change.reservation_id, "Reservation changed remotely");
                                    let _ = self.fetch_and_apply(generation, business_id, vertical).await;
                                }
                                Some(_) => {}
                                None => break,
                            },
                        }
                    }
                    warn!("Realtime stream ended");
                }
                Err(e) => warn!(error = %e, "Realtime subscription failed"),
            }

            reconnecting = true;
            debug!(delay_ms = delay.as_millis() as u64, "Reconnecting realtime subscription");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.reconnect.next_delay(delay);
        }
        debug!("Realtime listener stopped");
    }
}

/// Membership in the in-flight set for the lifetime of one mutation.
struct InFlight<'a> {
    set: &'a DashSet<ReservationId>,
    id: ReservationId,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a DashSet<ReservationId>, id: ReservationId) -> Result<Self, DataError> {
        if set.insert(id) {
            Ok(Self { set, id })
        } else {
            Err(DataError::MutationInFlight { id })
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}
