use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::{LocationPickerKind, PartnerCoreConfig, RealtimeMode};
use crate::contract::client::PartnerDeskApi;
use crate::domain::business::BusinessProfileStore;
use crate::domain::events::ReservationChange;
use crate::domain::ports::{
    AuthBackend, BusinessesTable, EventPublisher, KeyValueStore, LocationPicker, RealtimeChannel,
    ReservationsTable,
};
use crate::domain::reservations::{ReconnectPolicy, ReservationRepository};
use crate::domain::service::Service;
use crate::domain::session::{AuthSubscription, SessionStore};
use crate::gateways::local::PartnerDeskLocalClient;
use crate::infra::backend::RestBackend;
use crate::infra::geocoding::MapboxGeocoder;
use crate::infra::http::TracedClient;
use crate::infra::location::{MapLocationPicker, StaticLocationPicker};
use crate::infra::realtime::{BroadcastRealtime, SseRealtimeChannel};
use crate::infra::storage::FileKeyValueStore;

/// Adapters the service runs on. Production wiring comes from
/// [`PartnerDesk::from_config`]; tests plug in fakes.
#[derive(Clone)]
pub struct Ports {
    pub auth: Arc<dyn AuthBackend>,
    pub businesses: Arc<dyn BusinessesTable>,
    pub reservations: Arc<dyn ReservationsTable>,
    pub realtime: Arc<dyn RealtimeChannel>,
    pub kv: Arc<dyn KeyValueStore>,
    pub locations: Arc<dyn LocationPicker>,
}

/// Composition root: owns the service, its background tasks and the
/// public client.
pub struct PartnerDesk {
    service: Arc<Service>,
    api: Arc<dyn PartnerDeskApi>,
    local_feed: Option<Arc<BroadcastRealtime>>,
    auth_listener: ArcSwapOption<AuthSubscription>,
    shutdown: CancellationToken,
}

impl PartnerDesk {
    /// Wire the HTTP adapters described by `cfg`. Relative paths resolve
    /// against `home_dir`.
    pub fn from_config(
        cfg: &PartnerCoreConfig,
        home_dir: &Path,
        http_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.backend_url)
            .with_context(|| format!("Invalid backend_url '{}'", cfg.backend_url))?;
        let client = TracedClient::with_timeout(Some(http_timeout))
            .context("Failed to build HTTP client")?;
        let backend = RestBackend::new(client.clone(), base, cfg.anon_key.clone());

        let mut local_feed = None;
        let realtime: Arc<dyn RealtimeChannel> = match cfg.realtime {
            RealtimeMode::Sse => {
                let url = cfg.resolved_realtime_url();
                let realtime_base = Url::parse(&url)
                    .with_context(|| format!("Invalid realtime_url '{url}'"))?;
                let stream_client =
                    TracedClient::with_timeout(None).context("Failed to build stream client")?;
                Arc::new(SseRealtimeChannel::new(
                    stream_client,
                    Arc::clone(&backend),
                    realtime_base,
                ))
            }
            RealtimeMode::Local => {
                let feed = Arc::new(BroadcastRealtime::default());
                local_feed = Some(Arc::clone(&feed));
                feed
            }
        };

        let locations: Arc<dyn LocationPicker> = match cfg.location_picker {
            LocationPickerKind::Map => {
                let geocoding_base = Url::parse(&cfg.geocoding_base_url).with_context(|| {
                    format!("Invalid geocoding_base_url '{}'", cfg.geocoding_base_url)
                })?;
                let geocoder = MapboxGeocoder::new(client, geocoding_base, cfg.mapbox_token.clone());
                Arc::new(MapLocationPicker::new(Arc::new(geocoder)))
            }
            LocationPickerKind::Static => Arc::new(StaticLocationPicker),
        };

        let state_path = home_dir.join(&cfg.state_file);
        debug!(state = %state_path.display(), realtime = ?cfg.realtime, "Wiring partner desk");

        let ports = Ports {
            auth: backend.clone(),
            businesses: backend.clone(),
            reservations: backend,
            realtime,
            kv: Arc::new(FileKeyValueStore::new(state_path)),
            locations,
        };
        let mut desk = Self::with_ports(ports, cfg);
        desk.local_feed = local_feed;
        Ok(desk)
    }

    pub fn with_ports(ports: Ports, cfg: &PartnerCoreConfig) -> Self {
        let session = Arc::new(SessionStore::new(ports.auth, cfg.reset_redirect.clone()));
        let business = Arc::new(BusinessProfileStore::new(
            ports.businesses,
            ports.kv,
            session.subscribe(),
        ));
        let reservations = ReservationRepository::new(
            ports.reservations,
            ports.realtime,
            ReconnectPolicy {
                initial: Duration::from_millis(cfg.reconnect_initial_ms),
                max: Duration::from_millis(cfg.reconnect_max_ms.max(cfg.reconnect_initial_ms)),
            },
        );
        let service = Arc::new(Service::new(session, business, reservations, ports.locations));
        let api: Arc<dyn PartnerDeskApi> =
            Arc::new(PartnerDeskLocalClient::new(Arc::clone(&service)));

        Self {
            service,
            api,
            local_feed: None,
            auth_listener: ArcSwapOption::empty(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Restore state and start the background listeners.
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting partner desk");
        self.auth_listener
            .store(Some(Arc::new(self.service.session().listen())));

        let service = Arc::clone(&self.service);
        let mut session = service.session().subscribe();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = session.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = session.borrow_and_update().clone();
                        service.on_session_changed(current.as_ref());
                    }
                }
            }
        });

        self.service
            .start()
            .await
            .context("Failed to restore partner desk state")
    }

    pub fn api(&self) -> Arc<dyn PartnerDeskApi> {
        Arc::clone(&self.api)
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Publisher of the in-process change feed (`realtime: local` only).
    pub fn local_feed(&self) -> Option<Arc<dyn EventPublisher<ReservationChange>>> {
        self.local_feed
            .as_ref()
            .map(|feed| Arc::clone(feed) as Arc<dyn EventPublisher<ReservationChange>>)
    }

    /// Stop every background task and drop the active business.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.service.reservations().deactivate();
        if let Some(listener) = self.auth_listener.swap(None) {
            match Arc::try_unwrap(listener) {
                Ok(listener) => listener.unsubscribe().await,
                Err(shared) => drop(shared),
            }
        }
        info!("Partner desk stopped");
    }
}
