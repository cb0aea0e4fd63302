pub mod auth;
pub mod geocoding;
pub mod kv;
pub mod location;
pub mod realtime;
pub mod tables;

pub use auth::AuthBackend;
pub use geocoding::Geocoder;
pub use kv::KeyValueStore;
pub use location::LocationPicker;
pub use realtime::RealtimeChannel;
pub use tables::{BusinessesTable, ReservationsTable};

/// Output port: publish domain events (no knowledge of transport).
pub trait EventPublisher<E>: Send + Sync + 'static {
    fn publish(&self, event: &E);
}
