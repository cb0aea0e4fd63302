use async_trait::async_trait;

use crate::contract::model::GeoPoint;
use crate::domain::error::NetworkError;

/// Reverse geocoding: coordinates → nearest place name.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the service knows no place at that point.
    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, NetworkError>;
}
