use tracing::debug;

use crate::contract::model::{GeoPoint, Region};
use crate::domain::ports::Geocoder;

/// Map viewport used when the form has no location yet.
pub const DEFAULT_REGION: Region = Region {
    center: GeoPoint {
        lat: 45.1,
        lng: 15.2,
    },
    lat_delta: 3.0,
    lng_delta: 3.0,
};

/// Human-readable label for `point`: the nearest place name, or the bare
/// coordinates when the lookup fails or finds nothing.
pub async fn describe_location(geocoder: &dyn Geocoder, point: GeoPoint) -> String {
    match geocoder.reverse(point).await {
        Ok(Some(place)) => place,
        Ok(None) => point.to_string(),
        Err(e) => {
            debug!(error = %e, "Reverse geocoding failed, showing coordinates");
            point.to_string()
        }
    }
}
