use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::contract::model::GeoPoint;
use crate::domain::error::NetworkError;
use crate::domain::ports::Geocoder;
use crate::infra::http::TracedClient;

pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

/// Mapbox reverse geocoding: `GET {base}/{lng},{lat}.json?access_token=…`.
pub struct MapboxGeocoder {
    client: TracedClient,
    base: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: String,
}

impl MapboxGeocoder {
    pub fn new(client: TracedClient, base: Url, access_token: impl Into<String>) -> Self {
        Self {
            client,
            base,
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    #[instrument(name = "partner_core.geocoding.mapbox.reverse", skip(self), fields(point = %point))]
    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, NetworkError> {
        if self.access_token.is_empty() {
            debug!("No Mapbox token configured");
            return Ok(None);
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::unreachable(format!("invalid geocoding URL: {}", self.base)))?
            .pop_if_empty()
            .push(&format!("{},{}.json", point.lng, point.lat));
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("limit", "1");

        let request = self
            .client
            .request(reqwest::Method::GET, url.as_str())
            .build()
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NetworkError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let collection: FeatureCollection = response
            .json()
            .await
            .map_err(|e| NetworkError::decode(e.to_string()))?;
        Ok(collection.features.into_iter().next().map(|f| f.place_name))
    }
}
