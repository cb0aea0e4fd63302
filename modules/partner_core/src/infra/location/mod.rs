//! The two `LocationPicker`s: one backed by a map and reverse geocoding, one
//! for front ends without a map that only echo coordinates.

use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::model::{GeoPoint, PickedLocation, Region};
use crate::domain::location::{describe_location, DEFAULT_REGION};
use crate::domain::ports::{Geocoder, LocationPicker};

pub struct MapLocationPicker {
    geocoder: Arc<dyn Geocoder>,
    region: Region,
}

impl MapLocationPicker {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            region: DEFAULT_REGION,
        }
    }
}

#[async_trait]
impl LocationPicker for MapLocationPicker {
    fn default_region(&self) -> Region {
        self.region
    }

    async fn pick(&self, point: GeoPoint) -> PickedLocation {
        PickedLocation {
            point,
            label: describe_location(self.geocoder.as_ref(), point).await,
        }
    }
}

#[derive(Default)]
pub struct StaticLocationPicker;

#[async_trait]
impl LocationPicker for StaticLocationPicker {
    fn default_region(&self) -> Region {
        DEFAULT_REGION
    }

    async fn pick(&self, point: GeoPoint) -> PickedLocation {
        PickedLocation {
            point,
            label: point.to_string(),
        }
    }
}
