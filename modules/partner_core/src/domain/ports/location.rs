use async_trait::async_trait;

use crate::contract::model::{GeoPoint, PickedLocation, Region};

/// Location selection used by the profile forms. The implementation is chosen
/// once when the app is composed (interactive map or plain coordinates).
#[async_trait]
pub trait LocationPicker: Send + Sync {
    fn default_region(&self) -> Region;
    /// Turn a point the user chose into a picked location.
    async fn pick(&self, point: GeoPoint) -> PickedLocation;
}
