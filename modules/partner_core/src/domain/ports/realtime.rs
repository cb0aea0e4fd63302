use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::contract::model::BusinessId;
use crate::domain::error::NetworkError;
use crate::domain::events::ReservationChange;

/// Push channel of reservation row changes, filtered by business.
/// The returned stream ending means the connection was lost.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn subscribe(
        &self,
        business_id: BusinessId,
    ) -> Result<BoxStream<'static, ReservationChange>, NetworkError>;
}
