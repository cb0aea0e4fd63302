use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::contract::model::BusinessId;
use crate::domain::error::NetworkError;
use crate::domain::events::ReservationChange;
use crate::domain::ports::{EventPublisher, RealtimeChannel};

/// In-process change feed: whatever is published is delivered to every
/// subscriber of the matching business. Lagging subscribers lose the
/// oldest changes.
#[derive(Clone)]
pub struct BroadcastRealtime {
    tx: broadcast::Sender<ReservationChange>,
}

impl BroadcastRealtime {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastRealtime {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventPublisher<ReservationChange> for BroadcastRealtime {
    fn publish(&self, event: &ReservationChange) {
        let _ = self.tx.send(event.clone());
    }
}

#[async_trait]
impl RealtimeChannel for BroadcastRealtime {
    async fn subscribe(
        &self,
        business_id: BusinessId,
    ) -> Result<BoxStream<'static, ReservationChange>, NetworkError> {
        Ok(BroadcastStream::new(self.tx.subscribe())
            .filter_map(move |res| async move {
                res.ok().filter(|change| change.business_id == business_id)
            })
            .boxed())
    }
}
