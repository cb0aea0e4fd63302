use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::contract::model::BusinessId;
use crate::domain::error::NetworkError;
use crate::domain::events::{ChangeKind, ReservationChange};
use crate::domain::ports::RealtimeChannel;
use crate::infra::backend::{status_error, RestBackend};
use crate::infra::http::TracedClient;

/// Change feed over server-sent events:
/// `GET {base}/reservations?business_id=eq.{id}` with `text/event-stream`.
///
/// Uses its own client: a total request timeout would cut the stream.
pub struct SseRealtimeChannel {
    client: TracedClient,
    backend: Arc<RestBackend>,
    base: Url,
}

impl SseRealtimeChannel {
    pub fn new(client: TracedClient, backend: Arc<RestBackend>, base: Url) -> Self {
        Self {
            client,
            backend,
            base,
        }
    }
}

#[async_trait]
impl RealtimeChannel for SseRealtimeChannel {
    #[instrument(name = "partner_core.realtime.sse.subscribe", skip(self), fields(business_id = %business_id))]
    async fn subscribe(
        &self,
        business_id: BusinessId,
    ) -> Result<BoxStream<'static, ReservationChange>, NetworkError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::unreachable(format!("invalid realtime URL: {}", self.base)))?
            .pop_if_empty()
            .push("reservations");

        let request = self
            .backend
            .authorize(self.client.request(reqwest::Method::GET, url.as_str()))
            .query(&[("business_id", format!("eq.{business_id}"))])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .build()
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        debug!("Event stream open");

        let bytes = response.bytes_stream().boxed();
        let state = (bytes, EventDecoder::default(), VecDeque::<String>::new());
        let events = stream::unfold(state, |(mut bytes, mut decoder, mut ready)| async move {
            loop {
                if let Some(data) = ready.pop_front() {
                    return Some((data, (bytes, decoder, ready)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => ready.extend(decoder.push(&chunk)),
                    Some(Err(e)) => {
                        warn!(error = %e, "Event stream failed");
                        return None;
                    }
                    None => return None,
                }
            }
        });

        Ok(events
            .filter_map(move |data| async move { parse_change(&data, business_id) })
            .boxed())
    }
}

/// Payload of one event; also accepts the `{type, record, old_record}` shape
/// of database webhooks.
#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(alias = "type", alias = "eventType")]
    kind: ChangeKind,
    #[serde(default)]
    business_id: Option<BusinessId>,
    #[serde(default)]
    reservation_id: Option<uuid::Uuid>,
    #[serde(default)]
    record: Option<WireRecord>,
    #[serde(default)]
    old_record: Option<WireRecord>,
    #[serde(default)]
    at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: Option<uuid::Uuid>,
    #[serde(default)]
    business_id: Option<BusinessId>,
}

fn parse_change(data: &str, subscribed: BusinessId) -> Option<ReservationChange> {
    let payload: WirePayload = match serde_json::from_str(data) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "Ignoring unreadable event");
            return None;
        }
    };
    let record = payload.record.as_ref().or(payload.old_record.as_ref());
    let business_id = payload
        .business_id
        .or_else(|| record.and_then(|r| r.business_id))
        .unwrap_or(subscribed);
    Some(ReservationChange {
        kind: payload.kind,
        business_id,
        reservation_id: payload.reservation_id.or_else(|| record.and_then(|r| r.id)),
        at: payload.at.unwrap_or_else(chrono::Utc::now),
    })
}

/// Incremental `text/event-stream` parser yielding the `data` of each event.
#[derive(Debug, Default)]
pub(crate) struct EventDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl EventDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut complete = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    complete.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // comments (":keepalive"), event names and ids carry nothing we use
        }
        complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_split_chunks_and_keepalives() {
        let mut decoder = EventDecoder::default();
        assert!(decoder.push(b": keepalive\n\ndata: {\"a\":").is_empty());
        let events = decoder.push(b"1}\r\n\r\nevent: x\ndata: 2\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string(), "2".to_string()]);
    }

    #[test]
    fn webhook_shaped_payloads_are_understood() {
        let business = uuid::Uuid::new_v4();
        let row = uuid::Uuid::new_v4();
        let data = format!(
            r#"{{"type":"DELETE","old_record":{{"id":"{row}","business_id":"{business}"}}}}"#
        );
        let change = parse_change(&data, uuid::Uuid::nil()).unwrap();
        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.business_id, business);
        assert_eq!(change.reservation_id, Some(row));
        assert!(parse_change("not json", business).is_none());
    }
}
