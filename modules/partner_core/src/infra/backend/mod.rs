//! Adapter for the hosted backend: GoTrue-style auth under `/auth/v1` and
//! PostgREST-style tables under `/rest/v1`.

mod auth;
pub mod dto;
mod tables;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::contract::model::Session;
use crate::domain::error::NetworkError;
use crate::domain::events::AuthEvent;
use crate::infra::http::TracedClient;

/// PostgREST error code for "the single-object request matched no rows".
pub const NO_ROWS_CODE: &str = "PGRST116";

pub(crate) const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Tokens and identity of the signed-in user.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub session: Session,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Error body shapes of both APIs; all fields optional.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Machine-readable code, whichever field carries it.
    pub fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        })
    }

    /// Best human-readable message.
    pub fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

/// Shared HTTP state of the auth and table adapters.
pub struct RestBackend {
    client: TracedClient,
    base: Url,
    anon_key: String,
    credentials: ArcSwapOption<Credentials>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl RestBackend {
    pub fn new(client: TracedClient, base: Url, anon_key: impl Into<String>) -> Arc<Self> {
        let (auth_events, _) = broadcast::channel(32);
        Arc::new(Self {
            client,
            base,
            anon_key: anon_key.into(),
            credentials: ArcSwapOption::empty(),
            auth_events,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, NetworkError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::unreachable(format!("invalid base URL: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `apikey` plus a bearer: the user's access token when signed in,
    /// the anon key otherwise.
    pub(crate) fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .credentials
            .load()
            .as_ref()
            .map(|c| c.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    pub(crate) fn client(&self) -> &TracedClient {
        &self.client
    }

    pub(crate) fn credentials(&self) -> Option<Arc<Credentials>> {
        self.credentials.load_full()
    }

    pub(crate) fn store_credentials(&self, credentials: Option<Credentials>) {
        self.credentials.store(credentials.map(Arc::new));
    }

    pub(crate) fn publish(&self, event: AuthEvent) {
        // no receivers is fine
        let _ = self.auth_events.send(event);
    }

    pub(crate) fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    /// Build, authorize and send a request. A 401 while signed in triggers
    /// one token refresh and a single retry.
    pub(crate) async fn send(
        &self,
        build: impl Fn(&TracedClient) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, NetworkError> {
        let response = self.send_once(&build).await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let has_refresh = self
            .credentials()
            .is_some_and(|c| c.refresh_token.is_some());
        if !has_refresh {
            return Ok(response);
        }

        debug!("Access token rejected, refreshing");
        match self.refresh_session().await {
            Ok(()) => self.send_once(&build).await,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Ok(response)
            }
        }
    }

    async fn send_once(
        &self,
        build: &impl Fn(&TracedClient) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, NetworkError> {
        let request = self
            .authorize(build(&self.client))
            .build()
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;
        self.client
            .execute(request)
            .await
            .map_err(|e| NetworkError::unreachable(e.to_string()))
    }
}

/// Read the body of a failed response into a status error.
pub(crate) async fn status_error(response: reqwest::Response) -> NetworkError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    NetworkError::Status { status, body }
}

pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, NetworkError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| NetworkError::unreachable(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| NetworkError::decode(e.to_string()))
}
