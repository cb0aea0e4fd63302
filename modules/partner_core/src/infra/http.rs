//! reqwest wrapper that opens one span per outgoing request.

use std::time::Duration;

use tracing::{Instrument, Level};

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Client with a total request timeout; `None` keeps reqwest's default
    /// (no timeout), which long-lived event streams need.
    pub fn with_timeout(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?))
    }

    /// Send a built request inside an `outgoing_http` span that records the
    /// response status.
    pub async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::DEBUG,
            "outgoing_http",
            http.method = %req.method(),
            http.url = %redact(req.url()),
            http.status_code = tracing::field::Empty,
        );

        let response = self.inner.execute(req).instrument(span.clone()).await?;
        span.record("http.status_code", response.status().as_u16());
        Ok(response)
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

/// URL without its query string; tokens travel there for some services.
fn redact(url: &url::Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
