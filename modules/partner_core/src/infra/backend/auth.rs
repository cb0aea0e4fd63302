use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Map, Value};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, instrument};

use super::dto::{SignUpDto, TokenDto, UserDto};
use super::{decode_json, status_error, ApiErrorBody, Credentials, RestBackend};
use crate::contract::model::Session;
use crate::domain::error::{AuthError, NetworkError};
use crate::domain::events::AuthEvent;
use crate::domain::ports::AuthBackend;

/// Translate a failed auth response into the auth taxonomy.
async fn auth_error(response: reqwest::Response, email: Option<&str>) -> AuthError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body = ApiErrorBody::parse(&text);
    let code = body.code().unwrap_or_default();
    let message = body.message();
    let lowered = message.to_ascii_lowercase();

    if code == "user_already_exists" || code == "email_exists" || lowered.contains("already registered") {
        return AuthError::DuplicateAccount {
            email: email.unwrap_or_default().to_string(),
        };
    }
    if code == "weak_password" || lowered.contains("password should be") {
        return AuthError::WeakPassword { reason: message };
    }
    if code == "email_not_confirmed" || lowered.contains("email not confirmed") {
        return AuthError::EmailNotConfirmed;
    }
    if code == "invalid_credentials" || body.error.as_deref() == Some("invalid_grant") {
        return AuthError::InvalidCredentials;
    }
    if status.is_server_error() {
        return AuthError::Network(NetworkError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    AuthError::unexpected(if message.is_empty() { status.to_string() } else { message })
}

impl RestBackend {
    fn adopt(&self, grant: TokenDto) -> Session {
        let session = Session::from(grant.user);
        self.store_credentials(Some(Credentials {
            session: session.clone(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
        }));
        session
    }

    /// Exchange the refresh token for a new access token.
    #[instrument(name = "partner_core.backend.auth.refresh", skip(self))]
    pub(crate) async fn refresh_session(&self) -> Result<(), AuthError> {
        let refresh_token = self
            .credentials()
            .and_then(|c| c.refresh_token.clone())
            .ok_or(AuthError::NotSignedIn)?;

        let url = self.endpoint(&["auth", "v1", "token"])?;
        let request = self
            .client()
            .request(reqwest::Method::POST, url.as_str())
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", self.anon_key.as_str())
            .json(&json!({ "refresh_token": refresh_token }))
            .build()
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;
        let response = self
            .client()
            .execute(request)
            .await
            .map_err(|e| NetworkError::unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let err = auth_error(response, None).await;
            // an unusable refresh token means the session is gone
            self.store_credentials(None);
            self.publish(AuthEvent::SignedOut);
            return Err(err);
        }
        let grant: TokenDto = decode_json(response).await?;
        let session = self.adopt(grant);
        debug!(user_id = %session.user_id, "Access token refreshed");
        self.publish(AuthEvent::TokenRefreshed(session));
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    #[instrument(name = "partner_core.backend.auth.sign_up", skip(self, password, name), fields(email = %email))]
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session, AuthError> {
        let url = self.endpoint(&["auth", "v1", "signup"])?;
        let body = json!({
            "email": email,
            "password": password,
            "data": { "name": name },
        });
        let response = self
            .send(|c| c.request(reqwest::Method::POST, url.as_str()).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response, Some(email)).await);
        }
        let created: SignUpDto = decode_json(response).await?;
        Ok(Session::from(created.user()))
    }

    #[instrument(name = "partner_core.backend.auth.sign_in", skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = self.endpoint(&["auth", "v1", "token"])?;
        let body = json!({ "email": email, "password": password });
        let response = self
            .send(|c| {
                c.request(reqwest::Method::POST, url.as_str())
                    .query(&[("grant_type", "password")])
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response, Some(email)).await);
        }
        let grant: TokenDto = decode_json(response).await?;
        let session = self.adopt(grant);
        self.publish(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    #[instrument(name = "partner_core.backend.auth.sign_out", skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let result: Result<(), AuthError> = async {
            let url = self.endpoint(&["auth", "v1", "logout"])?;
            let response = self
                .send(|c| c.request(reqwest::Method::POST, url.as_str()))
                .await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(AuthError::Network(status_error(response).await))
            }
        }
        .await;

        // tokens are dropped whatever the server said
        self.store_credentials(None);
        self.publish(AuthEvent::SignedOut);
        result
    }

    #[instrument(name = "partner_core.backend.auth.reset_password", skip(self), fields(email = %email))]
    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        let url = self.endpoint(&["auth", "v1", "recover"])?;
        let body = json!({ "email": email });
        let response = self
            .send(|c| {
                c.request(reqwest::Method::POST, url.as_str())
                    .query(&[("redirect_to", redirect_to)])
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response, Some(email)).await);
        }
        Ok(())
    }

    #[instrument(name = "partner_core.backend.auth.update_user", skip(self, metadata))]
    async fn update_user(&self, metadata: Map<String, Value>) -> Result<(), AuthError> {
        let credentials = self.credentials().ok_or(AuthError::NotSignedIn)?;
        let url = self.endpoint(&["auth", "v1", "user"])?;
        let body = json!({ "data": metadata });
        let response = self
            .send(|c| c.request(reqwest::Method::PUT, url.as_str()).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response, None).await);
        }
        let user: UserDto = decode_json(response).await?;
        let session = Session::from(user);

        // keep the (possibly refreshed) tokens, swap in the new identity
        let tokens = self.credentials().unwrap_or(credentials);
        self.store_credentials(Some(Credentials {
            session: session.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        }));
        self.publish(AuthEvent::UserUpdated(session));
        Ok(())
    }

    async fn current_session(&self) -> Option<Session> {
        self.credentials().map(|c| c.session.clone())
    }

    fn auth_events(&self) -> BoxStream<'static, AuthEvent> {
        BroadcastStream::new(self.subscribe_auth())
            .filter_map(|res| async move { res.ok() })
            .boxed()
    }
}
