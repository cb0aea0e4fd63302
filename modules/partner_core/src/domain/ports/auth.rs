use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::contract::model::Session;
use crate::domain::error::AuthError;
use crate::domain::events::AuthEvent;

/// Port for the remote authentication API.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Register an account. The returned session describes the new user; it is
    /// not adopted as the signed-in session (email confirmation may be pending).
    async fn sign_up(&self, email: &str, password: &str, name: &str)
        -> Result<Session, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Trigger the password-reset email whose link opens `redirect_to`.
    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), AuthError>;
    /// Merge `metadata` into the signed-in user's metadata.
    async fn update_user(
        &self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AuthError>;
    /// Session the backend currently holds, if any.
    async fn current_session(&self) -> Option<Session>;
    /// Auth-state changes triggered outside of the calls above.
    fn auth_events(&self) -> BoxStream<'static, AuthEvent>;
}
