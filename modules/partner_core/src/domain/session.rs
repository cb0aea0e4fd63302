use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::Session;
use crate::domain::error::AuthError;
use crate::domain::events::AuthEvent;
use crate::domain::ports::AuthBackend;

/// Owner of the signed-in identity. Everyone else reads it through
/// [`SessionStore::subscribe`].
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    session: Arc<watch::Sender<Option<Session>>>,
    loading: Arc<watch::Sender<bool>>,
    pending_calls: Arc<AtomicUsize>,
    reset_redirect: String,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn AuthBackend>, reset_redirect: impl Into<String>) -> Self {
        let (session, _) = watch::channel(None);
        let (loading, _) = watch::channel(false);
        Self {
            backend,
            session: Arc::new(session),
            loading: Arc::new(loading),
            pending_calls: Arc::new(AtomicUsize::new(0)),
            reset_redirect: reset_redirect.into(),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Register an account. The new user is not signed in by this call.
    #[instrument(name = "partner_core.session.sign_up", skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, AuthError> {
        let _busy = self.busy();
        let created = self.backend.sign_up(email, password, name).await?;
        info!(user_id = %created.user_id, "Account registered");
        Ok(created)
    }

    #[instrument(name = "partner_core.session.sign_in", skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _busy = self.busy();
        let session = self.backend.sign_in(email, password).await?;
        self.session.send_replace(Some(session.clone()));
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Local state is cleared even when the remote call fails; the remote
    /// error is still returned.
    #[instrument(name = "partner_core.session.sign_out", skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _busy = self.busy();
        let result = self.backend.sign_out().await;
        self.session.send_replace(None);
        match &result {
            Ok(()) => info!("Signed out"),
            Err(e) => warn!(error = %e, "Remote sign-out failed, local session cleared anyway"),
        }
        result
    }

    #[instrument(name = "partner_core.session.reset_password", skip(self), fields(email = %email))]
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let _busy = self.busy();
        self.backend
            .reset_password(email, &self.reset_redirect)
            .await?;
        debug!(redirect = %self.reset_redirect, "Password reset requested");
        Ok(())
    }

    /// Merge `metadata` into the user's metadata, locally only after the
    /// backend accepted it.
    #[instrument(name = "partner_core.session.update_profile", skip(self, metadata), fields(keys = metadata.len()))]
    pub async fn update_profile(
        &self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AuthError> {
        if self.session.borrow().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        let _busy = self.busy();
        self.backend.update_user(metadata.clone()).await?;
        self.session.send_modify(|current| {
            if let Some(session) = current {
                session.metadata.extend(metadata);
            }
        });
        debug!("User metadata updated");
        Ok(())
    }

    /// Adopt whatever session the backend already holds.
    #[instrument(name = "partner_core.session.restore", skip(self))]
    pub async fn restore(&self) -> Option<Session> {
        let restored = self.backend.current_session().await;
        self.session.send_replace(restored.clone());
        debug!(restored = restored.is_some(), "Session restored");
        restored
    }

    /// Republish auth-state changes coming from the backend until the
    /// returned handle is unsubscribed or dropped.
    pub fn listen(&self) -> AuthSubscription {
        let token = CancellationToken::new();
        let mut events = self.backend.auth_events();
        let session = Arc::clone(&self.session);
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    event = events.next() => match event {
                        Some(event) => apply_auth_event(&session, event),
                        None => {
                            debug!("Auth event stream closed");
                            break;
                        }
                    },
                }
            }
        });

        AuthSubscription {
            token,
            handle: Some(handle),
        }
    }

    fn busy(&self) -> BusyGuard {
        BusyGuard::enter(Arc::clone(&self.pending_calls), Arc::clone(&self.loading))
    }
}

fn apply_auth_event(session: &watch::Sender<Option<Session>>, event: AuthEvent) {
    debug!(?event, "Auth state changed");
    session.send_replace(event.session().cloned());
}

/// Handle of the background auth listener.
pub struct AuthSubscription {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AuthSubscription {
    /// Stop listening and wait for the listener task to finish.
    pub async fn unsubscribe(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Raises the loading flag while at least one remote call is running.
struct BusyGuard {
    pending: Arc<AtomicUsize>,
    loading: Arc<watch::Sender<bool>>,
}

impl BusyGuard {
    fn enter(pending: Arc<AtomicUsize>, loading: Arc<watch::Sender<bool>>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        loading.send_replace(true);
        Self { pending, loading }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.loading.send_replace(false);
        }
    }
}
