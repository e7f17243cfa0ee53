//! Session context
//!
//! Lifecycle-scoped view of the signed-in identity. Started once from an
//! identity provider, kept current by the provider's change notifications,
//! shut down explicitly. Components receive it by value (it is cheap to clone)
//! instead of reaching for global state.

use crate::error::{NoteHubError, Result};
use notehub_backend::{Identity, IdentityProvider};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared session context
#[derive(Clone)]
pub struct SessionContext {
    provider: Arc<dyn IdentityProvider>,
    identity: watch::Receiver<Option<Identity>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("identity", &*self.identity.borrow())
            .field("active", &!self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Start a session bound to `provider`
    #[must_use]
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        let identity = provider.watch_identity();
        tracing::debug!(signed_in = identity.borrow().is_some(), "session started");
        Self {
            provider,
            identity,
            shutdown: CancellationToken::new(),
        }
    }

    /// Identity acting right now; `None` after shutdown
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        self.identity.borrow().clone()
    }

    /// Identity for a gated operation
    ///
    /// # Errors
    /// `NoteHubError::Unauthenticated` when nobody is signed in
    pub fn require_identity(&self) -> Result<Identity> {
        self.current().ok_or(NoteHubError::Unauthenticated)
    }

    /// Sign in
    ///
    /// # Errors
    /// - `NoteHubError::Validation` for empty email or password
    /// - `NoteHubError::Authentication` if rejected
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        self.ensure_active()?;
        validate_credentials(email, password)?;

        let identity = self.provider.sign_in(email, password).await.map_err(|e| {
            tracing::warn!(error = %e, "sign-in failed");
            NoteHubError::from(e)
        })?;
        tracing::info!(uid = %identity.uid, "signed in");
        Ok(identity)
    }

    /// Register and sign in
    ///
    /// # Errors
    /// - `NoteHubError::Validation` for empty email or password
    /// - `NoteHubError::Authentication` if rejected
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity> {
        self.ensure_active()?;
        validate_credentials(email, password)?;

        let identity = self
            .provider
            .sign_up(email, password, display_name)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "sign-up failed");
                NoteHubError::from(e)
            })?;
        tracing::info!(uid = %identity.uid, "account created");
        Ok(identity)
    }

    /// Sign out
    ///
    /// # Errors
    /// Translated provider error
    pub async fn sign_out(&self) -> Result<()> {
        self.ensure_active()?;
        self.provider.sign_out().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Receiver notified on every identity change
    #[inline]
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.clone()
    }

    /// Tear down; all clones observe the shutdown
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            tracing::debug!("session shut down");
        }
    }

    /// Check if still active
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(NoteHubError::Cancelled)
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(NoteHubError::Validation("Email is required".to_string()));
    }
    if password.is_empty() {
        return Err(NoteHubError::Validation("Password is required".to_string()));
    }
    Ok(())
}
