//! Identity provider contract

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Authenticated account as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable account id
    pub uid: String,
    /// Sign-in email
    pub email: String,
    /// Optional profile name
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    /// Name shown as note author.
    ///
    /// Falls back to the local part of the email when no display name is set.
    #[must_use]
    pub fn author_name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Hosted authentication service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError>;

    /// Register a new account and sign it in
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, BackendError>;

    /// Sign out the current account
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Current identity, updated on every sign-in/out
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: Option<&str>) -> Identity {
        Identity {
            uid: "u1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[test]
    fn author_name_prefers_display_name() {
        assert_eq!(identity(Some("Ada L.")).author_name(), "Ada L.");
    }

    #[test]
    fn author_name_falls_back_to_email_local_part() {
        assert_eq!(identity(None).author_name(), "ada");
        assert_eq!(identity(Some("  ")).author_name(), "ada");
    }
}
