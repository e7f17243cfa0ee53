use crate::error::{AuthFailure, BackendError};
use crate::identity::{Identity, IdentityProvider};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use ulid::Ulid;

/// Minimum password length accepted on sign-up
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password_digest: String,
}

/// In-memory email/password identity provider
///
/// Holds a single signed-in identity, like a browser session.
#[derive(Debug)]
pub struct MemoryIdentityProvider {
    /// Accounts keyed by lowercased email
    accounts: DashMap<String, Account>,
    current: watch::Sender<Option<Identity>>,
}

impl MemoryIdentityProvider {
    /// Create provider with no accounts
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: DashMap::new(),
            current,
        }
    }

    /// Currently signed-in identity
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Number of registered accounts
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let key = email.trim().to_lowercase();
        let identity = match self.accounts.get(&key) {
            Some(account) if account.password_digest == digest(password) => {
                account.identity.clone()
            }
            _ => return Err(BackendError::Auth(AuthFailure::InvalidCredentials)),
        };

        self.current.send_replace(Some(identity.clone()));
        tracing::debug!(uid = %identity.uid, "signed in");
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, BackendError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(BackendError::Auth(AuthFailure::InvalidEmail));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::Auth(AuthFailure::WeakPassword));
        }

        let Entry::Vacant(slot) = self.accounts.entry(email.to_lowercase()) else {
            return Err(BackendError::Auth(AuthFailure::EmailInUse));
        };

        let identity = Identity {
            uid: Ulid::new().to_string(),
            email: email.to_string(),
            display_name: display_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        };
        slot.insert(Account {
            identity: identity.clone(),
            password_digest: digest(password),
        });

        self.current.send_replace(Some(identity.clone()));
        tracing::debug!(uid = %identity.uid, "account registered");
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.current.send_replace(None);
        Ok(())
    }

    fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}
