//! Error types for NoteHub Core
//!
//! Every failure a view can hit maps onto one [`NoteHubError`] variant and one
//! user-facing message. Validation errors are raised before any backend call;
//! backend errors are translated at the call site.

use notehub_backend::{AuthFailure, BackendError};

/// Main NoteHub error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteHubError {
    /// Required field missing or empty
    #[error("validation failed: {0}")]
    Validation(String),

    /// Point read resolved to nothing
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend authorization rule rejection
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend service not reachable or not provisioned
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Backend service never configured
    #[error("backend not configured: {0}")]
    BackendUnconfigured(String),

    /// Generic network or server failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Gated operation without a signed-in identity
    #[error("not signed in")]
    Unauthenticated,

    /// Identity provider rejected sign-in or sign-up
    #[error("authentication failed: {0}")]
    Authentication(AuthFailure),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Consumer went away before completion
    #[error("operation cancelled")]
    Cancelled,
}

impl NoteHubError {
    /// Single message shown inline to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::PermissionDenied(msg)
            | Self::StorageUnavailable(msg)
            | Self::BackendUnconfigured(msg)
            | Self::Transport(msg) => msg.clone(),
            Self::NotFound(_) => "Note not found".to_string(),
            Self::Unauthenticated => "Please log in to continue.".to_string(),
            Self::Authentication(failure) => match failure {
                AuthFailure::InvalidCredentials => {
                    "Failed to log in. Please check your credentials.".to_string()
                }
                AuthFailure::EmailInUse => "An account with this email already exists.".to_string(),
                AuthFailure::WeakPassword => {
                    "Password should be at least 6 characters.".to_string()
                }
                AuthFailure::InvalidEmail => "Please enter a valid email address.".to_string(),
            },
            Self::Config(msg) => format!("Configuration error: {msg}"),
            Self::Cancelled => "Operation cancelled.".to_string(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::StorageUnavailable(_))
    }

    /// Check if error is a missing-note error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<BackendError> for NoteHubError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => Self::NotFound(what),
            BackendError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            BackendError::Unavailable(msg) => Self::StorageUnavailable(msg),
            BackendError::Unconfigured(msg) => Self::BackendUnconfigured(msg),
            BackendError::InvalidArgument(msg) => Self::Validation(msg),
            BackendError::Auth(failure) => Self::Authentication(failure),
            BackendError::Transport(msg) => Self::Transport(msg),
        }
    }
}

/// Convenience result alias
pub type Result<T, E = NoteHubError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = NoteHubError::Validation("Title is required".to_string());
        assert!(err.to_string().contains("validation failed"));
        assert_eq!(err.user_message(), "Title is required");
    }

    #[test]
    fn backend_errors_translate() {
        let err: NoteHubError = BackendError::NotFound("notes/x".to_string()).into();
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Note not found");

        let err: NoteHubError = BackendError::Unavailable("db".to_string()).into();
        assert!(matches!(err, NoteHubError::StorageUnavailable(_)));
        assert!(err.is_retryable());

        let err: NoteHubError = BackendError::Auth(AuthFailure::InvalidCredentials).into();
        assert_eq!(
            err.user_message(),
            "Failed to log in. Please check your credentials."
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn unauthenticated_message() {
        assert_eq!(
            NoteHubError::Unauthenticated.user_message(),
            "Please log in to continue."
        );
    }
}
