//! Error types reported by backend collaborators
//!
//! These mirror the failure classes a hosted backend surfaces to its client
//! SDK. The client crate translates them into user-facing errors.

/// Backend failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Document or object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected by backend authorization rules
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Service exists but cannot be reached or is not provisioned
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Service was never configured for this project
    #[error("not configured: {0}")]
    Unconfigured(String),

    /// Malformed request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Identity provider rejected the request
    #[error("authentication rejected: {0}")]
    Auth(AuthFailure),

    /// Any other network or server failure
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BackendError {
    /// Check if error is a missing-resource error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Identity provider rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered
    #[error("email already in use")]
    EmailInUse,

    /// Password below the provider minimum
    #[error("weak password")]
    WeakPassword,

    /// Email is not well formed
    #[error("invalid email")]
    InvalidEmail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = BackendError::NotFound("notes/abc".to_string());
        assert_eq!(err.to_string(), "not found: notes/abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn auth_failure_display() {
        let err = BackendError::Auth(AuthFailure::WeakPassword);
        assert!(err.to_string().contains("weak password"));
        assert!(!err.is_not_found());
    }
}
