//! Common error types for CyberVault.

use thiserror::Error;

/// Errors reported by the identity side of the provider boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Email/password combination was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account exists but has not been confirmed yet.
    #[error("account has not been confirmed")]
    Unconfirmed,

    /// An account already exists for this email.
    #[error("an account is already registered for this email")]
    AlreadyRegistered,

    /// The provider could not be reached.
    #[error("network failure: {0}")]
    Network(String),

    /// Any other provider-side failure.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Errors reported by the record side of the provider boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The provider could not be reached.
    #[error("network failure: {0}")]
    Network(String),

    /// No record with the given id exists.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The caller does not own the record.
    #[error("access denied: {0}")]
    Denied(String),
}

/// Top-level error type for CyberVault client operations.
///
/// Every remote-boundary failure is converted into one of these variants at
/// the point of the call; none propagate as uncaught faults, and no variant
/// is ever retried automatically.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication operation failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Fetching the vault collection failed; the prior snapshot is retained.
    #[error("failed to load vault records: {0}")]
    Load(StoreError),

    /// A create/update/delete/toggle failed; no partial state was applied.
    #[error("vault mutation failed: {0}")]
    Mutation(StoreError),

    /// Invalid input, caught locally before any remote call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The provider session-event subscription was lost.
    #[error("session subscription failed: {0}")]
    Subscription(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_into_error() {
        let err: Error = AuthError::InvalidCredentials.into();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_error_display() {
        let err = Error::Load(StoreError::Network("connection reset".to_string()));
        assert_eq!(
            err.to_string(),
            "failed to load vault records: network failure: connection reset"
        );
    }
}
