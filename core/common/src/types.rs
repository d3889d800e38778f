//! Identity and session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Unique identifier for an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::Validation(
                "UserId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique, provider-assigned identifier for a vault record.
///
/// Ordered, so it can serve as the stable tie-break key when records share a
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new RecordId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::Validation(
                "RecordId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credential passphrase wrapper that zeroizes on drop.
///
/// Holds the password a user types into the sign-up/sign-in forms for the
/// short window between input and the provider call.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the passphrase text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase([REDACTED; {} bytes])", self.0.len())
    }
}

/// An authenticated principal, owned by the identity provider.
///
/// The client holds a read-only copy whose lifetime is bounded by the active
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier assigned by the provider.
    pub id: UserId,
    /// Account email address.
    pub email: String,
    /// Display name captured at sign-up, if any.
    pub display_name: Option<String>,
    /// When this principal last authenticated. `None` means the account has
    /// never completed a sign-in before — the signal for a fresh first login.
    pub last_authenticated_at: Option<DateTime<Utc>>,
}

/// An active authentication grant tied to one Identity.
///
/// Zero or one of these exist per running client at any time, never more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The identity this session was issued for.
    pub identity: Identity,
    /// Opaque bearer token issued by the provider.
    pub access_token: String,
    /// When the grant was issued.
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_creation() {
        let id = UserId::new("user-1").unwrap();
        assert_eq!(id.as_str(), "user-1");
    }

    #[test]
    fn test_user_id_empty_fails() {
        assert!(UserId::new("").is_err());
    }

    #[test]
    fn test_record_id_ordering() {
        let a = RecordId::new("a").unwrap();
        let b = RecordId::new("b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_passphrase_debug_redacted() {
        let passphrase = Passphrase::new("hunter2");
        let rendered = format!("{:?}", passphrase);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_session_serialization() {
        let session = Session {
            identity: Identity {
                id: UserId::new("user-1").unwrap(),
                email: "me@example.com".to_string(),
                display_name: Some("Me".to_string()),
                last_authenticated_at: None,
            },
            access_token: "token".to_string(),
            issued_at: Utc::now(),
        };

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }
}
