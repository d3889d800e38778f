//! Auth state machine and user-facing notices.

use cybervault_common::{Identity, Session};

/// State of the authentication lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No determination has been made yet.
    Unknown,
    /// A session is active for the given identity.
    Authenticated {
        identity: Identity,
        session: Session,
    },
    /// No session exists.
    Unauthenticated,
}

impl AuthState {
    /// Check if a session is active.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Get the authenticated identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Get the active session, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated { session, .. } => Some(session),
            _ => None,
        }
    }
}

/// User-facing session notices, delivered to a single subscriber.
///
/// Carries only events presentation should surface; state itself travels on
/// the watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Greet the user after a fresh sign-in. Never emitted for a silently
    /// restored session.
    Welcome { email: String },
    /// Account registered; confirmation is pending.
    ConfirmationSent { email: String },
    /// The user explicitly signed out.
    SignedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_not_authenticated() {
        assert!(!AuthState::Unknown.is_authenticated());
        assert!(AuthState::Unknown.identity().is_none());
        assert!(AuthState::Unknown.session().is_none());
    }
}
