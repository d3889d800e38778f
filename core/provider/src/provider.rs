//! Provider trait definition.

use async_trait::async_trait;
use tokio::sync::broadcast;

use cybervault_common::{
    AuthError, Passphrase, RecordDraft, RecordId, Session, StoreError, UserId, VaultRecord,
};

/// A session transition pushed by the provider.
///
/// Fired on every transition, including ones originating outside this
/// process (another tab, a background token refresh).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was established.
    SignedIn(Session),
    /// The active session ended.
    SignedOut,
    /// The active session's token was renewed.
    Refreshed(Session),
}

/// Identity and persistence provider for CyberVault clients.
///
/// The provider owns accounts, session grants and vault rows; the client
/// holds no authority of its own. All operations are async. Record
/// operations are scoped to the owning identity — a provider must never
/// return or mutate rows the caller does not own.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name (e.g., "memory").
    fn name(&self) -> &str;

    /// Register a new account.
    ///
    /// Registration does not establish a session: the provider confirms the
    /// account asynchronously and announces the resulting session through
    /// [`Provider::session_events`].
    ///
    /// # Errors
    /// - Account already registered
    /// - Network failure
    async fn sign_up(
        &self,
        email: &str,
        passphrase: &Passphrase,
        display_name: &str,
    ) -> Result<(), AuthError>;

    /// Authenticate with email and passphrase.
    ///
    /// On success the provider establishes a session and pushes a
    /// [`SessionEvent::SignedIn`]; the call result only reports acceptance.
    ///
    /// # Errors
    /// - Invalid credentials
    /// - Account not confirmed
    /// - Network failure
    async fn sign_in(&self, email: &str, passphrase: &Passphrase) -> Result<(), AuthError>;

    /// End the active session, if any. Pushes [`SessionEvent::SignedOut`].
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Read the currently valid session, if one was previously issued and
    /// has not expired.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribe to session transitions.
    ///
    /// The subscription is process-wide; callers acquire it once at startup
    /// and hold it for the process lifetime.
    fn session_events(&self) -> broadcast::Receiver<SessionEvent>;

    /// List all records owned by `owner`, in provider order.
    async fn list_records(&self, owner: &UserId) -> Result<Vec<VaultRecord>, StoreError>;

    /// Insert a new record for `owner`.
    ///
    /// The provider assigns the id and creation timestamp.
    async fn insert_record(&self, owner: &UserId, draft: &RecordDraft)
        -> Result<(), StoreError>;

    /// Replace the editable field set of the record with `id`.
    ///
    /// No version check is performed; the last write wins.
    ///
    /// # Errors
    /// - Record not found
    /// - Network failure
    async fn update_record(&self, id: &RecordId, draft: &RecordDraft) -> Result<(), StoreError>;

    /// Permanently delete the record with `id`.
    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError>;
}
