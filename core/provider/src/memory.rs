//! In-memory provider for testing and local development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::provider::{Provider, SessionEvent};
use cybervault_common::{
    AuthError, Identity, Passphrase, RecordDraft, RecordId, Session, StoreError, UserId,
    VaultRecord,
};

/// A registered account.
struct Account {
    identity: Identity,
    passphrase: Passphrase,
    confirmed: bool,
}

/// In-memory identity and persistence provider.
///
/// Accounts, the active session and vault rows all live in process memory
/// and are lost on drop. Sign-up leaves the account unconfirmed until
/// [`MemoryProvider::confirm_account`] runs, mirroring an email-confirmation
/// step; [`MemoryProvider::auto_confirming`] collapses that step the way
/// hosted providers allow confirmation to be disabled.
///
/// Row ownership is enforced by the hosted service in a real deployment;
/// this stand-in scopes listing by the owner argument and trusts its caller
/// for id-addressed mutations.
pub struct MemoryProvider {
    accounts: RwLock<HashMap<String, Account>>,
    session: RwLock<Option<Session>>,
    records: RwLock<HashMap<RecordId, VaultRecord>>,
    events: broadcast::Sender<SessionEvent>,
    offline: AtomicBool,
    auto_confirm: bool,
}

impl MemoryProvider {
    /// Create an empty provider requiring explicit account confirmation.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            accounts: RwLock::new(HashMap::new()),
            session: RwLock::new(None),
            records: RwLock::new(HashMap::new()),
            events,
            offline: AtomicBool::new(false),
            auto_confirm: false,
        }
    }

    /// Create a provider that confirms accounts immediately on sign-up.
    pub fn auto_confirming() -> Self {
        Self {
            auto_confirm: true,
            ..Self::new()
        }
    }

    /// Simulate losing (or regaining) the connection to the provider.
    ///
    /// While offline, every remote operation fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Confirm a registered account and establish its first session.
    ///
    /// Pushes the fresh [`SessionEvent::SignedIn`]: the identity carried by
    /// the event has no last-authenticated timestamp yet, which is what
    /// marks a first login as fresh downstream.
    ///
    /// # Errors
    /// - No account registered for `email`
    pub fn confirm_account(&self, email: &str) -> Result<(), AuthError> {
        let session = {
            let mut accounts = self.accounts.write().unwrap();
            let account = accounts
                .get_mut(email)
                .ok_or(AuthError::InvalidCredentials)?;
            account.confirmed = true;
            let session = Self::issue(account.identity.clone());
            // Stamped after the event session is built, so the pushed
            // identity still reads as never-authenticated.
            account.identity.last_authenticated_at = Some(Utc::now());
            session
        };

        debug!(email, "account confirmed");
        *self.session.write().unwrap() = Some(session.clone());
        let _ = self.events.send(SessionEvent::SignedIn(session));
        Ok(())
    }

    fn issue(identity: Identity) -> Session {
        Session {
            identity,
            access_token: Uuid::new_v4().to_string(),
            issued_at: Utc::now(),
        }
    }

    fn check_auth_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Network("provider is offline".to_string()));
        }
        Ok(())
    }

    fn check_records_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("provider is offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn sign_up(
        &self,
        email: &str,
        passphrase: &Passphrase,
        display_name: &str,
    ) -> Result<(), AuthError> {
        self.check_auth_online()?;

        {
            let mut accounts = self.accounts.write().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::AlreadyRegistered);
            }

            let identity = Identity {
                id: UserId::new(Uuid::new_v4().to_string()).expect("generated id is non-empty"),
                email: email.to_string(),
                display_name: (!display_name.trim().is_empty())
                    .then(|| display_name.trim().to_string()),
                last_authenticated_at: None,
            };
            accounts.insert(
                email.to_string(),
                Account {
                    identity,
                    passphrase: passphrase.clone(),
                    confirmed: false,
                },
            );
        }

        debug!(email, "account registered");
        if self.auto_confirm {
            self.confirm_account(email)?;
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, passphrase: &Passphrase) -> Result<(), AuthError> {
        self.check_auth_online()?;

        let session = {
            let mut accounts = self.accounts.write().unwrap();
            let account = accounts
                .get_mut(email)
                .ok_or(AuthError::InvalidCredentials)?;
            if account.passphrase.as_str() != passphrase.as_str() {
                return Err(AuthError::InvalidCredentials);
            }
            if !account.confirmed {
                return Err(AuthError::Unconfirmed);
            }
            account.identity.last_authenticated_at = Some(Utc::now());
            Self::issue(account.identity.clone())
        };

        debug!(email, "signed in");
        *self.session.write().unwrap() = Some(session.clone());
        let _ = self.events.send(SessionEvent::SignedIn(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.check_auth_online()?;

        let had_session = self.session.write().unwrap().take();
        if had_session.is_some() {
            debug!("signed out");
            let _ = self.events.send(SessionEvent::SignedOut);
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.check_auth_online()?;
        Ok(self.session.read().unwrap().clone())
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn list_records(&self, owner: &UserId) -> Result<Vec<VaultRecord>, StoreError> {
        self.check_records_online()?;

        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .filter(|record| record.owner_id == *owner)
            .cloned()
            .collect())
    }

    async fn insert_record(
        &self,
        owner: &UserId,
        draft: &RecordDraft,
    ) -> Result<(), StoreError> {
        self.check_records_online()?;

        let record = VaultRecord {
            id: RecordId::new(Uuid::new_v4().to_string()).expect("generated id is non-empty"),
            owner_id: owner.clone(),
            title: draft.title.clone(),
            website_url: draft.website_url.clone(),
            username: draft.username.clone(),
            secret_value: draft.secret_value.clone(),
            notes: draft.notes.clone(),
            category: draft.category.clone(),
            is_favorite: draft.is_favorite,
            created_at: Utc::now(),
        };

        debug!(id = %record.id, "record inserted");
        self.records.write().unwrap().insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_record(&self, id: &RecordId, draft: &RecordDraft) -> Result<(), StoreError> {
        self.check_records_online()?;

        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        record.title = draft.title.clone();
        record.website_url = draft.website_url.clone();
        record.username = draft.username.clone();
        record.secret_value = draft.secret_value.clone();
        record.notes = draft.notes.clone();
        record.category = draft.category.clone();
        record.is_favorite = draft.is_favorite;
        Ok(())
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError> {
        self.check_records_online()?;

        self.records
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passphrase() -> Passphrase {
        Passphrase::new("correct horse")
    }

    async fn signed_in_provider() -> (MemoryProvider, UserId) {
        let provider = MemoryProvider::new();
        provider
            .sign_up("me@example.com", &passphrase(), "Me")
            .await
            .unwrap();
        provider.confirm_account("me@example.com").unwrap();
        let owner = provider
            .current_session()
            .await
            .unwrap()
            .unwrap()
            .identity
            .id;
        (provider, owner)
    }

    #[tokio::test]
    async fn test_sign_up_does_not_establish_session() {
        let provider = MemoryProvider::new();
        provider
            .sign_up("me@example.com", &passphrase(), "Me")
            .await
            .unwrap();

        assert!(provider.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_fails() {
        let provider = MemoryProvider::new();
        provider
            .sign_up("me@example.com", &passphrase(), "Me")
            .await
            .unwrap();

        let result = provider.sign_up("me@example.com", &passphrase(), "Me").await;
        assert_eq!(result, Err(AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_sign_in_before_confirmation_fails() {
        let provider = MemoryProvider::new();
        provider
            .sign_up("me@example.com", &passphrase(), "Me")
            .await
            .unwrap();

        let result = provider.sign_in("me@example.com", &passphrase()).await;
        assert_eq!(result, Err(AuthError::Unconfirmed));
    }

    #[tokio::test]
    async fn test_wrong_passphrase_fails() {
        let (provider, _) = signed_in_provider().await;
        let result = provider
            .sign_in("me@example.com", &Passphrase::new("wrong"))
            .await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_confirmation_pushes_fresh_sign_in() {
        let provider = MemoryProvider::new();
        let mut events = provider.session_events();

        provider
            .sign_up("me@example.com", &passphrase(), "Me")
            .await
            .unwrap();
        provider.confirm_account("me@example.com").unwrap();

        match events.recv().await.unwrap() {
            SessionEvent::SignedIn(session) => {
                assert!(session.identity.last_authenticated_at.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_explicit_sign_in_is_not_fresh() {
        let (provider, _) = signed_in_provider().await;
        let mut events = provider.session_events();

        provider
            .sign_in("me@example.com", &passphrase())
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            SessionEvent::SignedIn(session) => {
                assert!(session.identity.last_authenticated_at.is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_pushes_event() {
        let (provider, _) = signed_in_provider().await;
        let mut events = provider.session_events();

        provider.sign_out().await.unwrap();

        assert!(provider.current_session().await.unwrap().is_none());
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut
        ));
    }

    #[tokio::test]
    async fn test_auto_confirming_signs_in_on_sign_up() {
        let provider = MemoryProvider::auto_confirming();
        provider
            .sign_up("me@example.com", &passphrase(), "Me")
            .await
            .unwrap();

        assert!(provider.current_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_crud() {
        let (provider, owner) = signed_in_provider().await;

        let draft = RecordDraft::new("Gmail");
        provider.insert_record(&owner, &draft).await.unwrap();

        let records = provider.list_records(&owner).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Gmail");
        assert!(!records[0].is_favorite);

        let id = records[0].id.clone();
        let mut updated = records[0].to_draft();
        updated.is_favorite = true;
        provider.update_record(&id, &updated).await.unwrap();

        let records = provider.list_records(&owner).await.unwrap();
        assert!(records[0].is_favorite);

        provider.delete_record(&id).await.unwrap();
        assert!(provider.list_records(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_owner() {
        let (provider, owner) = signed_in_provider().await;
        let stranger = UserId::new("someone-else").unwrap();

        provider
            .insert_record(&owner, &RecordDraft::new("Mine"))
            .await
            .unwrap();

        assert!(provider.list_records(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let (provider, _) = signed_in_provider().await;
        let id = RecordId::new("missing").unwrap();

        let result = provider.update_record(&id, &RecordDraft::new("T")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_offline_fails_record_operations() {
        let (provider, owner) = signed_in_provider().await;
        provider.set_offline(true);

        let result = provider.list_records(&owner).await;
        assert!(matches!(result, Err(StoreError::Network(_))));

        provider.set_offline(false);
        assert!(provider.list_records(&owner).await.is_ok());
    }
}
