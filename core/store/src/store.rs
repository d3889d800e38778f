//! Vault collection store: load, mutate, resync.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cybervault_common::{Error, RecordDraft, RecordId, Result, UserId, VaultRecord};
use cybervault_provider::Provider;

use crate::filter::{derive_view, CategoryFilter, VaultView, ViewFilter};

/// Blocking yes/no gate asked before a delete is sent to the provider.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    /// Return `true` to proceed with deleting `record`.
    async fn confirm_delete(&self, record: &VaultRecord) -> bool;
}

/// Result of a gated delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record was deleted and the collection re-synced.
    Deleted,
    /// The user declined; nothing was sent to the provider.
    Cancelled,
}

/// Authoritative collection snapshot plus the issuance sequence of the load
/// that produced it.
struct Snapshot {
    records: Vec<VaultRecord>,
    applied_seq: u64,
}

/// Owns the authenticated user's set of vault records.
///
/// Bound to one identity for its whole lifetime: constructed once a session
/// is present and dropped (or cleared) at sign-out. All mutations go through
/// the provider and re-sync with a full `load` on success — there are no
/// optimistic local writes, so the snapshot always reflects an authoritative
/// provider response. Presentation observes the derived view through
/// [`VaultStore::subscribe`] and never re-filters.
pub struct VaultStore {
    provider: Arc<dyn Provider>,
    owner: UserId,
    snapshot: RwLock<Snapshot>,
    filter: RwLock<ViewFilter>,
    view: watch::Sender<VaultView>,
    issued: AtomicU64,
}

impl VaultStore {
    /// Create an empty store for `owner`'s records.
    pub fn new(provider: Arc<dyn Provider>, owner: UserId) -> Self {
        let (view, _) = watch::channel(VaultView::default());
        Self {
            provider,
            owner,
            snapshot: RwLock::new(Snapshot {
                records: Vec::new(),
                applied_seq: 0,
            }),
            filter: RwLock::new(ViewFilter::default()),
            view,
            issued: AtomicU64::new(0),
        }
    }

    /// The identity whose records this store holds.
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Fetch the full collection from the provider.
    ///
    /// Records are ordered newest-first, ties broken by id ascending.
    /// Re-entrant: responses are applied in issuance order, and a response
    /// arriving after a newer one has been applied is discarded. On failure
    /// the previous snapshot stays visible (stale but available) and the
    /// error is reported; never retried automatically.
    ///
    /// # Errors
    /// - `Error::Load` when the provider call fails
    pub async fn load(&self) -> Result<()> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, owner = %self.owner, "loading vault records");

        let mut records = self
            .provider
            .list_records(&self.owner)
            .await
            .map_err(|e| {
                warn!(error = %e, "vault load failed, keeping previous snapshot");
                Error::Load(e)
            })?;

        sort_records(&mut records);

        {
            let mut snapshot = self.snapshot.write().unwrap();
            if seq <= snapshot.applied_seq {
                debug!(
                    seq,
                    applied = snapshot.applied_seq,
                    "discarding stale load response"
                );
                return Ok(());
            }
            snapshot.applied_seq = seq;
            snapshot.records = records;
        }

        self.publish();
        Ok(())
    }

    /// Create a record from a draft and re-sync.
    ///
    /// # Errors
    /// - `Error::Validation` on an empty title, before any remote call
    /// - `Error::Mutation` when the insert fails; no partial state applied
    /// - `Error::Load` when the follow-up re-sync fails
    pub async fn create(&self, draft: RecordDraft) -> Result<()> {
        let draft = draft.normalized();
        draft.validate()?;

        self.provider
            .insert_record(&self.owner, &draft)
            .await
            .map_err(Error::Mutation)?;
        info!(title = %draft.title, "record created");

        self.load().await
    }

    /// Replace the editable fields of a record and re-sync.
    ///
    /// # Errors
    /// - Same as [`VaultStore::create`]
    pub async fn update(&self, id: &RecordId, draft: RecordDraft) -> Result<()> {
        let draft = draft.normalized();
        draft.validate()?;

        self.provider
            .update_record(id, &draft)
            .await
            .map_err(Error::Mutation)?;
        info!(id = %id, "record updated");

        self.load().await
    }

    /// Negate a record's favorite flag and re-sync. An involution: applying
    /// it twice restores the original flag.
    pub async fn toggle_favorite(&self, id: &RecordId) -> Result<()> {
        let record = self.find(id)?;
        let mut draft = record.to_draft();
        draft.is_favorite = !draft.is_favorite;

        self.provider
            .update_record(id, &draft)
            .await
            .map_err(Error::Mutation)?;
        debug!(id = %id, favorite = draft.is_favorite, "favorite toggled");

        self.load().await
    }

    /// Delete a record behind a confirmation gate.
    ///
    /// The gate is asked before anything is sent to the provider; declining
    /// cancels cleanly with no side effect.
    ///
    /// # Errors
    /// - `Error::NotFound` when the id is not in the current collection
    /// - `Error::Mutation` when the provider delete fails
    pub async fn delete(&self, id: &RecordId, gate: &dyn ConfirmGate) -> Result<DeleteOutcome> {
        let record = self.find(id)?;

        if !gate.confirm_delete(&record).await {
            debug!(id = %id, "delete declined at the confirmation gate");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.provider
            .delete_record(id)
            .await
            .map_err(Error::Mutation)?;
        info!(id = %id, "record deleted");

        self.load().await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Apply a new search term and re-derive the view.
    pub fn set_search(&self, term: impl Into<String>) {
        self.filter.write().unwrap().search = term.into();
        self.publish();
    }

    /// Apply a new category filter and re-derive the view.
    pub fn set_category(&self, category: CategoryFilter) {
        self.filter.write().unwrap().category = category;
        self.publish();
    }

    /// The filter intent currently applied.
    pub fn filter(&self) -> ViewFilter {
        self.filter.read().unwrap().clone()
    }

    /// The current derived view.
    pub fn view(&self) -> VaultView {
        self.view.borrow().clone()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> watch::Receiver<VaultView> {
        self.view.subscribe()
    }

    /// Drop the snapshot, e.g. when the owning session ends.
    pub fn clear(&self) {
        {
            let mut snapshot = self.snapshot.write().unwrap();
            snapshot.records.clear();
            // Any still-in-flight load predates the clear; make sure its
            // response cannot resurrect the dropped collection.
            snapshot.applied_seq = self.issued.load(Ordering::SeqCst);
        }
        debug!(owner = %self.owner, "collection cleared");
        self.publish();
    }

    fn find(&self, id: &RecordId) -> Result<VaultRecord> {
        self.snapshot
            .read()
            .unwrap()
            .records
            .iter()
            .find(|record| record.id == *id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("record {} is not in the collection", id)))
    }

    fn publish(&self) {
        let view = {
            let snapshot = self.snapshot.read().unwrap();
            let filter = self.filter.read().unwrap();
            derive_view(&snapshot.records, &filter)
        };
        self.view.send_replace(view);
    }
}

/// Sort newest-first; records sharing a timestamp order by id ascending.
pub(crate) fn sort_records(records: &mut [VaultRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
