//! Reactive vault collection store for CyberVault.
//!
//! This module provides:
//! - The authoritative in-memory snapshot of the user's vault records
//! - Mutate-then-resync operations (create, update, toggle, delete)
//! - Pure, synchronous view derivation (search, category, favorites)
//! - A watch channel presentation observes instead of re-filtering

pub mod filter;
pub mod store;

pub use filter::{derive_view, CategoryFilter, VaultView, ViewFilter};
pub use store::{ConfirmGate, DeleteOutcome, VaultStore};
