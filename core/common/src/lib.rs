//! Common types shared across CyberVault modules.
//!
//! This module provides the error taxonomy and the data model that the
//! provider boundary, session manager and vault store all speak, ensuring
//! consistency and type safety.

pub mod error;
pub mod record;
pub mod types;

pub use error::{AuthError, Error, Result, StoreError};
pub use record::{generate_password, Category, RecordDraft, VaultRecord, DEFAULT_PASSWORD_LENGTH};
pub use types::{Identity, Passphrase, RecordId, Session, UserId};
