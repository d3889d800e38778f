//! Authentication session management for CyberVault.
//!
//! This module provides:
//! - The auth state machine (`Unknown` → `Authenticated`/`Unauthenticated`)
//! - A reactive state channel that presentation observes
//! - The provider event listener driving every state transition
//! - The user-facing notice stream (welcome, confirmation, sign-out)

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::{AuthState, SessionNotice};
