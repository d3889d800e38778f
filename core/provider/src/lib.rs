//! Identity and persistence provider abstraction for CyberVault.
//!
//! This module provides a trait-based interface to the remote service that
//! owns accounts, sessions and vault rows, plus a provider registry for
//! dynamic resolution by name and configuration.
//!
//! # Design Principles
//! - Provider isolation: no provider-specific logic leaks into the session
//!   manager or the vault store
//! - Async operations: every remote call is async and non-blocking
//! - Push-driven sessions: session transitions are delivered as events, not
//!   inferred from call results

pub mod config;
pub mod memory;
pub mod provider;
pub mod registry;

pub use config::ClientConfig;
pub use memory::MemoryProvider;
pub use provider::{Provider, SessionEvent};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
