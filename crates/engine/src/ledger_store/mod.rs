//! Append-only movement ledger boundary.
//!
//! This module defines the infrastructure-facing abstraction for persisting
//! and replaying the movement stream without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError};
