//! Derived stock store boundary (the materialized read model).
//!
//! Entries here are **disposable**: the ledger is the source of truth and
//! the reconciliation engine can rebuild this table from history at any
//! time. Writers go through the versioned atomic commit so concurrent
//! incremental applies on the same key serialize instead of losing updates.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use r#trait::{StockEntry, StockKey, StockStore, StockStoreError, StockWrite};
