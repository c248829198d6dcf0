//! Infrastructure and orchestration for the stock ledger core.
//!
//! The ledger store is the source of truth (append-only movement facts);
//! the stock store is the disposable materialized view the reconciliation
//! engine keeps in sync — incrementally on every applied movement, and
//! wholesale through rebuild-from-history.

pub mod aggregator;
pub mod ledger_store;
pub mod reconciliation;
pub mod service;
pub mod stock_store;
