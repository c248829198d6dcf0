//! Stock level alerting.
//!
//! Pure classification of derived stock quantities against per-product
//! thresholds. Dashboards call [`classify`] per stock entry; nothing here
//! performs IO or mutates state.

pub mod level;

pub use level::{classify, summarize, AlertSummary, StockLevel};
