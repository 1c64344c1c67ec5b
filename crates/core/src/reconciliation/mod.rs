//! Period reconciliation.
//!
//! Recomputes the closing balance for a date range from the opening balance
//! and in-range movements, compares it with what the ledger stores, and walks
//! the running balance chain for drift.

pub mod service;
pub mod types;


pub use service::ReconciliationEngine;
pub use types::{FindingKind, ReconciliationFinding, ReconciliationSummary};
