//! Core bookkeeping logic for Ledgerline.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Entries, running balances, and the per-employee ledger aggregate
//! - `advance` - Cash advance issuance, utilization, and status
//! - `opening` - Opening balances and replays
//! - `summary` - Balance aggregation
//! - `preview` - Dry-run postings
//! - `reconciliation` - Period reconciliation and chain checks
//! - `statistics` - Cross-employee rollups

pub mod advance;
pub mod ledger;
pub mod opening;
pub mod preview;
pub mod reconciliation;
pub mod statistics;
pub mod summary;

pub use advance::{Advance, AdvanceFilter, AdvanceStatus, AdvanceTracker};
pub use ledger::{
    ApprovalStatus, Direction, EmployeeLedger, EntryDraft, EntryFilter, EntryKind, LedgerEntry,
    LedgerError, PostingContext, PostingOutcome,
};
pub use opening::{OpeningBalance, OpeningOutcome};
pub use preview::{Preview, PreviewEngine, PreviewWarning};
pub use reconciliation::{ReconciliationEngine, ReconciliationSummary};
pub use statistics::LedgerStatistics;
pub use summary::{BalanceAggregator, BalanceSummary, CurrentBalance};
