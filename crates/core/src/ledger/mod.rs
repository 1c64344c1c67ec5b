//! Employee ledger bookkeeping.
//!
//! This module implements the core ledger functionality:
//! - Ledger entries and drafts
//! - Running balance maintenance and chain verification
//! - The per-employee ledger aggregate and its posting path
//! - Entry filters and the audit trail
//! - Error types for ledger operations

pub mod audit;
pub mod balance;
pub mod book;
pub mod entry;
pub mod error;
pub mod filter;

#[cfg(test)]
mod book_props;

pub use audit::{AuditEvent, AuditKind};
pub use balance::{ChainBreak, RunningBalance, Totals};
pub use book::{EmployeeLedger, PostingContext, PostingOutcome};
pub use entry::{ApprovalStatus, Direction, EntryDraft, EntryKind, LedgerEntry};
pub use error::LedgerError;
pub use filter::EntryFilter;
