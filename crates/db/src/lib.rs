//! Storage layer for Ledgerline.
//!
//! Keeps every employee ledger in memory, serializes writes per employee, and
//! injects the clock so tests can control time.

pub mod clock;
pub mod repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use repository::{IssueAdvanceInput, LedgerRepository};
