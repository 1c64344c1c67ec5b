//! Cash advance tracking.
//!
//! An advance is issued as a credit on the employee ledger and drawn down by
//! approved expenses that reference it.

pub mod tracker;
pub mod types;

pub use tracker::{AdvanceTracker, IssueAdvance};
pub use types::{Advance, AdvanceFilter, AdvanceStatus};
