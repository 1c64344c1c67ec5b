//! Entry list filters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entry::{ApprovalStatus, Direction, EntryKind, LedgerEntry};

/// Criteria for listing ledger entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Only entries of this kind.
    pub kind: Option<EntryKind>,
    /// Only entries in this direction.
    pub direction: Option<Direction>,
    /// Only entries in this approval state.
    pub approval_status: Option<ApprovalStatus>,
    /// Inclusive lower bound on the entry date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the entry date.
    pub date_to: Option<NaiveDate>,
}

impl EntryFilter {
    /// Returns true if the entry passes every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        let date = entry.entry_date();
        self.kind.is_none_or(|kind| entry.kind == kind)
            && self.direction.is_none_or(|direction| entry.direction == direction)
            && self
                .approval_status
                .is_none_or(|status| entry.approval_status == status)
            && self.date_from.is_none_or(|from| date >= from)
            && self.date_to.is_none_or(|to| date <= to)
    }
}
