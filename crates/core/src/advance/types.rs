//! Advance domain types.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a cash advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceStatus {
    /// Nothing has been drawn yet.
    Open,
    /// Partly drawn down.
    PartiallyUtilized,
    /// Nothing left to draw.
    FullyUtilized,
    /// Past its expiry date with money left on it.
    Expired,
    /// Explicitly closed; terminal.
    Closed,
}

impl AdvanceStatus {
    /// Returns the wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::PartiallyUtilized => "PARTIALLY_UTILIZED",
            Self::FullyUtilized => "FULLY_UTILIZED",
            Self::Expired => "EXPIRED",
            Self::Closed => "CLOSED",
        }
    }

    /// Parses a status, any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "OPEN" => Some(Self::Open),
            "PARTIALLY_UTILIZED" => Some(Self::PartiallyUtilized),
            "FULLY_UTILIZED" => Some(Self::FullyUtilized),
            "EXPIRED" => Some(Self::Expired),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns true if expenses can no longer be drawn against the advance.
    #[must_use]
    pub fn blocks_utilization(&self) -> bool {
        matches!(self, Self::Closed | Self::Expired)
    }
}

impl fmt::Display for AdvanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cash advance issued to an employee.
///
/// `remaining_balance` always equals `amount - utilized_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    /// Unique identifier.
    pub id: AdvanceId,
    /// Employee holding the advance.
    pub employee_id: EmployeeId,
    /// The ADVANCE_ISSUE credit entry that created it.
    pub issue_entry_id: LedgerEntryId,
    /// Amount issued.
    pub amount: Decimal,
    /// Stated purpose (e.g. TRAVEL).
    pub purpose: String,
    /// Σ approved expenses drawn against it.
    pub utilized_amount: Decimal,
    /// Amount still available.
    pub remaining_balance: Decimal,
    /// Current lifecycle state.
    pub status: AdvanceStatus,
    /// Date of issue.
    pub issued_date: NaiveDate,
    /// Last day expenses can be drawn.
    pub expiry_date: Option<NaiveDate>,
    /// When the advance was closed.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Advance {
    /// Derives the status as of `as_of`.
    ///
    /// Closed is sticky, then fully utilized, then expired, then open or partial.
    #[must_use]
    pub fn derive_status(&self, as_of: NaiveDate) -> AdvanceStatus {
        if self.closed_at.is_some() {
            AdvanceStatus::Closed
        } else if self.remaining_balance.is_zero() {
            AdvanceStatus::FullyUtilized
        } else if self.expiry_date.is_some_and(|expiry| as_of > expiry) {
            AdvanceStatus::Expired
        } else if self.remaining_balance == self.amount {
            AdvanceStatus::Open
        } else {
            AdvanceStatus::PartiallyUtilized
        }
    }

    /// Recomputes the remaining balance and status in place.
    pub fn recompute(&mut self, as_of: NaiveDate) {
        self.remaining_balance = self.amount - self.utilized_amount;
        self.status = self.derive_status(as_of);
    }

    /// Returns a copy with the status refreshed for `as_of`.
    #[must_use]
    pub fn as_of(&self, as_of: NaiveDate) -> Self {
        let mut advance = self.clone();
        advance.recompute(as_of);
        advance
    }
}

/// Filters for advance listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvanceFilter {
    /// Only advances held by this employee.
    pub employee_id: Option<EmployeeId>,
    /// Only advances in this status.
    pub status: Option<AdvanceStatus>,
}

impl AdvanceFilter {
    /// Returns true if the advance passes every set criterion.
    #[must_use]
    pub fn matches(&self, advance: &Advance) -> bool {
        self.employee_id.is_none_or(|id| advance.employee_id == id)
            && self.status.is_none_or(|status| advance.status == status)
    }
}
