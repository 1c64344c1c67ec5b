//! Ledger entry domain types.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of bookkeeping fact an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Cash advance handed to the employee.
    #[serde(alias = "ADVANCE")]
    AdvanceIssue,
    /// Expense paid by the employee, optionally drawn against an advance.
    Expense,
    /// Unspent cash handed back by the employee.
    CashReturn,
    /// Money paid out to the employee for out-of-pocket spending.
    Reimbursement,
    /// Genesis entry carrying the ledger's starting balance.
    OpeningBalance,
}

impl EntryKind {
    /// Returns the wire representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdvanceIssue => "ADVANCE_ISSUE",
            Self::Expense => "EXPENSE",
            Self::CashReturn => "CASH_RETURN",
            Self::Reimbursement => "REIMBURSEMENT",
            Self::OpeningBalance => "OPENING_BALANCE",
        }
    }

    /// Parses a kind, accepting any case and `-` or `_` separators.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "ADVANCE_ISSUE" | "ADVANCE" => Some(Self::AdvanceIssue),
            "EXPENSE" => Some(Self::Expense),
            "CASH_RETURN" => Some(Self::CashReturn),
            "REIMBURSEMENT" => Some(Self::Reimbursement),
            "OPENING_BALANCE" => Some(Self::OpeningBalance),
            _ => None,
        }
    }

    /// Direction implied by a transactional kind.
    ///
    /// Returns `None` for `OpeningBalance`, whose direction follows the sign of
    /// the opening amount.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::AdvanceIssue | Self::Reimbursement => Some(Direction::Credit),
            Self::Expense | Self::CashReturn => Some(Direction::Debit),
            Self::OpeningBalance => None,
        }
    }

    /// Returns true for every kind except the opening balance.
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        !matches!(self, Self::OpeningBalance)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect of an entry on the employee's available balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Increases the balance (CR).
    Credit,
    /// Decreases the balance (DR).
    Debit,
}

impl Direction {
    /// Returns the wire representation of the direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }

    /// Parses a direction from `CR`/`DR` or the full word, any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CR" | "CREDIT" => Some(Self::Credit),
            "DR" | "DEBIT" => Some(Self::Debit),
            _ => None,
        }
    }

    /// Applies the direction's sign to an amount.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of an entry.
///
/// Only `Approved` entries move the running balance. The valid transitions are
/// `Pending → Approved` and `Pending → Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting a decision; visible but excluded from balances.
    Pending,
    /// Counts toward the running balance.
    #[default]
    Approved,
    /// Never counts toward the running balance.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses a status, any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if a move from `self` to `to` is allowed.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!((self, to), (Self::Pending, Self::Approved | Self::Rejected))
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bookkeeping fact on an employee ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Position in the employee's ledger; 0 is reserved for the opening balance.
    pub sequence: u64,
    /// What the entry records.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Whether the entry raises or lowers the balance.
    pub direction: Direction,
    /// Unsigned amount.
    pub amount: Decimal,
    /// Balance immediately after this entry. Derived; rewritten only by replays.
    pub running_balance: Decimal,
    /// Advance drawn down by this expense.
    pub related_advance_id: Option<AdvanceId>,
    /// External record carried for reporting only.
    pub related_entity: Option<String>,
    /// Free-form note.
    pub description: Option<String>,
    /// Approval state.
    pub approval_status: ApprovalStatus,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
    /// Who recorded the entry.
    pub created_by: UserId,
}

impl LedgerEntry {
    /// Returns true if the entry counts toward balances.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }

    /// Returns true for the opening-balance genesis entry.
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.kind == EntryKind::OpeningBalance
    }

    /// Signed amount (positive for credit, negative for debit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.direction.signed(self.amount)
    }

    /// Change this entry applies to the running balance.
    ///
    /// Zero for non-approved entries and for the genesis entry, which sets the
    /// baseline instead of moving it.
    #[must_use]
    pub fn balance_effect(&self) -> Decimal {
        if self.is_opening() || !self.is_approved() {
            Decimal::ZERO
        } else {
            self.signed_amount()
        }
    }

    /// Calendar date the entry was recorded on.
    #[must_use]
    pub fn entry_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// A prospective entry, as submitted by a caller.
///
/// The same draft feeds both real postings and previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// What the entry records.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Amount; must be positive except for opening balances, which are signed.
    pub amount: Decimal,
    /// Advance to draw down (expenses only).
    #[serde(default)]
    pub related_advance_id: Option<AdvanceId>,
    /// External record carried for reporting only.
    #[serde(default)]
    pub related_entity: Option<String>,
    /// Free-form note.
    #[serde(default)]
    pub description: Option<String>,
    /// Purpose of an advance (advance issues only).
    #[serde(default)]
    pub purpose: Option<String>,
    /// Expiry of an advance (advance issues only).
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Effective date of an opening balance; defaults to the posting date.
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    /// Initial approval state.
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    /// Ledger version the caller last observed; a mismatch aborts the posting.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl EntryDraft {
    /// Creates a bare draft of the given kind.
    #[must_use]
    pub fn new(kind: EntryKind, amount: Decimal) -> Self {
        Self {
            kind,
            amount,
            related_advance_id: None,
            related_entity: None,
            description: None,
            purpose: None,
            expiry_date: None,
            effective_date: None,
            approval_status: ApprovalStatus::Approved,
            expected_version: None,
        }
    }

    /// Draft for an advance issue.
    #[must_use]
    pub fn advance_issue(amount: Decimal, purpose: impl Into<String>) -> Self {
        Self {
            purpose: Some(purpose.into()),
            ..Self::new(EntryKind::AdvanceIssue, amount)
        }
    }

    /// Draft for a plain expense debit.
    #[must_use]
    pub fn expense(amount: Decimal) -> Self {
        Self::new(EntryKind::Expense, amount)
    }

    /// Draft for a cash return debit.
    #[must_use]
    pub fn cash_return(amount: Decimal) -> Self {
        Self::new(EntryKind::CashReturn, amount)
    }

    /// Draft for a reimbursement credit.
    #[must_use]
    pub fn reimbursement(amount: Decimal) -> Self {
        Self::new(EntryKind::Reimbursement, amount)
    }

    /// Draft for an opening balance.
    #[must_use]
    pub fn opening_balance(amount: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            effective_date: Some(effective_date),
            ..Self::new(EntryKind::OpeningBalance, amount)
        }
    }

    /// Draws the expense against an advance.
    #[must_use]
    pub fn against_advance(mut self, advance_id: AdvanceId) -> Self {
        self.related_advance_id = Some(advance_id);
        self
    }

    /// Sets the advance expiry.
    #[must_use]
    pub fn expiring_on(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Submits the draft for approval instead of posting it approved.
    #[must_use]
    pub fn pending(mut self) -> Self {
        self.approval_status = ApprovalStatus::Pending;
        self
    }

    /// Requires the ledger to be at `version` when the draft is posted.
    #[must_use]
    pub fn at_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches an external reference.
    #[must_use]
    pub fn for_entity(mut self, entity: impl Into<String>) -> Self {
        self.related_entity = Some(entity.into());
        self
    }
}
