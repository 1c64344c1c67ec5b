//! Ledger error types for validation and state errors.
//!
//! Every variant is raised before any state is touched, so a failed operation
//! never leaves a partial write behind.

use chrono::NaiveDate;
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::entry::{ApprovalStatus, EntryKind};
use crate::advance::AdvanceStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transactional amounts must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    /// Only expenses may draw against an advance.
    #[error("{0} entries cannot reference an advance")]
    UnexpectedAdvanceReference(EntryKind),

    /// Amount or resulting balance is outside the range a ledger can hold.
    #[error("Amount {0} exceeds the supported ledger range")]
    AmountOverflow(Decimal),

    /// New entries start out APPROVED or PENDING.
    #[error("Entries cannot be posted as {0}")]
    InvalidInitialStatus(ApprovalStatus),

    /// The entry kind must be posted already approved.
    #[error("{0} entries cannot be submitted for approval")]
    ApprovalNotSupported(EntryKind),

    /// Reconciliation range is inverted.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Requested start of the range.
        start: NaiveDate,
        /// Requested end of the range.
        end: NaiveDate,
    },

    // ========== Lookup Errors ==========
    /// No ledger exists for the employee.
    #[error("No ledger found for employee {0}")]
    EmployeeNotFound(EmployeeId),

    /// Advance not found.
    #[error("Advance not found: {0}")]
    AdvanceNotFound(AdvanceId),

    /// Ledger entry not found.
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(LedgerEntryId),

    // ========== State Errors ==========
    /// A ledger already exists for the employee.
    #[error("A ledger already exists for employee {0}")]
    LedgerAlreadyExists(EmployeeId),

    /// The advance belongs to a different employee.
    #[error("Advance {advance_id} belongs to employee {owner}, not {employee_id}")]
    AdvanceEmployeeMismatch {
        /// The referenced advance.
        advance_id: AdvanceId,
        /// Employee the posting was made for.
        employee_id: EmployeeId,
        /// Employee who holds the advance.
        owner: EmployeeId,
    },

    /// The employee's opening balance has already been recorded.
    #[error("Opening balance already set for employee {0}")]
    OpeningBalanceAlreadySet(EmployeeId),

    /// Approval status can only move out of PENDING, once.
    #[error("Cannot change approval status from {from} to {to}")]
    InvalidApprovalTransition {
        /// Current status of the entry.
        from: ApprovalStatus,
        /// Requested status.
        to: ApprovalStatus,
    },

    /// Expense exceeds what is left on the advance.
    #[error(
        "Expense of {requested} exceeds remaining balance {remaining} on advance {advance_id}"
    )]
    OverUtilization {
        /// The advance being drawn down.
        advance_id: AdvanceId,
        /// Amount the expense asked for.
        requested: Decimal,
        /// Amount still available on the advance.
        remaining: Decimal,
    },

    /// Advance is closed or expired and cannot absorb expenses.
    #[error("Advance {advance_id} is {status} and cannot be utilized")]
    AdvanceClosed {
        /// The advance being drawn down.
        advance_id: AdvanceId,
        /// Its current status.
        status: AdvanceStatus,
    },

    // ========== Concurrency Errors ==========
    /// The ledger moved on since the caller last observed it.
    #[error("Ledger version mismatch: expected {expected}, found {actual}")]
    ConcurrentModification {
        /// Version the caller expected.
        expected: u64,
        /// Version actually stored.
        actual: u64,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::AmountOverflow(_) => "AMOUNT_OVERFLOW",
            Self::InvalidInitialStatus(_) => "INVALID_INITIAL_STATUS",
            Self::UnexpectedAdvanceReference(_) => "UNEXPECTED_ADVANCE_REFERENCE",
            Self::ApprovalNotSupported(_) => "APPROVAL_NOT_SUPPORTED",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::EmployeeNotFound(_) => "EMPLOYEE_NOT_FOUND",
            Self::AdvanceNotFound(_) => "ADVANCE_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::LedgerAlreadyExists(_) => "LEDGER_ALREADY_EXISTS",
            Self::AdvanceEmployeeMismatch { .. } => "ADVANCE_EMPLOYEE_MISMATCH",
            Self::OpeningBalanceAlreadySet(_) => "OPENING_BALANCE_ALREADY_SET",
            Self::InvalidApprovalTransition { .. } => "INVALID_APPROVAL_TRANSITION",
            Self::OverUtilization { .. } => "OVER_UTILIZATION",
            Self::AdvanceClosed { .. } => "ADVANCE_CLOSED",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::AmountOverflow(_)
            | Self::InvalidInitialStatus(_)
            | Self::UnexpectedAdvanceReference(_)
            | Self::ApprovalNotSupported(_)
            | Self::InvalidDateRange { .. }
            | Self::AdvanceEmployeeMismatch { .. } => 400,

            // 404 Not Found
            Self::EmployeeNotFound(_) | Self::AdvanceNotFound(_) | Self::EntryNotFound(_) => 404,

            // 409 Conflict - state and concurrency errors
            Self::LedgerAlreadyExists(_)
            | Self::OpeningBalanceAlreadySet(_)
            | Self::InvalidApprovalTransition { .. }
            | Self::ConcurrentModification { .. } => 409,

            // 422 Unprocessable - business rule violations
            Self::OverUtilization { .. } | Self::AdvanceClosed { .. } => 422,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}
