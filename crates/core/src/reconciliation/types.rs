//! Reconciliation report types.

use chrono::NaiveDate;
use ledgerline_shared::types::{EmployeeId, LedgerEntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of discrepancy found while reconciling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    /// Stored closing balance disagrees with opening plus movements.
    ReconciliationMismatch,
    /// A stored running balance disagrees with the replayed chain.
    RunningBalanceDrift,
}

/// One discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationFinding {
    /// What kind of discrepancy.
    pub kind: FindingKind,
    /// Entry concerned, for drift findings.
    pub entry_id: Option<LedgerEntryId>,
    /// Sequence of that entry.
    pub sequence: Option<u64>,
    /// Value the ledger should hold.
    pub expected: Decimal,
    /// Value the ledger actually holds.
    pub actual: Decimal,
    /// Human-readable description.
    pub message: String,
}

/// Period reconciliation for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// First day of the range, inclusive.
    pub date_from: NaiveDate,
    /// Last day of the range, inclusive.
    pub date_to: NaiveDate,
    /// Balance at the start of the range.
    pub opening_balance: Decimal,
    /// Σ approved credits in the range.
    pub total_credits: Decimal,
    /// Σ approved debits in the range.
    pub total_debits: Decimal,
    /// Approved transactional entries in the range.
    pub entry_count: usize,
    /// Opening plus net movement.
    pub expected_closing: Decimal,
    /// Stored running balance at the end of the range.
    pub actual_closing: Decimal,
    /// `actual_closing - expected_closing`.
    pub variance: Decimal,
    /// True when there is no variance and no finding.
    pub is_reconciled: bool,
    /// Every discrepancy detected.
    pub findings: Vec<ReconciliationFinding>,
}
