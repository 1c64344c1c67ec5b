//! Balance aggregation.
//!
//! A [`BalanceSummary`] is a read-only projection of an employee ledger. It is
//! never stored.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::EmployeeId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::advance::{Advance, AdvanceStatus};
use crate::ledger::{ApprovalStatus, EmployeeLedger, EntryKind, Totals};

/// Computed balance picture for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Balance after the last approved entry.
    pub current_balance: Decimal,
    /// Starting balance; zero if none was set.
    pub opening_balance: Decimal,
    /// Σ approved credits since the opening balance.
    pub total_credits: Decimal,
    /// Σ approved debits since the opening balance.
    pub total_debits: Decimal,
    /// Advances not yet closed.
    pub open_advances: Vec<Advance>,
    /// Σ remaining balance over `open_advances`.
    pub total_open_advances: Decimal,
    /// Σ pending expense amounts.
    pub pending_expenses: Decimal,
    /// Number of entries awaiting approval.
    pub pending_entries: usize,
    /// Organization owes the employee.
    pub is_in_surplus: bool,
    /// Employee owes the organization.
    pub is_in_deficit: bool,
    /// Balance is exactly zero.
    pub is_settled: bool,
    /// Amount owed by the employee; zero unless in deficit.
    pub deficit_amount: Decimal,
    /// Timestamp of the latest transactional entry.
    pub last_transaction_date: Option<DateTime<Utc>>,
    /// Number of transactional entries.
    pub entry_count: usize,
    /// Ledger version the summary was taken at.
    pub version: u64,
}

/// Lightweight balance reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentBalance {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Balance after the last approved entry.
    pub current_balance: Decimal,
    /// Starting balance; zero if none was set.
    pub opening_balance: Decimal,
    /// Ledger version, usable as `expected_version` on the next posting.
    pub version: u64,
}

/// Builds balance summaries.
pub struct BalanceAggregator;

impl BalanceAggregator {
    /// Reads the cached balance without walking entries.
    #[must_use]
    pub fn current(ledger: &EmployeeLedger) -> CurrentBalance {
        CurrentBalance {
            employee_id: ledger.employee_id(),
            current_balance: ledger.current_balance(),
            opening_balance: ledger.opening_amount(),
            version: ledger.version(),
        }
    }

    /// Summarizes the ledger with advance statuses evaluated as of `as_of`.
    #[must_use]
    pub fn summarize(ledger: &EmployeeLedger, as_of: NaiveDate) -> BalanceSummary {
        let transactional = || ledger.entries().iter().filter(|e| !e.is_opening());

        let totals: Totals = transactional().collect();
        let pending = transactional().filter(|e| e.approval_status == ApprovalStatus::Pending);
        let (pending_entries, pending_expenses) =
            pending.fold((0usize, Decimal::ZERO), |(count, sum), entry| {
                if entry.kind == EntryKind::Expense {
                    (count + 1, sum.saturating_add(entry.amount))
                } else {
                    (count + 1, sum)
                }
            });

        let open_advances: Vec<Advance> = ledger
            .advances_as_of(as_of)
            .into_iter()
            .filter(|advance| advance.status != AdvanceStatus::Closed)
            .collect();
        let total_open_advances = open_advances
            .iter()
            .fold(Decimal::ZERO, |sum, a| sum.saturating_add(a.remaining_balance));

        let current_balance = ledger.current_balance();
        BalanceSummary {
            employee_id: ledger.employee_id(),
            current_balance,
            opening_balance: ledger.opening_amount(),
            total_credits: totals.credits,
            total_debits: totals.debits,
            open_advances,
            total_open_advances,
            pending_expenses,
            pending_entries,
            is_in_surplus: current_balance > Decimal::ZERO,
            is_in_deficit: current_balance < Decimal::ZERO,
            is_settled: current_balance.is_zero(),
            deficit_amount: if current_balance < Decimal::ZERO {
                -current_balance
            } else {
                Decimal::ZERO
            },
            last_transaction_date: transactional().last().map(|e| e.created_at),
            entry_count: transactional().count(),
            version: ledger.version(),
        }
    }
}
