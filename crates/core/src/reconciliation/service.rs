//! Reconciliation service.

use chrono::NaiveDate;
use ledgerline_shared::types::EmployeeId;
use rust_decimal::Decimal;

use super::types::{FindingKind, ReconciliationFinding, ReconciliationSummary};
use crate::ledger::{EmployeeLedger, LedgerEntry, LedgerError, Totals, balance};

/// Checks a ledger's stored balances against its own entries.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Reconciles the ledger over `[date_from, date_to]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `date_from > date_to`.
    pub fn reconcile(
        ledger: &EmployeeLedger,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<ReconciliationSummary, LedgerError> {
        Self::reconcile_entries(
            ledger.employee_id(),
            ledger.opening_amount(),
            ledger.entries(),
            date_from,
            date_to,
        )
    }

    /// Reconciles a raw entry list in sequence order.
    ///
    /// Read only: drift is reported, never repaired.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `date_from > date_to`.
    pub fn reconcile_entries(
        employee_id: EmployeeId,
        opening: Decimal,
        entries: &[LedgerEntry],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<ReconciliationSummary, LedgerError> {
        if date_from > date_to {
            return Err(LedgerError::InvalidDateRange {
                start: date_from,
                end: date_to,
            });
        }

        let opening_balance = entries
            .iter()
            .rev()
            .find(|e| e.entry_date() < date_from)
            .map_or(opening, |e| e.running_balance);

        let in_range: Vec<&LedgerEntry> = entries
            .iter()
            .filter(|e| (date_from..=date_to).contains(&e.entry_date()))
            .filter(|e| !e.is_opening() && e.is_approved())
            .collect();
        let totals: Totals = in_range.iter().copied().collect();

        let expected_closing = opening_balance.saturating_add(totals.net());
        let actual_closing = entries
            .iter()
            .rev()
            .find(|e| e.entry_date() <= date_to)
            .map_or(opening, |e| e.running_balance);
        let variance = actual_closing - expected_closing;

        let mut findings = Vec::new();
        if !variance.is_zero() {
            findings.push(ReconciliationFinding {
                kind: FindingKind::ReconciliationMismatch,
                entry_id: None,
                sequence: None,
                expected: expected_closing,
                actual: actual_closing,
                message: format!(
                    "Closing balance {actual_closing} differs from expected {expected_closing} by {variance}"
                ),
            });
        }

        let upto = entries
            .iter()
            .take_while(|e| e.entry_date() <= date_to)
            .count();
        findings.extend(
            balance::verify_chain(opening, &entries[..upto])
                .into_iter()
                .map(|gap| ReconciliationFinding {
                    kind: FindingKind::RunningBalanceDrift,
                    entry_id: Some(gap.entry_id),
                    sequence: Some(gap.sequence),
                    expected: gap.expected,
                    actual: gap.stored,
                    message: format!(
                        "Entry {} stores {} but the chain gives {}",
                        gap.sequence, gap.stored, gap.expected
                    ),
                }),
        );

        Ok(ReconciliationSummary {
            employee_id,
            date_from,
            date_to,
            opening_balance,
            total_credits: totals.credits,
            total_debits: totals.debits,
            entry_count: in_range.len(),
            expected_closing,
            actual_closing,
            variance,
            is_reconciled: findings.is_empty(),
            findings,
        })
    }
}
