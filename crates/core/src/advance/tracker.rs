//! Advance lifecycle rules.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId};
use rust_decimal::Decimal;

use super::types::{Advance, AdvanceStatus};
use crate::ledger::LedgerError;

/// Parameters for issuing a new advance.
#[derive(Debug, Clone)]
pub struct IssueAdvance {
    /// Identifier to give the advance.
    pub id: AdvanceId,
    /// Employee receiving the cash.
    pub employee_id: EmployeeId,
    /// Credit entry recording the issue.
    pub issue_entry_id: LedgerEntryId,
    /// Amount handed out.
    pub amount: Decimal,
    /// Stated purpose.
    pub purpose: String,
    /// Issue date.
    pub issued_date: NaiveDate,
    /// Optional expiry.
    pub expiry_date: Option<NaiveDate>,
}

/// Stateless rules for issuing, drawing down and closing advances.
pub struct AdvanceTracker;

impl AdvanceTracker {
    /// Creates an OPEN advance with nothing drawn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the amount is not positive.
    pub fn issue(params: IssueAdvance) -> Result<Advance, LedgerError> {
        if params.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(params.amount));
        }

        let mut advance = Advance {
            id: params.id,
            employee_id: params.employee_id,
            issue_entry_id: params.issue_entry_id,
            amount: params.amount,
            purpose: params.purpose,
            utilized_amount: Decimal::ZERO,
            remaining_balance: params.amount,
            status: AdvanceStatus::Open,
            issued_date: params.issued_date,
            expiry_date: params.expiry_date,
            closed_at: None,
        };
        advance.recompute(params.issued_date);
        Ok(advance)
    }

    /// Checks whether `amount` can be drawn from the advance as of `as_of`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive amount
    /// - `AdvanceClosed` if the advance is closed or expired
    /// - `OverUtilization` if the amount exceeds what is left
    pub fn check_utilization(
        advance: &Advance,
        amount: Decimal,
        as_of: NaiveDate,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let status = advance.derive_status(as_of);
        if status.blocks_utilization() {
            return Err(LedgerError::AdvanceClosed {
                advance_id: advance.id,
                status,
            });
        }

        let remaining = advance.amount - advance.utilized_amount;
        if amount > remaining {
            return Err(LedgerError::OverUtilization {
                advance_id: advance.id,
                requested: amount,
                remaining,
            });
        }

        Ok(())
    }

    /// Draws `amount` from the advance and refreshes its status.
    ///
    /// # Errors
    ///
    /// Same as [`AdvanceTracker::check_utilization`]; the advance is untouched on error.
    pub fn apply_utilization(
        advance: &mut Advance,
        amount: Decimal,
        as_of: NaiveDate,
    ) -> Result<(), LedgerError> {
        Self::check_utilization(advance, amount, as_of)?;
        advance.utilized_amount = advance
            .utilized_amount
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow(amount))?;
        advance.recompute(as_of);
        Ok(())
    }

    /// Closes the advance. Closed advances stay closed.
    ///
    /// # Errors
    ///
    /// Returns `AdvanceClosed` if it is already closed.
    pub fn close(advance: &mut Advance, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if advance.closed_at.is_some() {
            return Err(LedgerError::AdvanceClosed {
                advance_id: advance.id,
                status: AdvanceStatus::Closed,
            });
        }
        advance.closed_at = Some(now);
        advance.recompute(now.date_naive());
        Ok(())
    }
}
