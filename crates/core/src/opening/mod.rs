//! Opening balance management.
//!
//! The opening balance is the base the running balance chain starts from. It is
//! stored both as an [`OpeningBalance`] record and as the genesis entry at
//! sequence 0. Setting it on a ledger that already has entries rebases every
//! entry through a full replay.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::{EmployeeId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{
    ApprovalStatus, AuditEvent, AuditKind, Direction, EmployeeLedger, EntryKind, LedgerEntry,
    LedgerError, PostingContext, balance,
};

/// An employee's starting balance.
///
/// Positive means the organization owes the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalance {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Signed starting balance.
    pub amount: Decimal,
    /// Date the balance applies from.
    pub effective_date: NaiveDate,
    /// When it was recorded.
    pub set_at: DateTime<Utc>,
    /// Who recorded it.
    pub set_by: UserId,
}

/// Result of setting or correcting an opening balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningOutcome {
    /// The stored record.
    pub opening: OpeningBalance,
    /// The genesis entry carrying it.
    pub entry: LedgerEntry,
    /// True if existing entries were rebased.
    pub replayed: bool,
}

impl EmployeeLedger {
    /// Creates a ledger whose first fact is its opening balance.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the amount is out of range.
    pub fn with_opening_balance(
        employee_id: EmployeeId,
        amount: Decimal,
        effective_date: NaiveDate,
        ctx: &PostingContext,
    ) -> Result<(Self, OpeningOutcome), LedgerError> {
        let mut ledger = Self::new(employee_id, ctx.now, ctx.actor);
        let outcome = ledger.install_opening(amount, effective_date, ctx)?;
        Ok((ledger, outcome))
    }

    /// Records the opening balance.
    ///
    /// If entries already exist they are rebased on the new opening balance
    /// and the replay is audited.
    ///
    /// # Errors
    ///
    /// Returns `OpeningBalanceAlreadySet` if one is already recorded, or
    /// `AmountOverflow` if the amount or the rebased chain is out of range.
    pub fn set_opening_balance(
        &mut self,
        amount: Decimal,
        effective_date: NaiveDate,
        ctx: &PostingContext,
    ) -> Result<OpeningOutcome, LedgerError> {
        if self.opening.is_some() {
            return Err(LedgerError::OpeningBalanceAlreadySet(self.employee_id));
        }
        self.install_opening(amount, effective_date, ctx)
    }

    /// Replaces the opening balance and replays every entry.
    ///
    /// Works whether or not an opening balance was set before.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the amount or the rebased chain is out of
    /// range; the ledger is unchanged in that case.
    pub fn correct_opening_balance(
        &mut self,
        amount: Decimal,
        effective_date: NaiveDate,
        ctx: &PostingContext,
    ) -> Result<OpeningOutcome, LedgerError> {
        self.install_opening(amount, effective_date, ctx)
    }

    fn install_opening(
        &mut self,
        amount: Decimal,
        effective_date: NaiveDate,
        ctx: &PostingContext,
    ) -> Result<OpeningOutcome, LedgerError> {
        balance::check_range(amount)?;
        balance::project(amount, &self.entries)?;

        let replayed = self.entries.iter().any(|entry| !entry.is_opening());
        let direction = if amount.is_sign_negative() {
            Direction::Debit
        } else {
            Direction::Credit
        };

        let has_genesis = self.entries.first().is_some_and(LedgerEntry::is_opening);
        let genesis = if has_genesis {
            let genesis = &mut self.entries[0];
            genesis.amount = amount.abs();
            genesis.direction = direction;
            genesis.running_balance = amount;
            genesis.clone()
        } else {
            let created_at = self
                .entries
                .first()
                .map_or(ctx.now, |first| ctx.now.min(first.created_at));
            let genesis = LedgerEntry {
                id: ctx.entry_id,
                employee_id: self.employee_id,
                sequence: 0,
                kind: EntryKind::OpeningBalance,
                direction,
                amount: amount.abs(),
                running_balance: amount,
                related_advance_id: None,
                related_entity: None,
                description: Some(format!("Opening balance effective {effective_date}")),
                approval_status: ApprovalStatus::Approved,
                created_at,
                created_by: ctx.actor,
            };
            self.entries.insert(0, genesis.clone());
            genesis
        };

        let opening = OpeningBalance {
            employee_id: self.employee_id,
            amount,
            effective_date,
            set_at: ctx.now,
            set_by: ctx.actor,
        };
        self.opening = Some(opening.clone());
        self.rebalance()?;
        self.version += 1;

        self.audit.push(AuditEvent::new(
            AuditKind::OpeningBalanceSet,
            self.employee_id,
            ctx.actor,
            ctx.now,
            format!("Opening balance {amount} effective {effective_date}"),
        ));
        if replayed {
            self.audit.push(AuditEvent::new(
                AuditKind::OpeningBalanceReplayed,
                self.employee_id,
                ctx.actor,
                ctx.now,
                format!("Rebased {} entries", self.entries.len() - 1),
            ));
        }

        Ok(OpeningOutcome {
            opening,
            entry: genesis,
            replayed,
        })
    }
}
