//! Running balance calculations.
//!
//! Every entry carries the balance immediately after it. The chain is anchored
//! on the opening balance and only approved transactional entries move it.
//! Chain arithmetic is checked; a step that would leave the decimal range is
//! refused with `AmountOverflow` before anything is written.

use ledgerline_shared::types::LedgerEntryId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::{Direction, LedgerEntry};
use super::error::LedgerError;

/// Largest magnitude a single amount may carry (10^15).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Fails with `AmountOverflow` if `|amount|` exceeds [`MAX_AMOUNT`].
///
/// # Errors
///
/// Returns `AmountOverflow` for out-of-range amounts.
pub fn check_range(amount: Decimal) -> Result<(), LedgerError> {
    if amount.abs() > MAX_AMOUNT {
        return Err(LedgerError::AmountOverflow(amount));
    }
    Ok(())
}

fn step(balance: Decimal, change: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(change)
        .ok_or(LedgerError::AmountOverflow(change))
}

/// Running balance information for a ledger entry.
///
/// - `current_balance[N] = previous_balance[N] + balance_change`
/// - `previous_balance[N] = current_balance[N-1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Sequence of the entry this balance belongs to.
    pub sequence: u64,
    /// Balance before this entry.
    pub previous_balance: Decimal,
    /// Balance after this entry.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Running balance of the first transactional entry, anchored on the opening balance.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the sum leaves the decimal range.
    pub fn first_entry(opening: Decimal, balance_change: Decimal) -> Result<Self, LedgerError> {
        Ok(Self {
            sequence: 1,
            previous_balance: opening,
            current_balance: step(opening, balance_change)?,
        })
    }

    /// Running balance of the entry following `previous`.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the sum leaves the decimal range.
    pub fn next_entry(previous: &Self, balance_change: Decimal) -> Result<Self, LedgerError> {
        Ok(Self {
            sequence: previous.sequence + 1,
            previous_balance: previous.current_balance,
            current_balance: step(previous.current_balance, balance_change)?,
        })
    }

    /// Running balance recorded on a stored entry.
    #[must_use]
    pub fn of_entry(entry: &LedgerEntry) -> Self {
        Self {
            sequence: entry.sequence,
            previous_balance: entry.running_balance - entry.balance_effect(),
            current_balance: entry.running_balance,
        }
    }
}

/// Sum of approved credits and debits, excluding the opening balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Σ approved credit amounts.
    pub credits: Decimal,
    /// Σ approved debit amounts.
    pub debits: Decimal,
}

impl Totals {
    /// Adds an entry if it counts toward balances.
    pub fn add(&mut self, entry: &LedgerEntry) {
        if entry.is_opening() || !entry.is_approved() {
            return;
        }
        match entry.direction {
            Direction::Credit => self.credits = self.credits.saturating_add(entry.amount),
            Direction::Debit => self.debits = self.debits.saturating_add(entry.amount),
        }
    }

    /// Credits minus debits.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.credits.saturating_sub(self.debits)
    }
}

impl<'a> FromIterator<&'a LedgerEntry> for Totals {
    fn from_iter<I: IntoIterator<Item = &'a LedgerEntry>>(iter: I) -> Self {
        let mut totals = Self::default();
        for entry in iter {
            totals.add(entry);
        }
        totals
    }
}

/// Running balance after each entry, starting from `opening`.
///
/// # Errors
///
/// Returns `AmountOverflow` if any step leaves the decimal range.
pub fn project(opening: Decimal, entries: &[LedgerEntry]) -> Result<Vec<Decimal>, LedgerError> {
    let mut balance = opening;
    entries
        .iter()
        .map(|entry| {
            balance = step(balance, entry.balance_effect())?;
            Ok(balance)
        })
        .collect()
}

/// Rewrites every stored running balance from the opening balance forward.
///
/// `entries` must be in sequence order. Returns the final balance, which is the
/// opening balance for an empty slice.
///
/// # Errors
///
/// Returns `AmountOverflow` if the chain leaves the decimal range; no entry is
/// touched in that case.
pub fn replay(opening: Decimal, entries: &mut [LedgerEntry]) -> Result<Decimal, LedgerError> {
    let balances = project(opening, entries)?;
    for (entry, balance) in entries.iter_mut().zip(&balances) {
        entry.running_balance = *balance;
    }
    Ok(balances.last().copied().unwrap_or(opening))
}

/// A stored running balance that disagrees with the replayed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Offending entry.
    pub entry_id: LedgerEntryId,
    /// Its sequence number.
    pub sequence: u64,
    /// Value stored on the entry.
    pub stored: Decimal,
    /// Value the chain says it should hold.
    pub expected: Decimal,
}

/// Replays the chain without writing and reports every disagreeing entry.
#[must_use]
pub fn verify_chain(opening: Decimal, entries: &[LedgerEntry]) -> Vec<ChainBreak> {
    let mut balance = opening;
    let mut breaks = Vec::new();
    for entry in entries {
        balance = balance.saturating_add(entry.balance_effect());
        if entry.running_balance != balance {
            breaks.push(ChainBreak {
                entry_id: entry.id,
                sequence: entry.sequence,
                stored: entry.running_balance,
                expected: balance,
            });
        }
    }
    breaks
}
