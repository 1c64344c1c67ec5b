//! Cross-employee rollups for administrators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::summary::BalanceSummary;

/// Totals across every employee ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    /// Number of ledgers.
    pub ledger_count: usize,
    /// Number of transactional entries.
    pub entry_count: usize,
    /// Entries awaiting approval.
    pub pending_entry_count: usize,
    /// Σ approved credits.
    pub total_credits: Decimal,
    /// Σ approved debits.
    pub total_debits: Decimal,
    /// Σ current balances.
    pub total_balance: Decimal,
    /// Employees the organization owes.
    pub employees_in_surplus: usize,
    /// Employees owing the organization.
    pub employees_in_deficit: usize,
    /// Employees at exactly zero.
    pub employees_settled: usize,
    /// Advances not yet closed.
    pub open_advance_count: usize,
    /// Σ remaining on advances not yet closed.
    pub total_open_advances: Decimal,
    /// Σ deficits.
    pub total_deficit: Decimal,
}

impl LedgerStatistics {
    /// Folds one summary into the totals.
    pub fn add(&mut self, summary: &BalanceSummary) {
        self.ledger_count += 1;
        self.entry_count += summary.entry_count;
        self.pending_entry_count += summary.pending_entries;
        self.total_credits = self.total_credits.saturating_add(summary.total_credits);
        self.total_debits = self.total_debits.saturating_add(summary.total_debits);
        self.total_balance = self.total_balance.saturating_add(summary.current_balance);
        self.open_advance_count += summary.open_advances.len();
        self.total_open_advances = self.total_open_advances.saturating_add(summary.total_open_advances);
        self.total_deficit = self.total_deficit.saturating_add(summary.deficit_amount);

        if summary.is_in_surplus {
            self.employees_in_surplus += 1;
        } else if summary.is_in_deficit {
            self.employees_in_deficit += 1;
        } else {
            self.employees_settled += 1;
        }
    }
}

impl<'a> FromIterator<&'a BalanceSummary> for LedgerStatistics {
    fn from_iter<I: IntoIterator<Item = &'a BalanceSummary>>(iter: I) -> Self {
        let mut stats = Self::default();
        for summary in iter {
            stats.add(summary);
        }
        stats
    }
}
