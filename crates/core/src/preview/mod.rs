//! Dry-run postings.
//!
//! The preview engine posts a draft to a throwaway copy of the ledger through
//! the same path a real posting takes, then summarizes the copy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::advance::{Advance, AdvanceStatus};
use crate::ledger::{
    ApprovalStatus, EmployeeLedger, EntryDraft, LedgerEntry, LedgerError, PostingContext,
};
use crate::summary::{BalanceAggregator, BalanceSummary};

/// Something the caller should know before committing the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreviewWarning {
    /// The posting would take a non-negative balance below zero.
    WouldCreateDeficit {
        /// Resulting deficit.
        deficit: Decimal,
    },
    /// The posting would take an existing deficit further down.
    WouldDeepenDeficit {
        /// Resulting deficit.
        deficit: Decimal,
    },
    /// The expense would use up what is left on its advance.
    WouldFullyUtilizeAdvance,
    /// The draft is pending and does not move the balance until approved.
    PendingNotCounted,
}

/// Outcome of a dry run.
///
/// Ids on `entry` and `advance` come from the preview's own
/// [`PostingContext`]; a later real posting assigns its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// Summary the ledger would have after the posting.
    pub summary: BalanceSummary,
    /// Entry that would be written.
    pub entry: LedgerEntry,
    /// Advance as it would stand after the posting.
    pub advance: Option<Advance>,
    /// Warnings for the caller.
    pub warnings: Vec<PreviewWarning>,
}

/// Runs drafts against a copy of a ledger.
pub struct PreviewEngine;

impl PreviewEngine {
    /// Previews `draft` on `ledger` without touching it.
    ///
    /// # Errors
    ///
    /// Exactly the errors the real posting would return.
    pub fn preview(
        ledger: &EmployeeLedger,
        draft: &EntryDraft,
        ctx: &PostingContext,
    ) -> Result<Preview, LedgerError> {
        let mut scratch = ledger.clone();
        let outcome = scratch.post(draft, ctx)?;
        let summary = BalanceAggregator::summarize(&scratch, ctx.now.date_naive());

        let warnings = Self::warnings(
            ledger.current_balance(),
            &summary,
            draft,
            outcome.advance.as_ref(),
        );

        Ok(Preview {
            summary,
            entry: outcome.entry,
            advance: outcome.advance,
            warnings,
        })
    }

    fn warnings(
        before: Decimal,
        after: &BalanceSummary,
        draft: &EntryDraft,
        advance: Option<&Advance>,
    ) -> Vec<PreviewWarning> {
        let mut warnings = Vec::new();

        if draft.approval_status == ApprovalStatus::Pending {
            warnings.push(PreviewWarning::PendingNotCounted);
        }

        if after.is_in_deficit && after.current_balance < before {
            let deficit = after.deficit_amount;
            if before < Decimal::ZERO {
                warnings.push(PreviewWarning::WouldDeepenDeficit { deficit });
            } else {
                warnings.push(PreviewWarning::WouldCreateDeficit { deficit });
            }
        }

        let exhausts_advance = draft.related_advance_id.is_some()
            && advance.is_some_and(|a| a.status == AdvanceStatus::FullyUtilized);
        if exhausts_advance {
            warnings.push(PreviewWarning::WouldFullyUtilizeAdvance);
        }

        warnings
    }
}

#[cfg(test)]
mod tests;
