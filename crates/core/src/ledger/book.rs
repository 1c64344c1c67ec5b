//! The per-employee ledger aggregate.
//!
//! `EmployeeLedger` owns the ordered entries, the advances drawn against them,
//! the opening balance, and the cached current balance. Every mutation is
//! validated in full before anything is written, so a failed posting leaves the
//! ledger exactly as it was.

use chrono::{DateTime, NaiveDate, Utc};
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::audit::{AuditEvent, AuditKind};
use super::balance::{self, RunningBalance};
use super::entry::{ApprovalStatus, Direction, EntryDraft, EntryKind, LedgerEntry};
use super::error::LedgerError;
use super::filter::EntryFilter;
use crate::advance::{Advance, AdvanceTracker, IssueAdvance};
use crate::opening::OpeningBalance;

/// Identifiers and time a posting is stamped with.
///
/// Supplying them explicitly lets a preview and a real posting produce the
/// same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingContext {
    /// Wall-clock time of the posting.
    pub now: DateTime<Utc>,
    /// Who is posting.
    pub actor: UserId,
    /// Id for the entry the posting creates.
    pub entry_id: LedgerEntryId,
    /// Id for the advance, if the posting issues one.
    pub advance_id: AdvanceId,
}

impl PostingContext {
    /// Creates a context with fresh ids.
    #[must_use]
    pub fn new(now: DateTime<Utc>, actor: UserId) -> Self {
        Self {
            now,
            actor,
            entry_id: LedgerEntryId::new(),
            advance_id: AdvanceId::new(),
        }
    }
}

/// Result of a successful posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOutcome {
    /// The entry that was written.
    pub entry: LedgerEntry,
    /// The advance issued or drawn down, as it stands after the posting.
    pub advance: Option<Advance>,
    /// True if existing entries were rebased on a new opening balance.
    pub replayed: bool,
}

/// A fully validated posting, ready to apply.
#[derive(Debug, Clone)]
struct Posting {
    entry: LedgerEntry,
    advance: AdvanceChange,
}

#[derive(Debug, Clone)]
enum AdvanceChange {
    None,
    Issue(Advance),
    Utilize { index: usize, amount: Decimal },
}

/// Ledger for a single employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeLedger {
    pub(crate) employee_id: EmployeeId,
    pub(crate) opening: Option<OpeningBalance>,
    pub(crate) entries: Vec<LedgerEntry>,
    pub(crate) advances: Vec<Advance>,
    pub(crate) current_balance: Decimal,
    pub(crate) next_sequence: u64,
    pub(crate) version: u64,
    pub(crate) audit: Vec<AuditEvent>,
}

impl EmployeeLedger {
    /// Opens an empty ledger with a zero base balance.
    #[must_use]
    pub fn new(employee_id: EmployeeId, now: DateTime<Utc>, actor: UserId) -> Self {
        Self {
            employee_id,
            opening: None,
            entries: Vec::new(),
            advances: Vec::new(),
            current_balance: Decimal::ZERO,
            next_sequence: 1,
            version: 0,
            audit: vec![AuditEvent::new(
                AuditKind::LedgerOpened,
                employee_id,
                actor,
                now,
                "Ledger opened",
            )],
        }
    }

    // ===== Accessors =====

    /// Owner of the ledger.
    #[must_use]
    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Opening balance record, if one has been set.
    #[must_use]
    pub fn opening(&self) -> Option<&OpeningBalance> {
        self.opening.as_ref()
    }

    /// Base the running balance starts from; zero without an opening balance.
    #[must_use]
    pub fn opening_amount(&self) -> Decimal {
        self.opening.as_ref().map_or(Decimal::ZERO, |o| o.amount)
    }

    /// All entries in sequence order, including the genesis entry.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries matching `filter`, in sequence order.
    pub fn filtered<'a>(&'a self, filter: &'a EntryFilter) -> impl Iterator<Item = &'a LedgerEntry> {
        self.entries.iter().filter(move |entry| filter.matches(entry))
    }

    /// Looks up an entry.
    #[must_use]
    pub fn entry(&self, entry_id: LedgerEntryId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| entry.id == entry_id)
    }

    /// Cached balance after the last approved entry.
    #[must_use]
    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    /// Number of mutations applied; bumps on every successful write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Administrative events in the order they happened.
    #[must_use]
    pub fn audit(&self) -> &[AuditEvent] {
        &self.audit
    }

    /// Every advance with its status refreshed for `as_of`.
    #[must_use]
    pub fn advances_as_of(&self, as_of: NaiveDate) -> Vec<Advance> {
        self.advances.iter().map(|a| a.as_of(as_of)).collect()
    }

    /// One advance with its status refreshed for `as_of`.
    #[must_use]
    pub fn advance_as_of(&self, advance_id: AdvanceId, as_of: NaiveDate) -> Option<Advance> {
        self.advances
            .iter()
            .find(|a| a.id == advance_id)
            .map(|a| a.as_of(as_of))
    }

    /// Returns true if the ledger holds the advance.
    #[must_use]
    pub fn holds_advance(&self, advance_id: AdvanceId) -> bool {
        self.advances.iter().any(|a| a.id == advance_id)
    }

    // ===== Posting =====

    /// Validates and applies a draft.
    ///
    /// Opening-balance drafts are routed to [`EmployeeLedger::set_opening_balance`].
    ///
    /// # Errors
    ///
    /// Any validation failure; the ledger is unchanged on error.
    pub fn post(
        &mut self,
        draft: &EntryDraft,
        ctx: &PostingContext,
    ) -> Result<PostingOutcome, LedgerError> {
        self.check_version(draft.expected_version)?;

        let Some(direction) = draft.kind.direction() else {
            if draft.related_advance_id.is_some() {
                return Err(LedgerError::UnexpectedAdvanceReference(draft.kind));
            }
            if draft.approval_status != ApprovalStatus::Approved {
                return Err(LedgerError::ApprovalNotSupported(draft.kind));
            }
            let effective_date = draft.effective_date.unwrap_or_else(|| ctx.now.date_naive());
            let outcome = self.set_opening_balance(draft.amount, effective_date, ctx)?;
            return Ok(PostingOutcome {
                entry: outcome.entry,
                advance: None,
                replayed: outcome.replayed,
            });
        };

        let posting = self.plan(draft, direction, ctx)?;
        Ok(self.apply(posting))
    }

    /// Fails with `ConcurrentModification` if `expected` is set and stale.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` on a version mismatch.
    pub fn check_version(&self, expected: Option<u64>) -> Result<(), LedgerError> {
        match expected {
            Some(expected) if expected != self.version => Err(LedgerError::ConcurrentModification {
                expected,
                actual: self.version,
            }),
            _ => Ok(()),
        }
    }

    fn plan(
        &self,
        draft: &EntryDraft,
        direction: Direction,
        ctx: &PostingContext,
    ) -> Result<Posting, LedgerError> {
        if draft.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(draft.amount));
        }
        balance::check_range(draft.amount)?;
        if draft.approval_status == ApprovalStatus::Rejected {
            return Err(LedgerError::InvalidInitialStatus(draft.approval_status));
        }
        if draft.kind == EntryKind::AdvanceIssue && draft.approval_status != ApprovalStatus::Approved
        {
            return Err(LedgerError::ApprovalNotSupported(draft.kind));
        }
        if draft.related_advance_id.is_some() && draft.kind != EntryKind::Expense {
            return Err(LedgerError::UnexpectedAdvanceReference(draft.kind));
        }

        let created_at = self.stamp(ctx.now);
        let today = created_at.date_naive();
        let approved = draft.approval_status == ApprovalStatus::Approved;

        let (related_advance_id, advance) = match draft.kind {
            EntryKind::AdvanceIssue => {
                let advance = AdvanceTracker::issue(IssueAdvance {
                    id: ctx.advance_id,
                    employee_id: self.employee_id,
                    issue_entry_id: ctx.entry_id,
                    amount: draft.amount,
                    purpose: draft.purpose.clone().unwrap_or_default(),
                    issued_date: today,
                    expiry_date: draft.expiry_date,
                })?;
                (Some(advance.id), AdvanceChange::Issue(advance))
            }
            EntryKind::Expense => match draft.related_advance_id {
                Some(advance_id) => {
                    let index = self.advance_index(advance_id)?;
                    AdvanceTracker::check_utilization(&self.advances[index], draft.amount, today)?;
                    let change = if approved {
                        AdvanceChange::Utilize {
                            index,
                            amount: draft.amount,
                        }
                    } else {
                        AdvanceChange::None
                    };
                    (Some(advance_id), change)
                }
                None => (None, AdvanceChange::None),
            },
            _ => (None, AdvanceChange::None),
        };

        let change = if approved {
            direction.signed(draft.amount)
        } else {
            Decimal::ZERO
        };
        let running = match self.entries.last() {
            Some(last) => RunningBalance::next_entry(&RunningBalance::of_entry(last), change)?,
            None => RunningBalance::first_entry(self.opening_amount(), change)?,
        };

        Ok(Posting {
            entry: LedgerEntry {
                id: ctx.entry_id,
                employee_id: self.employee_id,
                sequence: self.next_sequence,
                kind: draft.kind,
                direction,
                amount: draft.amount,
                running_balance: running.current_balance,
                related_advance_id,
                related_entity: draft.related_entity.clone(),
                description: draft.description.clone(),
                approval_status: draft.approval_status,
                created_at,
                created_by: ctx.actor,
            },
            advance,
        })
    }

    fn apply(&mut self, posting: Posting) -> PostingOutcome {
        let Posting { entry, advance } = posting;
        let today = entry.created_at.date_naive();

        let advance = match advance {
            AdvanceChange::Issue(advance) => {
                self.advances.push(advance.clone());
                Some(advance)
            }
            AdvanceChange::Utilize { index, amount } => {
                self.advances.get_mut(index).map(|advance| {
                    // bounded by check_utilization in plan
                    advance.utilized_amount += amount;
                    advance.recompute(today);
                    advance.clone()
                })
            }
            AdvanceChange::None => entry
                .related_advance_id
                .and_then(|id| self.advance_as_of(id, today)),
        };

        self.current_balance = entry.running_balance;
        self.next_sequence += 1;
        self.version += 1;
        self.entries.push(entry.clone());

        PostingOutcome {
            entry,
            advance,
            replayed: false,
        }
    }

    // ===== Approval =====

    /// Moves a pending entry to APPROVED or REJECTED.
    ///
    /// Approving an expense drawn against an advance utilizes the advance as of
    /// `now`. Running balances are replayed from the changed entry forward.
    /// The ledger is unchanged on error.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry is not on this ledger
    /// - `InvalidApprovalTransition` unless the entry is pending
    /// - `OverUtilization` / `AdvanceClosed` if the advance can no longer absorb it
    /// - `AmountOverflow` if the replayed chain leaves the decimal range
    pub fn set_approval(
        &mut self,
        entry_id: LedgerEntryId,
        to: ApprovalStatus,
        now: DateTime<Utc>,
        actor: UserId,
    ) -> Result<LedgerEntry, LedgerError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        let (from, kind, amount, advance_id) = {
            let entry = &self.entries[index];
            (entry.approval_status, entry.kind, entry.amount, entry.related_advance_id)
        };
        if !from.can_transition_to(to) {
            return Err(LedgerError::InvalidApprovalTransition { from, to });
        }

        let today = now.date_naive();
        let drawn = match advance_id {
            Some(advance_id) if to == ApprovalStatus::Approved && kind == EntryKind::Expense => {
                let advance_index = self.advance_index(advance_id)?;
                AdvanceTracker::check_utilization(&self.advances[advance_index], amount, today)?;
                Some(advance_index)
            }
            _ => None,
        };

        self.entries[index].approval_status = to;
        if let Err(err) = self.rebalance() {
            self.entries[index].approval_status = from;
            return Err(err);
        }
        if let Some(advance_index) = drawn {
            AdvanceTracker::apply_utilization(&mut self.advances[advance_index], amount, today)?;
        }
        self.version += 1;

        let audit_kind = if to == ApprovalStatus::Approved {
            AuditKind::EntryApproved
        } else {
            AuditKind::EntryRejected
        };
        self.audit.push(
            AuditEvent::new(audit_kind, self.employee_id, actor, now, format!("{from} -> {to}"))
                .for_entry(entry_id),
        );

        Ok(self.entries[index].clone())
    }

    // ===== Advances =====

    /// Closes an advance on this ledger.
    ///
    /// # Errors
    ///
    /// `AdvanceNotFound` or `AdvanceClosed` if it is already closed.
    pub fn close_advance(
        &mut self,
        advance_id: AdvanceId,
        now: DateTime<Utc>,
        actor: UserId,
    ) -> Result<Advance, LedgerError> {
        let index = self.advance_index(advance_id)?;
        let advance = &mut self.advances[index];
        AdvanceTracker::close(advance, now)?;
        let closed = advance.clone();

        self.version += 1;
        self.audit.push(
            AuditEvent::new(
                AuditKind::AdvanceClosed,
                self.employee_id,
                actor,
                now,
                format!("Closed with {} remaining", closed.remaining_balance),
            )
            .for_advance(advance_id),
        );
        Ok(closed)
    }

    fn advance_index(&self, advance_id: AdvanceId) -> Result<usize, LedgerError> {
        self.advances
            .iter()
            .position(|a| a.id == advance_id)
            .ok_or(LedgerError::AdvanceNotFound(advance_id))
    }

    // ===== Internals =====

    /// Timestamp for a new entry, never earlier than the last one.
    pub(crate) fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.entries.last().map_or(now, |last| now.max(last.created_at))
    }

    /// Replays every running balance and refreshes the cached pointer.
    ///
    /// Nothing is written if the replay overflows.
    pub(crate) fn rebalance(&mut self) -> Result<(), LedgerError> {
        self.current_balance = balance::replay(self.opening_amount(), &mut self.entries)?;
        Ok(())
    }
}
