//! Per-employee audit trail.

use chrono::{DateTime, Utc};
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId, UserId};
use serde::{Deserialize, Serialize};

/// Kind of administrative event recorded on a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// Ledger registered.
    LedgerOpened,
    /// Opening balance recorded or corrected.
    OpeningBalanceSet,
    /// Existing entries were rebased on a new opening balance.
    OpeningBalanceReplayed,
    /// Pending entry approved.
    EntryApproved,
    /// Pending entry rejected.
    EntryRejected,
    /// Advance closed.
    AdvanceClosed,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened.
    pub kind: AuditKind,
    /// Ledger the event belongs to.
    pub employee_id: EmployeeId,
    /// Who did it.
    pub actor: UserId,
    /// When.
    pub at: DateTime<Utc>,
    /// Entry concerned, if any.
    pub entry_id: Option<LedgerEntryId>,
    /// Advance concerned, if any.
    pub advance_id: Option<AdvanceId>,
    /// Human-readable detail.
    pub detail: String,
}

impl AuditEvent {
    pub(crate) fn new(
        kind: AuditKind,
        employee_id: EmployeeId,
        actor: UserId,
        at: DateTime<Utc>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            employee_id,
            actor,
            at,
            entry_id: None,
            advance_id: None,
            detail: detail.into(),
        }
    }

    pub(crate) fn for_entry(mut self, entry_id: LedgerEntryId) -> Self {
        self.entry_id = Some(entry_id);
        self
    }

    pub(crate) fn for_advance(mut self, advance_id: AdvanceId) -> Self {
        self.advance_id = Some(advance_id);
        self
    }
}
