//! Ledger repository.
//!
//! Holds every employee ledger behind its own lock. Writers take the ledger's
//! write lock for the whole validate-compute-persist step, readers take the
//! read lock, and ledgers of different employees never contend. Index maps
//! resolve advance and entry ids to their owning employee.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use ledgerline_core::ledger::{AuditEvent, LedgerEntry, LedgerError, PostingOutcome};
use ledgerline_core::{
    Advance, AdvanceFilter, ApprovalStatus, BalanceAggregator, BalanceSummary, CurrentBalance,
    EmployeeLedger, EntryDraft, EntryFilter, EntryKind, LedgerStatistics, OpeningOutcome,
    PostingContext, Preview, PreviewEngine, ReconciliationEngine, ReconciliationSummary,
};
use ledgerline_shared::LedgerConfig;
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId, UserId};

use crate::clock::{Clock, SystemClock};

type LedgerHandle = Arc<RwLock<EmployeeLedger>>;

/// Input for issuing an advance.
#[derive(Debug, Clone)]
pub struct IssueAdvanceInput {
    /// Amount handed out.
    pub amount: Decimal,
    /// Stated purpose.
    pub purpose: String,
    /// Optional expiry; the configured default applies when absent.
    pub expiry_date: Option<NaiveDate>,
    /// Free-form note.
    pub description: Option<String>,
    /// External reference.
    pub related_entity: Option<String>,
}

/// In-memory source of truth for employee ledgers.
#[derive(Debug)]
pub struct LedgerRepository {
    ledgers: DashMap<EmployeeId, LedgerHandle>,
    advance_owners: DashMap<AdvanceId, EmployeeId>,
    entry_owners: DashMap<LedgerEntryId, EmployeeId>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl LedgerRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledgers: DashMap::new(),
            advance_owners: DashMap::new(),
            entry_owners: DashMap::new(),
            clock,
            config,
        }
    }

    /// Creates an empty repository on the wall clock.
    #[must_use]
    pub fn with_system_clock(config: LedgerConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Number of ledgers held.
    #[must_use]
    pub fn ledger_count(&self) -> usize {
        self.ledgers.len()
    }

    // ========================================================================
    // Ledger lifecycle
    // ========================================================================

    /// Registers an empty ledger with a zero base balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerAlreadyExists` if the employee already has one.
    pub fn open_ledger(
        &self,
        employee_id: EmployeeId,
        actor: UserId,
    ) -> Result<BalanceSummary, LedgerError> {
        let now = self.clock.now();
        match self.ledgers.entry(employee_id) {
            Entry::Occupied(_) => Err(LedgerError::LedgerAlreadyExists(employee_id)),
            Entry::Vacant(slot) => {
                let ledger = EmployeeLedger::new(employee_id, now, actor);
                let summary = BalanceAggregator::summarize(&ledger, now.date_naive());
                slot.insert(Arc::new(RwLock::new(ledger)));
                info!(employee_id = %employee_id, "Ledger opened");
                Ok(summary)
            }
        }
    }

    /// Today's date on the repository clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Returns true if the employee has a ledger.
    #[must_use]
    pub fn contains(&self, employee_id: EmployeeId) -> bool {
        self.ledgers.contains_key(&employee_id)
    }

    // ========================================================================
    // Postings
    // ========================================================================

    /// Validates and posts a draft for an employee.
    ///
    /// An opening-balance draft on an employee without a ledger creates the
    /// ledger. Every other kind requires an existing ledger.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`] raised by validation; nothing is written on error.
    pub async fn append(
        &self,
        employee_id: EmployeeId,
        draft: EntryDraft,
        actor: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        let draft = self.resolve_draft(employee_id, draft)?;

        let handle = match self.ledgers.entry(employee_id) {
            Entry::Occupied(slot) => Arc::clone(slot.get()),
            Entry::Vacant(slot) if draft.kind == EntryKind::OpeningBalance => {
                let ctx = PostingContext::new(self.clock.now(), actor);
                let mut ledger = EmployeeLedger::new(employee_id, ctx.now, actor);
                let outcome = ledger.post(&draft, &ctx)?;
                slot.insert(Arc::new(RwLock::new(ledger)));
                self.index(&outcome);
                info!(
                    employee_id = %employee_id,
                    amount = %draft.amount,
                    "Ledger created with opening balance"
                );
                return Ok(outcome);
            }
            Entry::Vacant(_) => return Err(LedgerError::EmployeeNotFound(employee_id)),
        };

        let mut ledger = handle.write().await;
        let ctx = PostingContext::new(self.clock.now(), actor);
        let outcome = ledger.post(&draft, &ctx)?;
        let balance = ledger.current_balance();
        drop(ledger);

        self.index(&outcome);
        info!(
            employee_id = %employee_id,
            entry_id = %outcome.entry.id,
            kind = %outcome.entry.kind,
            amount = %outcome.entry.amount,
            status = %outcome.entry.approval_status,
            balance = %balance,
            "Ledger entry posted"
        );
        if outcome.replayed {
            warn!(employee_id = %employee_id, "Opening balance set after entries; ledger replayed");
        }
        Ok(outcome)
    }

    /// Issues an advance and its credit entry in one step.
    ///
    /// # Errors
    ///
    /// `EmployeeNotFound` or `InvalidAmount`.
    pub async fn issue_advance(
        &self,
        employee_id: EmployeeId,
        input: IssueAdvanceInput,
        actor: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        let mut draft = EntryDraft::advance_issue(input.amount, input.purpose);
        draft.expiry_date = input.expiry_date;
        draft.description = input.description;
        draft.related_entity = input.related_entity;
        self.append(employee_id, draft, actor).await
    }

    /// Runs a draft against a copy of the employee's ledger.
    ///
    /// # Errors
    ///
    /// Whatever [`LedgerRepository::append`] would return for the same draft.
    pub async fn preview(
        &self,
        employee_id: EmployeeId,
        draft: EntryDraft,
        actor: UserId,
    ) -> Result<Preview, LedgerError> {
        let draft = self.resolve_draft(employee_id, draft)?;
        let ctx = PostingContext::new(self.clock.now(), actor);

        match self.handle(employee_id) {
            Ok(handle) => {
                let ledger = handle.read().await;
                PreviewEngine::preview(&ledger, &draft, &ctx)
            }
            Err(_) if draft.kind == EntryKind::OpeningBalance => {
                let ledger = EmployeeLedger::new(employee_id, ctx.now, actor);
                PreviewEngine::preview(&ledger, &draft, &ctx)
            }
            Err(err) => Err(err),
        }
    }

    /// Approves or rejects a pending entry.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, `InvalidApprovalTransition`, or an advance error if an
    /// approved expense no longer fits its advance.
    pub async fn set_approval(
        &self,
        entry_id: LedgerEntryId,
        status: ApprovalStatus,
        actor: UserId,
    ) -> Result<LedgerEntry, LedgerError> {
        let employee_id = self
            .entry_owners
            .get(&entry_id)
            .map(|owner| *owner.value())
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let handle = self.handle(employee_id)?;

        let mut ledger = handle.write().await;
        let entry = ledger.set_approval(entry_id, status, self.clock.now(), actor)?;
        drop(ledger);

        info!(
            employee_id = %employee_id,
            entry_id = %entry_id,
            status = %status,
            "Ledger entry approval changed"
        );
        Ok(entry)
    }

    // ========================================================================
    // Opening balances
    // ========================================================================

    /// Records the opening balance, creating the ledger if needed.
    ///
    /// # Errors
    ///
    /// Returns `OpeningBalanceAlreadySet` if one exists.
    pub async fn set_opening_balance(
        &self,
        employee_id: EmployeeId,
        amount: Decimal,
        effective_date: NaiveDate,
        actor: UserId,
    ) -> Result<OpeningOutcome, LedgerError> {
        let handle = match self.ledgers.entry(employee_id) {
            Entry::Occupied(slot) => Arc::clone(slot.get()),
            Entry::Vacant(slot) => {
                let ctx = PostingContext::new(self.clock.now(), actor);
                let (ledger, outcome) =
                    EmployeeLedger::with_opening_balance(employee_id, amount, effective_date, &ctx)?;
                slot.insert(Arc::new(RwLock::new(ledger)));
                self.entry_owners.insert(outcome.entry.id, employee_id);
                info!(employee_id = %employee_id, amount = %amount, "Opening balance set");
                return Ok(outcome);
            }
        };

        let mut ledger = handle.write().await;
        let ctx = PostingContext::new(self.clock.now(), actor);
        let outcome = ledger.set_opening_balance(amount, effective_date, &ctx)?;
        drop(ledger);

        self.entry_owners.insert(outcome.entry.id, employee_id);
        self.log_opening(employee_id, &outcome);
        Ok(outcome)
    }

    /// Replaces an existing ledger's opening balance and replays it.
    ///
    /// # Errors
    ///
    /// Returns `EmployeeNotFound` if there is no ledger, or `AmountOverflow`
    /// if the rebased chain leaves the supported range.
    pub async fn correct_opening_balance(
        &self,
        employee_id: EmployeeId,
        amount: Decimal,
        effective_date: NaiveDate,
        actor: UserId,
    ) -> Result<OpeningOutcome, LedgerError> {
        let handle = self.handle(employee_id)?;

        let mut ledger = handle.write().await;
        let ctx = PostingContext::new(self.clock.now(), actor);
        let outcome = ledger.correct_opening_balance(amount, effective_date, &ctx)?;
        drop(ledger);

        self.entry_owners.insert(outcome.entry.id, employee_id);
        self.log_opening(employee_id, &outcome);
        Ok(outcome)
    }

    fn log_opening(&self, employee_id: EmployeeId, outcome: &OpeningOutcome) {
        if outcome.replayed {
            warn!(
                employee_id = %employee_id,
                amount = %outcome.opening.amount,
                "Opening balance set on a ledger with entries; running balances replayed"
            );
        } else {
            info!(
                employee_id = %employee_id,
                amount = %outcome.opening.amount,
                "Opening balance set"
            );
        }
    }

    // ========================================================================
    // Advances
    // ========================================================================

    /// Closes an advance.
    ///
    /// # Errors
    ///
    /// `AdvanceNotFound` or `AdvanceClosed`.
    pub async fn close_advance(
        &self,
        advance_id: AdvanceId,
        actor: UserId,
    ) -> Result<Advance, LedgerError> {
        let employee_id = self.advance_owner(advance_id)?;
        let handle = self.handle(employee_id)?;

        let mut ledger = handle.write().await;
        let advance = ledger.close_advance(advance_id, self.clock.now(), actor)?;
        drop(ledger);

        info!(
            employee_id = %employee_id,
            advance_id = %advance_id,
            remaining = %advance.remaining_balance,
            "Advance closed"
        );
        Ok(advance)
    }

    /// Reads one advance with its status as of today.
    ///
    /// # Errors
    ///
    /// Returns `AdvanceNotFound` if it does not exist.
    pub async fn advance(&self, advance_id: AdvanceId) -> Result<Advance, LedgerError> {
        let employee_id = self.advance_owner(advance_id)?;
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;
        ledger
            .advance_as_of(advance_id, self.clock.today())
            .ok_or(LedgerError::AdvanceNotFound(advance_id))
    }

    /// Lists advances across employees, oldest first.
    pub async fn list_advances(&self, filter: &AdvanceFilter) -> Vec<Advance> {
        let today = self.clock.today();
        let handles = match filter.employee_id {
            Some(employee_id) => self.handle(employee_id).map(|h| vec![h]).unwrap_or_default(),
            None => self.handles(),
        };

        let mut advances = Vec::new();
        for handle in handles {
            let ledger = handle.read().await;
            advances.extend(
                ledger
                    .advances_as_of(today)
                    .into_iter()
                    .filter(|advance| filter.matches(advance)),
            );
        }
        advances.sort_by(|a, b| a.issued_date.cmp(&b.issued_date).then(a.id.cmp(&b.id)));
        advances
    }

    /// Lists one employee's advances in issue order.
    ///
    /// # Errors
    ///
    /// Returns `EmployeeNotFound` if there is no ledger.
    pub async fn employee_advances(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Advance>, LedgerError> {
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;
        Ok(ledger.advances_as_of(self.clock.today()))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Lists one employee's entries in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `EmployeeNotFound` if there is no ledger.
    pub async fn entries(
        &self,
        employee_id: EmployeeId,
        filter: &EntryFilter,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;
        Ok(ledger.filtered(filter).cloned().collect())
    }

    /// Lists entries across every employee, oldest first.
    pub async fn all_entries(&self, filter: &EntryFilter) -> Vec<LedgerEntry> {
        let mut entries = Vec::new();
        for handle in self.handles() {
            let ledger = handle.read().await;
            entries.extend(ledger.filtered(filter).cloned());
        }
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.employee_id.cmp(&b.employee_id))
                .then(a.sequence.cmp(&b.sequence))
        });
        entries
    }

    /// Reads the cached balance.
    ///
    /// # Errors
    ///
    /// Returns `EmployeeNotFound` if there is no ledger.
    pub async fn balance(&self, employee_id: EmployeeId) -> Result<CurrentBalance, LedgerError> {
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;
        Ok(BalanceAggregator::current(&ledger))
    }

    /// Builds the full balance summary as of today.
    ///
    /// # Errors
    ///
    /// Returns `EmployeeNotFound` if there is no ledger.
    pub async fn summary(&self, employee_id: EmployeeId) -> Result<BalanceSummary, LedgerError> {
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;
        Ok(BalanceAggregator::summarize(&ledger, self.clock.today()))
    }

    /// Reconciles an employee's ledger over a date range.
    ///
    /// `date_from` defaults to the first entry's date and `date_to` to today.
    ///
    /// # Errors
    ///
    /// `EmployeeNotFound` or `InvalidDateRange`.
    pub async fn reconcile(
        &self,
        employee_id: EmployeeId,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<ReconciliationSummary, LedgerError> {
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;

        let today = self.clock.today();
        let date_to = date_to.unwrap_or(today);
        let date_from = date_from.unwrap_or_else(|| {
            ledger
                .entries()
                .first()
                .map_or(today, LedgerEntry::entry_date)
                .min(date_to)
        });

        let summary = ReconciliationEngine::reconcile(&ledger, date_from, date_to)?;
        drop(ledger);

        if summary.is_reconciled {
            debug!(employee_id = %employee_id, %date_from, %date_to, "Ledger reconciled");
        } else {
            warn!(
                employee_id = %employee_id,
                %date_from,
                %date_to,
                variance = %summary.variance,
                findings = summary.findings.len(),
                "Ledger reconciliation found discrepancies"
            );
        }
        Ok(summary)
    }

    /// Rolls every ledger up into statistics.
    pub async fn statistics(&self) -> LedgerStatistics {
        let today = self.clock.today();
        let mut stats = LedgerStatistics::default();
        for handle in self.handles() {
            let ledger = handle.read().await;
            stats.add(&BalanceAggregator::summarize(&ledger, today));
        }
        stats
    }

    /// Returns the employee's audit trail.
    ///
    /// # Errors
    ///
    /// Returns `EmployeeNotFound` if there is no ledger.
    pub async fn audit(&self, employee_id: EmployeeId) -> Result<Vec<AuditEvent>, LedgerError> {
        let handle = self.handle(employee_id)?;
        let ledger = handle.read().await;
        Ok(ledger.audit().to_vec())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn handle(&self, employee_id: EmployeeId) -> Result<LedgerHandle, LedgerError> {
        self.ledgers
            .get(&employee_id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or(LedgerError::EmployeeNotFound(employee_id))
    }

    /// Snapshot of every ledger handle; no map guard outlives this call.
    fn handles(&self) -> Vec<LedgerHandle> {
        self.ledgers
            .iter()
            .map(|slot| Arc::clone(slot.value()))
            .collect()
    }

    fn advance_owner(&self, advance_id: AdvanceId) -> Result<EmployeeId, LedgerError> {
        self.advance_owners
            .get(&advance_id)
            .map(|owner| *owner.value())
            .ok_or(LedgerError::AdvanceNotFound(advance_id))
    }

    /// Applies configured defaults and cross-employee checks to a draft.
    fn resolve_draft(
        &self,
        employee_id: EmployeeId,
        mut draft: EntryDraft,
    ) -> Result<EntryDraft, LedgerError> {
        if let Some(advance_id) = draft.related_advance_id
            && let Some(owner) = self.advance_owners.get(&advance_id).map(|o| *o.value())
            && owner != employee_id
        {
            return Err(LedgerError::AdvanceEmployeeMismatch {
                advance_id,
                employee_id,
                owner,
            });
        }

        if draft.kind == EntryKind::AdvanceIssue && draft.expiry_date.is_none() {
            draft.expiry_date = self
                .config
                .default_advance_expiry_days
                .map(|days| self.clock.today() + Duration::days(i64::from(days)));
        }
        Ok(draft)
    }

    fn index(&self, outcome: &PostingOutcome) {
        self.entry_owners
            .insert(outcome.entry.id, outcome.entry.employee_id);
        if let Some(advance) = &outcome.advance {
            self.advance_owners.insert(advance.id, advance.employee_id);
        }
    }
}
