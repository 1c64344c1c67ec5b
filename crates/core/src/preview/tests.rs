//! Tests for the preview engine.

use super::*;
use chrono::{DateTime, TimeZone, Utc};
use ledgerline_shared::types::{EmployeeId, UserId};
use proptest::prelude::*;
use rust_decimal_macros::dec;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, day, 9, 0, 0).unwrap()
}

fn ctx(day: u32) -> PostingContext {
    PostingContext::new(at(day), UserId::new())
}

fn funded_ledger(amount: Decimal) -> (EmployeeLedger, ledgerline_shared::types::AdvanceId) {
    let mut ledger = EmployeeLedger::new(EmployeeId::new(), at(1), UserId::new());
    let advance_id = ledger
        .post(&EntryDraft::advance_issue(amount, "TRAVEL"), &ctx(1))
        .unwrap()
        .advance
        .unwrap()
        .id;
    (ledger, advance_id)
}

#[test]
fn test_preview_leaves_ledger_untouched() {
    let (ledger, advance_id) = funded_ledger(dec!(15000));
    let before = ledger.clone();

    let preview = PreviewEngine::preview(
        &ledger,
        &EntryDraft::expense(dec!(2500)).against_advance(advance_id),
        &ctx(2),
    )
    .unwrap();

    assert_eq!(ledger, before);
    assert_eq!(preview.summary.current_balance, dec!(12500));
    assert_eq!(preview.advance.unwrap().remaining_balance, dec!(12500));
    assert!(preview.warnings.is_empty());
}

#[test]
fn test_preview_matches_real_posting() {
    let (mut ledger, advance_id) = funded_ledger(dec!(1000));
    let draft = EntryDraft::expense(dec!(400)).against_advance(advance_id);
    let ctx = ctx(3);

    let preview = PreviewEngine::preview(&ledger, &draft, &ctx).unwrap();
    let outcome = ledger.post(&draft, &ctx).unwrap();

    assert_eq!(preview.entry, outcome.entry);
    assert_eq!(preview.advance, outcome.advance);
    assert_eq!(
        preview.summary,
        BalanceAggregator::summarize(&ledger, ctx.now.date_naive())
    );
}

#[test]
fn test_preview_reports_same_errors() {
    let (ledger, advance_id) = funded_ledger(dec!(15000));

    let err = PreviewEngine::preview(
        &ledger,
        &EntryDraft::expense(dec!(20000)).against_advance(advance_id),
        &ctx(2),
    )
    .unwrap_err();

    assert!(matches!(err, LedgerError::OverUtilization { .. }));
}

#[test]
fn test_deficit_warnings() {
    let mut ledger = EmployeeLedger::new(EmployeeId::new(), at(1), UserId::new());
    ledger.post(&EntryDraft::reimbursement(dec!(100)), &ctx(1)).unwrap();

    let preview = PreviewEngine::preview(&ledger, &EntryDraft::expense(dec!(150)), &ctx(2)).unwrap();
    assert_eq!(
        preview.warnings,
        vec![PreviewWarning::WouldCreateDeficit { deficit: dec!(50) }]
    );

    ledger.post(&EntryDraft::expense(dec!(150)), &ctx(2)).unwrap();
    let preview = PreviewEngine::preview(&ledger, &EntryDraft::cash_return(dec!(25)), &ctx(3)).unwrap();
    assert_eq!(
        preview.warnings,
        vec![PreviewWarning::WouldDeepenDeficit { deficit: dec!(75) }]
    );
}

#[test]
fn test_full_utilization_and_pending_warnings() {
    let (ledger, advance_id) = funded_ledger(dec!(500));

    let preview = PreviewEngine::preview(
        &ledger,
        &EntryDraft::expense(dec!(500)).against_advance(advance_id),
        &ctx(2),
    )
    .unwrap();
    assert_eq!(preview.warnings, vec![PreviewWarning::WouldFullyUtilizeAdvance]);

    let preview = PreviewEngine::preview(
        &ledger,
        &EntryDraft::expense(dec!(800)).pending(),
        &ctx(2),
    )
    .unwrap();
    assert_eq!(preview.warnings, vec![PreviewWarning::PendingNotCounted]);
    assert_eq!(preview.summary.current_balance, dec!(500));
    assert_eq!(preview.summary.pending_expenses, dec!(800));
}

fn draft_strategy() -> impl Strategy<Value = EntryDraft> {
    (0u8..4, 1i64..300_000i64, any::<bool>()).prop_map(|(kind, cents, pending)| {
        let amount = Decimal::new(cents, 2);
        let draft = match kind {
            0 => EntryDraft::advance_issue(amount, "TRAVEL"),
            1 => EntryDraft::reimbursement(amount),
            2 => EntryDraft::expense(amount),
            _ => EntryDraft::cash_return(amount),
        };
        if pending && kind != 0 { draft.pending() } else { draft }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: Preview fidelity**
    ///
    /// *For any* ledger history and draft, previewing then posting with the
    /// same context SHALL yield identical summaries.
    #[test]
    fn prop_preview_fidelity(
        history in prop::collection::vec(draft_strategy(), 0..15),
        draft in draft_strategy(),
    ) {
        let mut ledger = EmployeeLedger::new(EmployeeId::new(), at(1), UserId::new());
        for past in &history {
            ledger.post(past, &ctx(2)).unwrap();
        }
        let ctx = ctx(4);

        let preview = PreviewEngine::preview(&ledger, &draft, &ctx).unwrap();
        ledger.post(&draft, &ctx).unwrap();

        prop_assert_eq!(
            preview.summary,
            BalanceAggregator::summarize(&ledger, ctx.now.date_naive())
        );
    }
}
