//! Property-based tests for EmployeeLedger.
//!
//! - Property 1: Balance invariant under arbitrary operation sequences
//! - Property 2: Advance conservation
//! - Property 3: Failed operations leave no trace

use chrono::{DateTime, Duration, TimeZone, Utc};
use ledgerline_shared::types::{EmployeeId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{self, Totals};
use super::book::{EmployeeLedger, PostingContext};
use super::entry::{ApprovalStatus, EntryDraft, EntryKind};

/// Strategy to generate positive decimal amounts (0.01 to 5,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// One step against a ledger. Indices pick among existing advances/entries.
#[derive(Debug, Clone)]
enum Op {
    Issue(Decimal),
    Expense { amount: Decimal, advance: Option<usize>, pending: bool },
    CashReturn(Decimal),
    Reimburse { amount: Decimal, pending: bool },
    Decide { entry: usize, approve: bool },
    Close(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        positive_amount().prop_map(Op::Issue),
        (positive_amount(), prop::option::of(0usize..8), any::<bool>())
            .prop_map(|(amount, advance, pending)| Op::Expense { amount, advance, pending }),
        positive_amount().prop_map(Op::CashReturn),
        (positive_amount(), any::<bool>()).prop_map(|(amount, pending)| Op::Reimburse { amount, pending }),
        (0usize..32, any::<bool>()).prop_map(|(entry, approve)| Op::Decide { entry, approve }),
        (0usize..8).prop_map(Op::Close),
    ]
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

fn run(ledger: &mut EmployeeLedger, op: &Op, now: DateTime<Utc>) -> bool {
    let ctx = PostingContext::new(now, UserId::new());
    let advance_ids: Vec<_> = ledger.advances.iter().map(|a| a.id).collect();
    let advance_at = |i: usize| advance_ids.get(i % advance_ids.len().max(1)).copied();

    let result = match op {
        Op::Issue(amount) => ledger
            .post(&EntryDraft::advance_issue(*amount, "TRAVEL"), &ctx)
            .map(|_| ()),
        Op::Expense { amount, advance, pending } => {
            let mut draft = EntryDraft::expense(*amount);
            if let Some(id) = advance.and_then(advance_at) {
                draft = draft.against_advance(id);
            }
            if *pending {
                draft = draft.pending();
            }
            ledger.post(&draft, &ctx).map(|_| ())
        }
        Op::CashReturn(amount) => ledger.post(&EntryDraft::cash_return(*amount), &ctx).map(|_| ()),
        Op::Reimburse { amount, pending } => {
            let draft = EntryDraft::reimbursement(*amount);
            let draft = if *pending { draft.pending() } else { draft };
            ledger.post(&draft, &ctx).map(|_| ())
        }
        Op::Decide { entry, approve } => {
            let Some(id) = ledger.entries.get(entry % ledger.entries.len().max(1)).map(|e| e.id) else {
                return false;
            };
            let to = if *approve { ApprovalStatus::Approved } else { ApprovalStatus::Rejected };
            ledger.set_approval(id, to, now, ctx.actor).map(|_| ())
        }
        Op::Close(index) => {
            let Some(id) = advance_at(*index) else {
                return false;
            };
            ledger.close_advance(id, now, ctx.actor).map(|_| ())
        }
    };
    result.is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Balance invariant**
    ///
    /// *For any* sequence of operations, the cached balance SHALL equal
    /// opening + Σ approved credits − Σ approved debits, and every stored
    /// running balance SHALL match a replay of the chain.
    #[test]
    fn prop_balance_invariant_holds(
        opening in (-100_000i64..100_000i64).prop_map(|n| Decimal::new(n, 2)),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (mut ledger, _) = EmployeeLedger::with_opening_balance(
            EmployeeId::new(),
            opening,
            start().date_naive(),
            &PostingContext::new(start(), UserId::new()),
        )
        .unwrap();

        for (step, op) in ops.iter().enumerate() {
            let now = start() + Duration::hours(i64::try_from(step).unwrap_or(0));
            run(&mut ledger, op, now);

            let totals: Totals = ledger.entries.iter().collect();
            prop_assert_eq!(ledger.current_balance, opening + totals.net());
            prop_assert!(balance::verify_chain(opening, &ledger.entries).is_empty());
            let last = ledger.entries.last().map(|e| e.running_balance);
            prop_assert_eq!(last, Some(ledger.current_balance));
        }
    }

    /// **Property 2: Advance conservation**
    ///
    /// *For any* sequence of operations, each advance's utilized amount SHALL
    /// equal the sum of approved expenses drawn against it, and never exceed
    /// the amount issued.
    #[test]
    fn prop_advance_conservation(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut ledger = EmployeeLedger::new(EmployeeId::new(), start(), UserId::new());

        for (step, op) in ops.iter().enumerate() {
            let now = start() + Duration::hours(i64::try_from(step).unwrap_or(0));
            run(&mut ledger, op, now);
        }

        for advance in &ledger.advances {
            let drawn: Decimal = ledger
                .entries
                .iter()
                .filter(|e| e.kind == EntryKind::Expense && e.is_approved())
                .filter(|e| e.related_advance_id == Some(advance.id))
                .map(|e| e.amount)
                .sum();
            prop_assert_eq!(advance.utilized_amount, drawn);
            prop_assert_eq!(advance.remaining_balance, advance.amount - advance.utilized_amount);
            prop_assert!(advance.remaining_balance >= Decimal::ZERO);
        }
    }

    /// **Property 3: Failed operations leave no trace**
    ///
    /// *For any* operation that fails, the ledger SHALL be exactly as before.
    #[test]
    fn prop_failures_are_atomic(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut ledger = EmployeeLedger::new(EmployeeId::new(), start(), UserId::new());

        for (step, op) in ops.iter().enumerate() {
            let now = start() + Duration::hours(i64::try_from(step).unwrap_or(0));
            let before = ledger.clone();
            if !run(&mut ledger, op, now) {
                prop_assert_eq!(&ledger, &before);
            }
        }
    }
}
