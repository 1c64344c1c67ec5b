//! Concurrent access stress tests for the ledger repository.
//!
//! These tests verify that:
//! - Concurrent postings for one employee serialize into a gapless chain
//! - An advance is never over-drawn, whatever the interleaving
//! - Only one of several writers holding the same version wins
//! - Different employees never interfere with each other

#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use ledgerline_core::{EntryDraft, EntryFilter, LedgerError};
use ledgerline_db::{IssueAdvanceInput, LedgerRepository};
use ledgerline_shared::LedgerConfig;
use ledgerline_shared::types::{AdvanceId, EmployeeId, UserId};

fn repository() -> Arc<LedgerRepository> {
    Arc::new(LedgerRepository::with_system_clock(LedgerConfig::default()))
}

async fn issue(repo: &LedgerRepository, employee: EmployeeId, amount: Decimal) -> AdvanceId {
    repo.issue_advance(
        employee,
        IssueAdvanceInput {
            amount,
            purpose: "TRAVEL".to_string(),
            expiry_date: None,
            description: None,
            related_entity: None,
        },
        UserId::new(),
    )
    .await
    .unwrap()
    .advance
    .unwrap()
    .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_postings_keep_chain_intact() {
    const TASKS: usize = 200;

    let repo = repository();
    let employee = EmployeeId::new();
    repo.open_ledger(employee, UserId::new()).unwrap();
    let barrier = Arc::new(Barrier::new(TASKS));

    let handles = (0..TASKS).map(|i| {
        let repo = Arc::clone(&repo);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            let draft = if i % 2 == 0 {
                EntryDraft::reimbursement(dec!(10))
            } else {
                EntryDraft::expense(dec!(3))
            };
            repo.append(employee, draft, UserId::new()).await
        })
    });

    let results = join_all(handles).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

    let entries = repo.entries(employee, &EntryFilter::default()).await.unwrap();
    assert_eq!(entries.len(), TASKS);
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry.sequence, index as u64 + 1);
    }

    let expected = Decimal::from(TASKS / 2) * dec!(10) - Decimal::from(TASKS / 2) * dec!(3);
    assert_eq!(repo.balance(employee).await.unwrap().current_balance, expected);
    assert!(repo.reconcile(employee, None, None).await.unwrap().is_reconciled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_utilization_never_overdraws() {
    const TASKS: usize = 50;

    let repo = repository();
    let employee = EmployeeId::new();
    repo.open_ledger(employee, UserId::new()).unwrap();
    let advance_id = issue(&repo, employee, dec!(100)).await;
    let barrier = Arc::new(Barrier::new(TASKS));

    let handles = (0..TASKS).map(|_| {
        let repo = Arc::clone(&repo);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            repo.append(
                employee,
                EntryDraft::expense(dec!(10)).against_advance(advance_id),
                UserId::new(),
            )
            .await
        })
    });

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let over = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::OverUtilization { .. })))
        .count();

    assert_eq!(succeeded, 10);
    assert_eq!(over, TASKS - 10);

    let advance = repo.advance(advance_id).await.unwrap();
    assert_eq!(advance.utilized_amount, dec!(100));
    assert_eq!(advance.remaining_balance, Decimal::ZERO);
    assert_eq!(repo.balance(employee).await.unwrap().current_balance, Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_version_has_one_winner() {
    const TASKS: usize = 20;

    let repo = repository();
    let employee = EmployeeId::new();
    repo.open_ledger(employee, UserId::new()).unwrap();
    let version = repo.balance(employee).await.unwrap().version;
    let barrier = Arc::new(Barrier::new(TASKS));

    let handles = (0..TASKS).map(|_| {
        let repo = Arc::clone(&repo);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            repo.append(
                employee,
                EntryDraft::reimbursement(dec!(1)).at_version(version),
                UserId::new(),
            )
            .await
        })
    });

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(LedgerError::is_retryable)
    );
    assert_eq!(repo.balance(employee).await.unwrap().current_balance, dec!(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_employees_are_isolated() {
    const EMPLOYEES: usize = 16;
    const POSTINGS: usize = 25;

    let repo = repository();
    let employees: Vec<EmployeeId> = (0..EMPLOYEES).map(|_| EmployeeId::new()).collect();
    for employee in &employees {
        repo.open_ledger(*employee, UserId::new()).unwrap();
    }

    let handles = employees.iter().flat_map(|employee| {
        let employee = *employee;
        let repo = Arc::clone(&repo);
        (0..POSTINGS).map(move |_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.append(employee, EntryDraft::reimbursement(dec!(2)), UserId::new())
                    .await
            })
        })
    });

    let results = join_all(handles).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

    for employee in &employees {
        let balance = repo.balance(*employee).await.unwrap();
        assert_eq!(balance.current_balance, Decimal::from(POSTINGS) * dec!(2));
    }
    let stats = repo.statistics().await;
    assert_eq!(stats.ledger_count, EMPLOYEES);
    assert_eq!(stats.entry_count, EMPLOYEES * POSTINGS);
}
