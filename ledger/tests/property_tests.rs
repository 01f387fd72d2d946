//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Conservation: balances only change by net external movement
//! - No negative balances for any committed state
//! - Idempotency: one effect per transaction id
//! - Conflict retry: concurrent debits never apply against stale versions

use banco_ledger::{
    AccountId, EngineConfig, LedgerEngine, MemoryStore, TransactionRequest, TransactionStatus,
};
use proptest::prelude::*;
use std::sync::Arc;

/// Strategy for generating opening balances in minor units
fn balance_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000_000
}

/// Strategy for generating positive transfer amounts
fn amount_strategy() -> impl Strategy<Value = i64> {
    1i64..50_000
}

/// One randomly generated operation against a small account set
#[derive(Debug, Clone)]
enum Op {
    Transfer { from: usize, to: usize, amount: i64 },
    Deposit { to: usize, amount: i64 },
    Withdrawal { from: usize, amount: i64 },
}

fn op_strategy(accounts: usize) -> impl Strategy<Value = Op> {
    let idx = 0..accounts;
    prop_oneof![
        (idx.clone(), 0..accounts, amount_strategy()).prop_map(|(from, to, amount)| {
            Op::Transfer { from, to, amount }
        }),
        (idx.clone(), amount_strategy()).prop_map(|(to, amount)| Op::Deposit { to, amount }),
        (idx, amount_strategy()).prop_map(|(from, amount)| Op::Withdrawal { from, amount }),
    ]
}

fn account_id(index: usize) -> AccountId {
    AccountId::new(format!("ACC-{:03}", index))
}

async fn seeded_engine(balances: &[i64]) -> Arc<LedgerEngine> {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(LedgerEngine::new(store, EngineConfig::default()).unwrap());
    for (index, balance) in balances.iter().enumerate() {
        engine.open_account(account_id(index), *balance).await.unwrap();
    }
    engine
}

fn op_request(op: &Op) -> TransactionRequest {
    match op {
        Op::Transfer { from, to, amount } => {
            TransactionRequest::transfer(account_id(*from), account_id(*to), *amount)
        }
        Op::Deposit { to, amount } => TransactionRequest::deposit(account_id(*to), *amount),
        Op::Withdrawal { from, amount } => {
            TransactionRequest::withdrawal(account_id(*from), *amount)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: after a random concurrent workload settles, the sum
    /// of balances equals the opening sum plus net applied external
    /// movement, and no balance is negative.
    #[test]
    fn prop_conservation_under_concurrency(
        balances in proptest::collection::vec(balance_strategy(), 3..6),
        ops in proptest::collection::vec(op_strategy(3), 1..40),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let engine = seeded_engine(&balances).await;
            let opening_sum: i64 = balances.iter().sum();

            let mut handles = Vec::new();
            for op in &ops {
                let engine = engine.clone();
                let request = op_request(op);
                handles.push(tokio::spawn(async move { engine.submit(request).await }));
            }

            let mut net_external = 0i64;
            for (handle, op) in handles.into_iter().zip(ops.iter()) {
                let result = handle.await.unwrap();
                // Self-transfers are malformed requests, everything
                // else must reach a terminal state.
                let Ok(transaction) = result else { continue };
                prop_assert!(transaction.is_terminal());

                if transaction.status == TransactionStatus::Applied {
                    match op {
                        Op::Deposit { amount, .. } => net_external += amount,
                        Op::Withdrawal { amount, .. } => net_external -= amount,
                        Op::Transfer { .. } => {}
                    }
                }
            }

            let mut closing_sum = 0i64;
            for index in 0..balances.len() {
                let account = engine.account(&account_id(index)).await.unwrap();
                prop_assert!(account.balance_minor >= 0, "balance went negative");
                closing_sum += account.balance_minor;
            }

            prop_assert_eq!(closing_sum, opening_sum + net_external);
            Ok(())
        })?;
    }

    /// Property: rejected withdrawals leave the balance untouched and
    /// produce no ledger entry.
    #[test]
    fn prop_rejection_has_no_effect(
        balance in balance_strategy(),
        excess in 1i64..10_000,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let engine = seeded_engine(&[balance]).await;

            let request = TransactionRequest::withdrawal(account_id(0), balance + excess);
            let transaction = engine.submit(request.clone()).await.unwrap();

            prop_assert_eq!(
                transaction.status,
                TransactionStatus::Rejected(banco_ledger::RejectReason::InsufficientFunds)
            );
            prop_assert_eq!(
                engine.account(&account_id(0)).await.unwrap().balance_minor,
                balance
            );
            prop_assert!(engine.entry(request.id).await.unwrap().is_none());
            Ok(())
        })?;
    }

    /// Property: submitting the same id N times concurrently yields
    /// exactly one effect and one ledger entry.
    #[test]
    fn prop_idempotency_under_concurrency(
        balance in 10_000i64..1_000_000,
        amount in 1i64..10_000,
        submits in 2usize..8,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let engine = seeded_engine(&[balance]).await;
            let request = TransactionRequest::withdrawal(account_id(0), amount);

            let mut handles = Vec::new();
            for _ in 0..submits {
                let engine = engine.clone();
                let request = request.clone();
                handles.push(tokio::spawn(async move { engine.submit(request).await }));
            }

            for handle in handles {
                let transaction = handle.await.unwrap().unwrap();
                prop_assert_eq!(transaction.status, TransactionStatus::Applied);
            }

            prop_assert_eq!(
                engine.account(&account_id(0)).await.unwrap().balance_minor,
                balance - amount
            );
            prop_assert!(engine.entry(request.id).await.unwrap().is_some());
            Ok(())
        })?;
    }
}

/// Two concurrent transfers debiting the same account: never both
/// applied against the same version, both terminal, conservation
/// holds. Deterministic companion to the proptest workload.
#[tokio::test]
async fn concurrent_debits_of_one_account_stay_consistent() {
    for _ in 0..20 {
        let engine = seeded_engine(&[1000, 0, 0]).await;

        let first =
            TransactionRequest::transfer(account_id(0), account_id(1), 600);
        let second =
            TransactionRequest::transfer(account_id(0), account_id(2), 600);

        let (a, b) = tokio::join!(
            {
                let engine = engine.clone();
                let request = first;
                async move { engine.submit(request).await.unwrap() }
            },
            {
                let engine = engine.clone();
                let request = second;
                async move { engine.submit(request).await.unwrap() }
            }
        );

        assert!(a.is_terminal());
        assert!(b.is_terminal());

        // At most one can be applied: together they exceed the balance.
        let applied = [&a, &b]
            .iter()
            .filter(|t| t.status == TransactionStatus::Applied)
            .count();
        assert!(applied <= 1);

        let balance_0 = engine.account(&account_id(0)).await.unwrap().balance_minor;
        let balance_1 = engine.account(&account_id(1)).await.unwrap().balance_minor;
        let balance_2 = engine.account(&account_id(2)).await.unwrap().balance_minor;
        assert!(balance_0 >= 0);
        assert_eq!(balance_0 + balance_1 + balance_2, 1000);
    }
}
