//! Property-based tests for the transaction lifecycle.
//!
//! - Balances reflect posted entries only; drafts never move them
//! - Posting is not re-appliable and never double counts
//! - A reversal nets its original to zero on every account

use std::sync::Arc;

use buku_shared::types::{AccountId, Amount, UserId};
use chrono::NaiveDate;
use proptest::prelude::*;
use tokio::runtime::Runtime;

use super::balance::BalanceAggregator;
use super::engine::LedgerEngine;
use super::memory::InMemoryLedgerRepository;
use super::registry::AccountRegistry;
use super::repository::LedgerRepository;
use super::types::{AccountType, CreateAccountInput, CreateTransactionInput, JournalEntryInput};

/// One generated posting: debit account index, credit account index, amount.
#[derive(Debug, Clone, Copy)]
struct Posting {
    debit: usize,
    credit: usize,
    amount: i64,
}

const ACCOUNT_COUNT: usize = 4;

fn posting_strategy() -> impl Strategy<Value = Posting> {
    (0..ACCOUNT_COUNT, 1..ACCOUNT_COUNT, 1i64..10_000_000i64).prop_map(|(debit, offset, amount)| {
        Posting {
            debit,
            credit: (debit + offset) % ACCOUNT_COUNT,
            amount,
        }
    })
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

struct Harness {
    engine: LedgerEngine,
    balances: BalanceAggregator,
    accounts: Vec<(AccountId, AccountType)>,
}

async fn harness() -> Harness {
    let repo: Arc<dyn LedgerRepository> = Arc::new(InMemoryLedgerRepository::new());
    let registry = AccountRegistry::new(Arc::clone(&repo));
    let mut accounts = Vec::new();
    for (code, account_type) in [
        ("1000", AccountType::Asset),
        ("2100", AccountType::Liability),
        ("4000", AccountType::Revenue),
        ("5000", AccountType::Expense),
    ] {
        let account = registry
            .create_account(CreateAccountInput {
                code: code.to_string(),
                name: code.to_string(),
                account_type,
                parent_id: None,
            })
            .await
            .unwrap();
        accounts.push((account.id, account_type));
    }
    Harness {
        engine: LedgerEngine::new(Arc::clone(&repo)),
        balances: BalanceAggregator::new(repo),
        accounts,
    }
}

impl Harness {
    fn input(&self, posting: Posting) -> CreateTransactionInput {
        CreateTransactionInput {
            date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            description: "generated".to_string(),
            reference: None,
            entries: vec![
                JournalEntryInput::debit(self.accounts[posting.debit].0, Amount::from_minor(posting.amount)),
                JournalEntryInput::credit(self.accounts[posting.credit].0, Amount::from_minor(posting.amount)),
            ],
            created_by: UserId::new(),
        }
    }

    /// Expected natural-sign balances for the given postings.
    fn expected(&self, postings: &[Posting]) -> Vec<i64> {
        let mut raw = vec![0i64; ACCOUNT_COUNT];
        for p in postings {
            raw[p.debit] += p.amount;
            raw[p.credit] -= p.amount;
        }
        raw.iter()
            .zip(&self.accounts)
            .map(|(net, (_, account_type))| match account_type {
                AccountType::Asset | AccountType::Expense => *net,
                _ => -net,
            })
            .collect()
    }

    async fn actual(&self) -> Vec<i64> {
        let mut out = Vec::new();
        for (id, _) in &self.accounts {
            let balance = self.balances.compute_balance(*id, None).await.unwrap();
            out.push(balance.minor_units());
        }
        out
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* mix of drafts and posted transactions, balances equal the
    /// signed sum of the posted ones only.
    #[test]
    fn prop_balances_reflect_posted_only(
        postings in prop::collection::vec((posting_strategy(), any::<bool>()), 1..12),
    ) {
        let rt = runtime();
        let (expected, actual) = rt.block_on(async {
            let h = harness().await;
            let mut posted = Vec::new();
            for (posting, post) in &postings {
                let tx = h.engine.create_transaction(h.input(*posting)).await.unwrap();
                if *post {
                    h.engine.post_transaction(tx.id).await.unwrap();
                    posted.push(*posting);
                }
            }
            (h.expected(&posted), h.actual().await)
        });
        prop_assert_eq!(expected, actual);
    }

    /// *For any* posted transaction, posting again is rejected and the
    /// balances do not change.
    #[test]
    fn prop_repost_never_double_counts(posting in posting_strategy(), attempts in 1usize..4) {
        let rt = runtime();
        let (expected, actual, rejected) = rt.block_on(async {
            let h = harness().await;
            let tx = h.engine.create_transaction(h.input(posting)).await.unwrap();
            h.engine.post_transaction(tx.id).await.unwrap();
            let mut rejected = 0usize;
            for _ in 0..attempts {
                if h.engine.post_transaction(tx.id).await.is_err() {
                    rejected += 1;
                }
            }
            (h.expected(&[posting]), h.actual().await, rejected)
        });
        prop_assert_eq!(rejected, attempts);
        prop_assert_eq!(expected, actual);
    }

    /// *For any* set of posted transactions, reversing a subset leaves the
    /// balances of the rest.
    #[test]
    fn prop_reversal_nets_to_zero(
        postings in prop::collection::vec((posting_strategy(), any::<bool>()), 1..10),
    ) {
        let rt = runtime();
        let (expected, actual) = rt.block_on(async {
            let h = harness().await;
            let mut kept = Vec::new();
            for (posting, reverse) in &postings {
                let tx = h.engine.create_and_post(h.input(*posting)).await.unwrap();
                if *reverse {
                    h.engine.reverse_transaction(tx.id, UserId::new()).await.unwrap();
                } else {
                    kept.push(*posting);
                }
            }
            (h.expected(&kept), h.actual().await)
        });
        prop_assert_eq!(expected, actual);
    }
}
