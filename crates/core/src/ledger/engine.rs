//! Transaction lifecycle.
//!
//! ```text
//! Draft --post--> Posted --reverse--> Reversed
//! ```
//!
//! Drafts may be edited or deleted. Posted and reversed transactions are
//! immutable; a reversal is a separate posted transaction with mirrored
//! entries. Every write goes through a single repository call so the
//! header and its entries land or fail together.

use std::collections::HashMap;
use std::sync::Arc;

use buku_shared::types::{AccountId, JournalEntryId, TransactionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::error::LedgerError;
use super::repository::LedgerRepository;
use super::reversal::build_reversal;
use super::types::{
    Account, CreateTransactionInput, JournalEntry, JournalEntryInput, Transaction,
    TransactionFilter, TransactionStatus, UpdateTransactionInput,
};
use super::validation::{validate_accounts, validate_stored_entries, validate_transaction};

/// Normalizes an optional reference: trimmed, blank treated as absent.
fn normalize_reference(reference: Option<String>) -> Option<String> {
    reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

fn build_entries(transaction_id: TransactionId, inputs: Vec<JournalEntryInput>) -> Vec<JournalEntry> {
    inputs
        .into_iter()
        .map(|input| JournalEntry {
            id: JournalEntryId::new(),
            transaction_id,
            account_id: input.account_id,
            debit_amount: input.debit_amount,
            credit_amount: input.credit_amount,
            description: input.description,
        })
        .collect()
}

/// Service driving transactions through their lifecycle.
#[derive(Clone)]
pub struct LedgerEngine {
    repo: Arc<dyn LedgerRepository>,
}

impl LedgerEngine {
    /// Creates an engine over the given repository.
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    /// Loads every distinct account referenced by `entries`.
    ///
    /// Unknown ids are left out of the map for validation to report.
    async fn load_accounts(
        &self,
        entries: &[JournalEntryInput],
    ) -> Result<HashMap<AccountId, Account>, LedgerError> {
        let mut accounts = HashMap::with_capacity(entries.len());
        for entry in entries {
            if accounts.contains_key(&entry.account_id) {
                continue;
            }
            if let Some(account) = self.repo.find_account(entry.account_id).await? {
                accounts.insert(account.id, account);
            }
        }
        Ok(accounts)
    }

    async fn require_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.repo
            .find_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Validates input and assembles a transaction in the given status.
    async fn prepare(
        &self,
        input: CreateTransactionInput,
        status: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let accounts = self.load_accounts(&input.entries).await?;
        validate_transaction(&input.description, &input.entries, &accounts)?;

        let id = TransactionId::new();
        Ok(Transaction {
            id,
            date: input.date,
            description: input.description.trim().to_string(),
            reference: normalize_reference(input.reference),
            status,
            created_by: input.created_by,
            reverses: None,
            reversed_by: None,
            entries: build_entries(id, input.entries),
            created_at: at,
            updated_at: at,
            posted_at: (status == TransactionStatus::Posted).then_some(at),
            reversed_at: None,
        })
    }

    /// Creates a draft transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error (entry count, account, amounts, balance,
    /// description in that order) or `DuplicateReference`. Nothing is
    /// persisted on failure.
    pub async fn create_transaction(
        &self,
        input: CreateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let transaction = self
            .prepare(input, TransactionStatus::Draft, Utc::now())
            .await?;
        self.repo.insert_transaction(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            entries = transaction.entries.len(),
            "Draft transaction created"
        );
        Ok(transaction)
    }

    /// Creates a transaction directly in the posted state.
    ///
    /// Used by automated integrations that must never leave drafts behind.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_transaction`].
    pub async fn create_and_post(
        &self,
        input: CreateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let transaction = self
            .prepare(input, TransactionStatus::Posted, Utc::now())
            .await?;
        self.repo.insert_transaction(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            reference = transaction.reference.as_deref().unwrap_or_default(),
            "Transaction created and posted"
        );
        Ok(transaction)
    }

    /// Edits a draft transaction in place.
    ///
    /// The merged result is validated exactly like a new transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `ImmutableTransaction` for a non-draft,
    /// or a validation error.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        input: UpdateTransactionInput,
    ) -> Result<Transaction, LedgerError> {
        let current = self.require_transaction(id).await?;
        if !current.status.is_editable() {
            return Err(LedgerError::ImmutableTransaction {
                id,
                status: current.status,
            });
        }

        let description = input.description.unwrap_or(current.description);
        let reference = match input.reference {
            Some(reference) => normalize_reference(reference),
            None => current.reference,
        };
        let entries = input
            .entries
            .unwrap_or_else(|| current.entries.iter().map(JournalEntryInput::from).collect());

        let accounts = self.load_accounts(&entries).await?;
        validate_transaction(&description, &entries, &accounts)?;

        let updated = Transaction {
            description: description.trim().to_string(),
            reference,
            entries: build_entries(id, entries),
            updated_at: Utc::now(),
            ..current
        };

        if !self.repo.replace_draft(&updated).await? {
            let status = self.require_transaction(id).await?.status;
            return Err(LedgerError::ImmutableTransaction { id, status });
        }

        info!(transaction_id = %id, "Draft transaction updated");
        Ok(updated)
    }

    /// Posts a draft transaction.
    ///
    /// The stored entries are re-validated before the status flips.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `InvalidTransition` unless the
    /// transaction is a draft, or a validation error.
    pub async fn post_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let current = self.require_transaction(id).await?;
        if current.status != TransactionStatus::Draft {
            return Err(LedgerError::InvalidTransition {
                id,
                from: current.status,
                to: TransactionStatus::Posted,
            });
        }

        validate_stored_entries(&current.entries)?;

        let posted = self
            .repo
            .transition_status(id, TransactionStatus::Draft, TransactionStatus::Posted, Utc::now())
            .await?;
        let transaction = self.require_transaction(id).await?;
        if !posted {
            return Err(LedgerError::InvalidTransition {
                id,
                from: transaction.status,
                to: TransactionStatus::Posted,
            });
        }

        info!(transaction_id = %id, "Transaction posted");
        Ok(transaction)
    }

    /// Deletes a draft transaction and its entries.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or `ImmutableTransaction` for a non-draft.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), LedgerError> {
        let current = self.require_transaction(id).await?;
        if !current.status.is_editable() {
            return Err(LedgerError::ImmutableTransaction {
                id,
                status: current.status,
            });
        }

        if !self.repo.delete_draft(id).await? {
            let status = self.require_transaction(id).await?.status;
            return Err(LedgerError::ImmutableTransaction { id, status });
        }

        info!(transaction_id = %id, "Draft transaction deleted");
        Ok(())
    }

    /// Reverses a posted transaction.
    ///
    /// Posts a compensating transaction with mirrored entries, dated on the
    /// original's date, and marks the original reversed in the same unit of
    /// work. Returns the original in its reversed state.
    ///
    /// Because the compensating entries carry the original's date, balances
    /// and dashboard figures for that past period change once the reversal
    /// lands. There is no period close to protect them.
    ///
    /// Every account the original touched must still be active; reactivate
    /// an account before reversing a transaction that posted to it.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `InvalidTransition` unless the
    /// transaction is posted, or `AccountInactive`/`UnknownAccount` if an
    /// affected account can no longer take entries.
    pub async fn reverse_transaction(
        &self,
        id: TransactionId,
        reversed_by: UserId,
    ) -> Result<Transaction, LedgerError> {
        let current = self.require_transaction(id).await?;
        if current.status != TransactionStatus::Posted {
            return Err(LedgerError::InvalidTransition {
                id,
                from: current.status,
                to: TransactionStatus::Reversed,
            });
        }

        let now = Utc::now();
        let reversal = build_reversal(&current, reversed_by, now);

        let inputs: Vec<JournalEntryInput> =
            reversal.entries.iter().map(JournalEntryInput::from).collect();
        let accounts = self.load_accounts(&inputs).await?;
        validate_accounts(inputs.iter().map(|e| e.account_id), &accounts)?;

        let applied = self.repo.insert_reversal(id, &reversal, now).await?;
        let transaction = self.require_transaction(id).await?;
        if !applied {
            return Err(LedgerError::InvalidTransition {
                id,
                from: transaction.status,
                to: TransactionStatus::Reversed,
            });
        }

        info!(
            transaction_id = %id,
            reversal_id = %reversal.id,
            "Transaction reversed"
        );
        Ok(transaction)
    }

    /// Gets a transaction with its entries.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` for an unknown id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.require_transaction(id).await
    }

    /// Finds a transaction by its external reference.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        self.repo
            .find_transaction_by_reference(reference.trim())
            .await
    }

    /// Lists transactions matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.repo.list_transactions(filter).await
    }

    /// Lists transactions dated within `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.list_transactions(&TransactionFilter {
            date_from: Some(from),
            date_to: Some(to),
            ..TransactionFilter::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::balance::BalanceAggregator;
    use crate::ledger::error::ErrorKind;
    use crate::ledger::memory::InMemoryLedgerRepository;
    use crate::ledger::registry::AccountRegistry;
    use crate::ledger::types::{AccountType, CreateAccountInput};
    use buku_shared::types::Amount;
    use rstest::rstest;

    struct Ledger {
        registry: AccountRegistry,
        engine: LedgerEngine,
        balances: BalanceAggregator,
        cash: AccountId,
        payable: AccountId,
        expense: AccountId,
    }

    async fn setup() -> Ledger {
        let repo: Arc<dyn LedgerRepository> = Arc::new(InMemoryLedgerRepository::new());
        let registry = AccountRegistry::new(Arc::clone(&repo));
        let mut ids = Vec::new();
        for (code, name, account_type) in [
            ("1000", "Kas", AccountType::Asset),
            ("2100", "Utang Gaji", AccountType::Liability),
            ("5000", "Beban Gaji", AccountType::Expense),
        ] {
            let account = registry
                .create_account(CreateAccountInput {
                    code: code.to_string(),
                    name: name.to_string(),
                    account_type,
                    parent_id: None,
                })
                .await
                .unwrap();
            ids.push(account.id);
        }
        Ledger {
            registry,
            engine: LedgerEngine::new(Arc::clone(&repo)),
            balances: BalanceAggregator::new(repo),
            cash: ids[0],
            payable: ids[1],
            expense: ids[2],
        }
    }

    fn input(entries: Vec<JournalEntryInput>) -> CreateTransactionInput {
        CreateTransactionInput {
            date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            description: "Gaji Mei".to_string(),
            reference: None,
            entries,
            created_by: UserId::new(),
        }
    }

    fn pair(debit: AccountId, credit: AccountId, amount: i64) -> Vec<JournalEntryInput> {
        vec![
            JournalEntryInput::debit(debit, Amount::from_minor(amount)),
            JournalEntryInput::credit(credit, Amount::from_minor(amount)),
        ]
    }

    #[tokio::test]
    async fn test_create_draft() {
        let l = setup().await;
        let tx = l
            .engine
            .create_transaction(input(pair(l.expense, l.payable, 1_000)))
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Draft);
        assert_eq!(tx.entries.len(), 2);
        assert!(tx.entries.iter().all(|e| e.transaction_id == tx.id));
        assert_eq!(l.engine.get_transaction(tx.id).await.unwrap(), tx);
    }

    #[tokio::test]
    async fn test_unbalanced_rejected_and_nothing_persisted() {
        let l = setup().await;
        let entries = vec![
            JournalEntryInput::debit(l.expense, Amount::from_minor(100)),
            JournalEntryInput::credit(l.payable, Amount::from_minor(80)),
        ];

        let err = l.engine.create_transaction(input(entries)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("not balanced"));
        assert!(
            l.engine
                .list_transactions(&TransactionFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_inactive_account_rejected() {
        let l = setup().await;
        l.registry.deactivate_account(l.cash).await.unwrap();

        let result = l
            .engine
            .create_transaction(input(pair(l.cash, l.payable, 10)))
            .await;
        assert!(matches!(result, Err(LedgerError::AccountInactive { line: 1, .. })));
    }

    #[tokio::test]
    async fn test_post_then_update_is_immutable() {
        let l = setup().await;
        let tx = l
            .engine
            .create_transaction(input(pair(l.expense, l.payable, 1_000)))
            .await
            .unwrap();
        let posted = l.engine.post_transaction(tx.id).await.unwrap();
        assert_eq!(posted.status, TransactionStatus::Posted);
        assert!(posted.posted_at.is_some());

        let err = l
            .engine
            .update_transaction(
                tx.id,
                UpdateTransactionInput {
                    entries: Some(pair(l.expense, l.payable, 9_999)),
                    ..UpdateTransactionInput::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableState);

        let stored = l.engine.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored.entries, posted.entries);
    }

    #[tokio::test]
    async fn test_double_post_rejected_and_not_double_counted() {
        let l = setup().await;
        let tx = l
            .engine
            .create_transaction(input(pair(l.expense, l.payable, 1_000)))
            .await
            .unwrap();
        l.engine.post_transaction(tx.id).await.unwrap();

        let err = l.engine.post_transaction(tx.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(
            l.balances.compute_balance(l.expense, None).await.unwrap(),
            Amount::from_minor(1_000)
        );
    }

    #[tokio::test]
    async fn test_update_draft_revalidates() {
        let l = setup().await;
        let tx = l
            .engine
            .create_transaction(input(pair(l.expense, l.payable, 1_000)))
            .await
            .unwrap();

        let result = l
            .engine
            .update_transaction(
                tx.id,
                UpdateTransactionInput {
                    description: Some("  ".to_string()),
                    ..UpdateTransactionInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(LedgerError::EmptyDescription)));

        let updated = l
            .engine
            .update_transaction(
                tx.id,
                UpdateTransactionInput {
                    reference: Some(Some("INV-7".to_string())),
                    entries: Some(pair(l.expense, l.cash, 250)),
                    ..UpdateTransactionInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.reference.as_deref(), Some("INV-7"));
        assert_eq!(updated.entries[1].account_id, l.cash);
        assert_eq!(updated.description, "Gaji Mei");
        assert!(l.engine.find_by_reference("INV-7").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_only_drafts() {
        let l = setup().await;
        let draft = l
            .engine
            .create_transaction(input(pair(l.expense, l.payable, 10)))
            .await
            .unwrap();
        l.engine.delete_transaction(draft.id).await.unwrap();
        assert!(matches!(
            l.engine.get_transaction(draft.id).await,
            Err(LedgerError::TransactionNotFound(_))
        ));

        let posted = l
            .engine
            .create_and_post(input(pair(l.expense, l.payable, 10)))
            .await
            .unwrap();
        let err = l.engine.delete_transaction(posted.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableState);
    }

    #[tokio::test]
    async fn test_reverse_nets_to_zero() {
        let l = setup().await;
        let tx = l
            .engine
            .create_and_post(input(pair(l.expense, l.payable, 5_000)))
            .await
            .unwrap();

        let reversed = l.engine.reverse_transaction(tx.id, UserId::new()).await.unwrap();
        assert_eq!(reversed.status, TransactionStatus::Reversed);
        let reversal_id = reversed.reversed_by.unwrap();

        let reversal = l.engine.get_transaction(reversal_id).await.unwrap();
        assert_eq!(reversal.status, TransactionStatus::Posted);
        assert_eq!(reversal.reverses, Some(tx.id));

        assert_eq!(l.balances.compute_balance(l.expense, None).await.unwrap(), Amount::ZERO);
        assert_eq!(l.balances.compute_balance(l.payable, None).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_reverse_rejects_deactivated_account() {
        let l = setup().await;
        let first = l
            .engine
            .create_and_post(input(pair(l.cash, l.payable, 100)))
            .await
            .unwrap();
        l.engine
            .create_and_post(input(pair(l.payable, l.cash, 100)))
            .await
            .unwrap();
        l.registry.deactivate_account(l.cash).await.unwrap();

        let err = l
            .engine
            .reverse_transaction(first.id, UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AccountInactive { line: 1, ref code } if code == "1000"
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = l.engine.get_transaction(first.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Posted);
        assert_eq!(l.balances.compute_balance(l.cash, None).await.unwrap(), Amount::ZERO);

        l.registry.activate_account(l.cash).await.unwrap();
        l.engine.reverse_transaction(first.id, UserId::new()).await.unwrap();
        assert_eq!(
            l.balances.compute_balance(l.cash, None).await.unwrap(),
            Amount::from_minor(-100)
        );
    }

    #[rstest]
    #[case::posted(TransactionStatus::Posted)]
    #[case::reversed(TransactionStatus::Reversed)]
    #[tokio::test]
    async fn test_non_draft_cannot_be_edited_or_deleted(#[case] status: TransactionStatus) {
        let l = setup().await;
        let tx = l
            .engine
            .create_and_post(input(pair(l.expense, l.payable, 10)))
            .await
            .unwrap();
        if status == TransactionStatus::Reversed {
            l.engine.reverse_transaction(tx.id, UserId::new()).await.unwrap();
        }

        let err = l
            .engine
            .update_transaction(
                tx.id,
                UpdateTransactionInput {
                    description: Some("Gaji Mei (revisi)".to_string()),
                    ..UpdateTransactionInput::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableState);

        let err = l.engine.delete_transaction(tx.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableState);

        let stored = l.engine.get_transaction(tx.id).await.unwrap();
        assert_eq!(stored.status, status);
        assert_eq!(stored.description, "Gaji Mei");
    }

    #[tokio::test]
    async fn test_reverse_requires_posted() {
        let l = setup().await;
        let draft = l
            .engine
            .create_transaction(input(pair(l.expense, l.payable, 10)))
            .await
            .unwrap();
        let result = l.engine.reverse_transaction(draft.id, UserId::new()).await;
        assert!(matches!(
            result,
            Err(LedgerError::InvalidTransition { from: TransactionStatus::Draft, .. })
        ));

        let posted = l.engine.post_transaction(draft.id).await.unwrap();
        l.engine.reverse_transaction(posted.id, UserId::new()).await.unwrap();
        let again = l.engine.reverse_transaction(posted.id, UserId::new()).await;
        assert!(matches!(
            again,
            Err(LedgerError::InvalidTransition { from: TransactionStatus::Reversed, .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let l = setup().await;
        let mut first = input(pair(l.expense, l.payable, 10));
        first.reference = Some("PAY-1".to_string());
        l.engine.create_and_post(first.clone()).await.unwrap();

        let err = l.engine.create_and_post(first).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateReference(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let l = setup().await;
        let mut april = input(pair(l.expense, l.payable, 10));
        april.date = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        l.engine.create_and_post(april).await.unwrap();
        l.engine
            .create_transaction(input(pair(l.expense, l.cash, 20)))
            .await
            .unwrap();

        let drafts = l
            .engine
            .list_transactions(&TransactionFilter {
                status: Some(TransactionStatus::Draft),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);

        let on_cash = l
            .engine
            .list_transactions(&TransactionFilter {
                account_id: Some(l.cash),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(on_cash.len(), 1);

        let may = l
            .engine
            .list_between(
                NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(may.len(), 1);

        let all = l.engine.list_transactions(&TransactionFilter::default()).await.unwrap();
        assert_eq!(all[0].date, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap());
    }
}
