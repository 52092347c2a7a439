//! Persistence seam for the ledger.
//!
//! The engine never talks to a store directly; it is handed an
//! `Arc<dyn LedgerRepository>`. Implementations must make every
//! multi-row write (transaction header plus entries, reversal pair)
//! a single atomic unit, and status changes compare-and-set.

use async_trait::async_trait;
use buku_shared::types::{AccountId, Amount, TransactionId};
use chrono::{DateTime, NaiveDate, Utc};

use super::error::LedgerError;
use super::types::{Account, Transaction, TransactionFilter, TransactionStatus};

/// One journal entry of a balance-affecting transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceLine {
    /// The account the entry posts to.
    pub account_id: AccountId,
    /// The owning transaction.
    pub transaction_id: TransactionId,
    /// The transaction date.
    pub date: NaiveDate,
    /// Debit amount.
    pub debit_amount: Amount,
    /// Credit amount.
    pub credit_amount: Amount,
}

/// Selects balance lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFilter {
    /// Only entries on this account.
    pub account_id: Option<AccountId>,
    /// Only transactions dated on or after this date.
    pub date_from: Option<NaiveDate>,
    /// Only transactions dated on or before this date.
    pub date_to: Option<NaiveDate>,
}

impl LineFilter {
    /// Lines for one account up to and including `as_of`.
    #[must_use]
    pub const fn account(account_id: AccountId, as_of: Option<NaiveDate>) -> Self {
        Self {
            account_id: Some(account_id),
            date_from: None,
            date_to: as_of,
        }
    }

    /// Returns true if a transaction dated `date` is inside the range.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_from.is_none_or(|from| date >= from) && self.date_to.is_none_or(|to| date <= to)
    }
}

/// Storage operations required by the ledger.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Inserts a new account.
    ///
    /// Returns `DuplicateAccountCode` if the code is taken.
    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError>;

    /// Overwrites an existing account's mutable fields.
    async fn update_account(&self, account: &Account) -> Result<(), LedgerError>;

    /// Finds an account by id.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Finds an account by code.
    async fn find_account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError>;

    /// Lists accounts ordered by code.
    async fn list_accounts(&self, include_inactive: bool) -> Result<Vec<Account>, LedgerError>;

    /// Inserts a transaction and all of its entries atomically.
    ///
    /// Returns `DuplicateReference` if the reference is taken.
    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError>;

    /// Replaces a draft's header and entries atomically.
    ///
    /// Returns `Ok(false)` without writing if the stored row is no longer a draft.
    async fn replace_draft(&self, transaction: &Transaction) -> Result<bool, LedgerError>;

    /// Deletes a draft and its entries.
    ///
    /// Returns `Ok(false)` if the stored row is no longer a draft.
    async fn delete_draft(&self, id: TransactionId) -> Result<bool, LedgerError>;

    /// Moves a transaction from `from` to `to` only if it is still in `from`.
    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError>;

    /// Inserts a posted reversal and marks `original` reversed, atomically.
    ///
    /// Returns `Ok(false)` without writing if `original` is no longer posted.
    async fn insert_reversal(
        &self,
        original: TransactionId,
        reversal: &Transaction,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError>;

    /// Finds a transaction with its entries.
    async fn find_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, LedgerError>;

    /// Finds a transaction by its external reference.
    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, LedgerError>;

    /// Lists transactions, newest date first.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Counts draft transactions with an entry on the account.
    async fn count_draft_references(&self, account_id: AccountId) -> Result<u64, LedgerError>;

    /// Returns entries of posted and reversed transactions.
    async fn balance_lines(&self, filter: &LineFilter) -> Result<Vec<BalanceLine>, LedgerError>;
}
