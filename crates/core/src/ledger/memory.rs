//! In-memory ledger repository.
//!
//! Holds all records behind a single lock, so every write is trivially
//! atomic. Entries are indexed by account for balance queries. Intended for
//! tests and embedding; production uses the database-backed repository.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use buku_shared::types::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::error::LedgerError;
use super::repository::{BalanceLine, LedgerRepository, LineFilter};
use super::types::{Account, Transaction, TransactionFilter, TransactionStatus};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    account_codes: HashMap<String, AccountId>,
    transactions: HashMap<TransactionId, Transaction>,
    references: HashMap<String, TransactionId>,
    by_account: HashMap<AccountId, BTreeSet<TransactionId>>,
}

impl MemoryState {
    fn index(&mut self, transaction: &Transaction) {
        for entry in &transaction.entries {
            self.by_account
                .entry(entry.account_id)
                .or_default()
                .insert(transaction.id);
        }
        if let Some(reference) = &transaction.reference {
            self.references.insert(reference.clone(), transaction.id);
        }
    }

    fn unindex(&mut self, transaction: &Transaction) {
        for entry in &transaction.entries {
            if let Some(ids) = self.by_account.get_mut(&entry.account_id) {
                ids.remove(&transaction.id);
            }
        }
        if let Some(reference) = &transaction.reference {
            self.references.remove(reference);
        }
    }

    fn reference_taken(&self, reference: Option<&String>, owner: TransactionId) -> Option<String> {
        let reference = reference?;
        match self.references.get(reference) {
            Some(existing) if *existing != owner => Some(reference.clone()),
            _ => None,
        }
    }
}

/// Repository keeping every record in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryLedgerRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if state.account_codes.contains_key(&account.code) {
            return Err(LedgerError::DuplicateAccountCode(account.code.clone()));
        }
        state.account_codes.insert(account.code.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let stored = state
            .accounts
            .get_mut(&account.id)
            .ok_or(LedgerError::AccountNotFound(account.id))?;
        stored.name.clone_from(&account.name);
        stored.is_active = account.is_active;
        stored.updated_at = account.updated_at;
        Ok(())
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .account_codes
            .get(code)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn list_accounts(&self, include_inactive: bool) -> Result<Vec<Account>, LedgerError> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| include_inactive || a.is_active)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if let Some(reference) = state.reference_taken(transaction.reference.as_ref(), transaction.id) {
            return Err(LedgerError::DuplicateReference(reference));
        }
        state.index(transaction);
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn replace_draft(&self, transaction: &Transaction) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        let previous = match state.transactions.get(&transaction.id) {
            Some(stored) if stored.status == TransactionStatus::Draft => stored.clone(),
            Some(_) => return Ok(false),
            None => return Err(LedgerError::TransactionNotFound(transaction.id)),
        };
        if let Some(reference) = state.reference_taken(transaction.reference.as_ref(), transaction.id) {
            return Err(LedgerError::DuplicateReference(reference));
        }
        state.unindex(&previous);
        state.index(transaction);
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(true)
    }

    async fn delete_draft(&self, id: TransactionId) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        let removed = match state.transactions.get(&id) {
            Some(stored) if stored.status == TransactionStatus::Draft => stored.clone(),
            Some(_) => return Ok(false),
            None => return Err(LedgerError::TransactionNotFound(id)),
        };
        state.unindex(&removed);
        state.transactions.remove(&id);
        Ok(true)
    }

    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        let stored = state
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if stored.status != from {
            return Ok(false);
        }
        stored.status = to;
        stored.updated_at = at;
        match to {
            TransactionStatus::Posted => stored.posted_at = Some(at),
            TransactionStatus::Reversed => stored.reversed_at = Some(at),
            TransactionStatus::Draft => {}
        }
        Ok(true)
    }

    async fn insert_reversal(
        &self,
        original: TransactionId,
        reversal: &Transaction,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        match state.transactions.get(&original) {
            Some(stored) if stored.status == TransactionStatus::Posted => {}
            Some(_) => return Ok(false),
            None => return Err(LedgerError::TransactionNotFound(original)),
        }
        if let Some(reference) = state.reference_taken(reversal.reference.as_ref(), reversal.id) {
            return Err(LedgerError::DuplicateReference(reference));
        }

        state.index(reversal);
        state.transactions.insert(reversal.id, reversal.clone());
        if let Some(stored) = state.transactions.get_mut(&original) {
            stored.status = TransactionStatus::Reversed;
            stored.reversed_by = Some(reversal.id);
            stored.reversed_at = Some(at);
            stored.updated_at = at;
        }
        Ok(true)
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .references
            .get(reference)
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.read().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(transactions)
    }

    async fn count_draft_references(&self, account_id: AccountId) -> Result<u64, LedgerError> {
        let state = self.state.read().await;
        let count = state
            .by_account
            .get(&account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.transactions.get(id))
            .filter(|t| t.status == TransactionStatus::Draft)
            .count();
        Ok(count as u64)
    }

    async fn balance_lines(&self, filter: &LineFilter) -> Result<Vec<BalanceLine>, LedgerError> {
        let state = self.state.read().await;

        let candidates: Vec<&Transaction> = match filter.account_id {
            Some(account_id) => state
                .by_account
                .get(&account_id)
                .into_iter()
                .flatten()
                .filter_map(|id| state.transactions.get(id))
                .collect(),
            None => state.transactions.values().collect(),
        };

        let lines = candidates
            .into_iter()
            .filter(|t| t.status.affects_balance() && filter.covers(t.date))
            .flat_map(|t| {
                t.entries.iter().map(move |e| BalanceLine {
                    account_id: e.account_id,
                    transaction_id: t.id,
                    date: t.date,
                    debit_amount: e.debit_amount,
                    credit_amount: e.credit_amount,
                })
            })
            .filter(|line| filter.account_id.is_none_or(|id| line.account_id == id))
            .collect();

        Ok(lines)
    }
}
