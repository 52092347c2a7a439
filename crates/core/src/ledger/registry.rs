//! Chart of accounts.
//!
//! Accounts are created once and never hard-deleted. Deactivation is
//! refused while the account still carries a posted balance or is used by
//! an in-flight draft.

use std::sync::Arc;

use buku_shared::types::AccountId;
use chrono::Utc;
use tracing::info;

use super::balance::BalanceAggregator;
use super::error::LedgerError;
use super::repository::LedgerRepository;
use super::types::{Account, CreateAccountInput};

/// Service managing the chart of accounts.
#[derive(Clone)]
pub struct AccountRegistry {
    repo: Arc<dyn LedgerRepository>,
}

impl AccountRegistry {
    /// Creates a registry over the given repository.
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    /// Creates a new active account.
    ///
    /// Code and name are trimmed before storage.
    ///
    /// # Errors
    ///
    /// Returns `EmptyAccountCode`/`EmptyAccountName`, `DuplicateAccountCode`
    /// if the code is taken by any account, or `ParentAccountNotFound`.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<Account, LedgerError> {
        let code = input.code.trim();
        let name = input.name.trim();
        if code.is_empty() {
            return Err(LedgerError::EmptyAccountCode);
        }
        if name.is_empty() {
            return Err(LedgerError::EmptyAccountName);
        }

        if self.repo.find_account_by_code(code).await?.is_some() {
            return Err(LedgerError::DuplicateAccountCode(code.to_string()));
        }
        if let Some(parent_id) = input.parent_id
            && self.repo.find_account(parent_id).await?.is_none()
        {
            return Err(LedgerError::ParentAccountNotFound(parent_id));
        }

        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            code: code.to_string(),
            name: name.to_string(),
            account_type: input.account_type,
            parent_id: input.parent_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_account(&account).await?;

        info!(
            account_id = %account.id,
            account_code = %account.code,
            account_type = %account.account_type,
            "Account created"
        );
        Ok(account)
    }

    /// Deactivates an account.
    ///
    /// Deactivating an already inactive account is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound`, `AccountHasBalance` if the posted balance is
    /// non-zero, or `AccountHasDraftReferences` if any draft uses the account.
    pub async fn deactivate_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let mut account = self.get_account(id).await?;
        if !account.is_active {
            return Ok(account);
        }

        let balance = BalanceAggregator::new(Arc::clone(&self.repo))
            .compute_balance(id, None)
            .await?;
        if !balance.is_zero() {
            return Err(LedgerError::AccountHasBalance {
                code: account.code,
                balance,
            });
        }

        let drafts = self.repo.count_draft_references(id).await?;
        if drafts > 0 {
            return Err(LedgerError::AccountHasDraftReferences {
                code: account.code,
                drafts,
            });
        }

        account.is_active = false;
        account.updated_at = Utc::now();
        self.repo.update_account(&account).await?;

        info!(account_id = %account.id, account_code = %account.code, "Account deactivated");
        Ok(account)
    }

    /// Re-activates an inactive account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown id.
    pub async fn activate_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let mut account = self.get_account(id).await?;
        if account.is_active {
            return Ok(account);
        }

        account.is_active = true;
        account.updated_at = Utc::now();
        self.repo.update_account(&account).await?;

        info!(account_id = %account.id, account_code = %account.code, "Account activated");
        Ok(account)
    }

    /// Changes an account's display name.
    ///
    /// # Errors
    ///
    /// Returns `EmptyAccountName` or `AccountNotFound`.
    pub async fn rename_account(&self, id: AccountId, name: &str) -> Result<Account, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyAccountName);
        }

        let mut account = self.get_account(id).await?;
        account.name = name.to_string();
        account.updated_at = Utc::now();
        self.repo.update_account(&account).await?;
        Ok(account)
    }

    /// Gets an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.repo
            .find_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Lists accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_accounts(&self, include_inactive: bool) -> Result<Vec<Account>, LedgerError> {
        self.repo.list_accounts(include_inactive).await
    }

    /// Looks up an account by code, active or not.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn lookup_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        self.repo.find_account_by_code(code.trim()).await
    }

    /// Lists the direct children of an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown id.
    pub async fn children(&self, id: AccountId) -> Result<Vec<Account>, LedgerError> {
        self.get_account(id).await?;
        let accounts = self.repo.list_accounts(true).await?;
        Ok(accounts
            .into_iter()
            .filter(|a| a.parent_id == Some(id))
            .collect())
    }
}
