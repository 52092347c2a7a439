//! Account balance calculations.
//!
//! Balances are never stored. Every query folds the journal entries of
//! posted and reversed transactions through the account type's sign
//! convention:
//! - Asset/Expense: balance = debit - credit (debit-normal)
//! - Liability/Equity/Revenue: balance = credit - debit (credit-normal)

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use buku_shared::types::{AccountId, Amount, AmountError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::repository::{BalanceLine, LedgerRepository, LineFilter};
use super::types::{Account, AccountType};
use crate::dashboard::{DashboardTotals, month_start};

/// The side on which an account's balance grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Asset, Expense.
    Debit,
    /// Liability, Equity, Revenue.
    Credit,
}

impl NormalBalance {
    /// Signs a debit/credit pair according to this convention.
    ///
    /// # Errors
    ///
    /// Returns `AmountError::Overflow` if the result does not fit.
    pub fn signed(self, debit: Amount, credit: Amount) -> Result<Amount, AmountError> {
        match self {
            Self::Debit => debit.checked_sub(credit),
            Self::Credit => credit.checked_sub(debit),
        }
    }
}

impl AccountType {
    /// Returns the account type's sign convention.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }
}

/// Debit and credit totals accumulated for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SideTotals {
    debit: Amount,
    credit: Amount,
}

impl SideTotals {
    fn add(&mut self, line: &BalanceLine) -> Result<(), AmountError> {
        self.debit = self.debit.checked_add(line.debit_amount)?;
        self.credit = self.credit.checked_add(line.credit_amount)?;
        Ok(())
    }

    fn merge(&mut self, other: Self) -> Result<(), AmountError> {
        self.debit = self.debit.checked_add(other.debit)?;
        self.credit = self.credit.checked_add(other.credit)?;
        Ok(())
    }
}

fn totals_by_account(lines: &[BalanceLine]) -> Result<HashMap<AccountId, SideTotals>, AmountError> {
    let mut totals: HashMap<AccountId, SideTotals> = HashMap::new();
    for line in lines {
        totals.entry(line.account_id).or_default().add(line)?;
    }
    Ok(totals)
}

/// Balance of one account at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// The account code.
    pub code: String,
    /// The account type.
    pub account_type: AccountType,
    /// Total debit amount.
    pub debit_total: Amount,
    /// Total credit amount.
    pub credit_total: Amount,
    /// Net balance in the account's natural sign.
    pub balance: Amount,
}

/// One account's row in a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// The account ID.
    pub account_id: AccountId,
    /// The account code.
    pub code: String,
    /// The account name.
    pub name: String,
    /// The account type.
    pub account_type: AccountType,
    /// Net debit balance (zero if the account nets to credit).
    pub debit: Amount,
    /// Net credit balance (zero if the account nets to debit).
    pub credit: Amount,
}

/// Trial balance as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Cut-off date, inclusive. `None` means all time.
    pub as_of: Option<NaiveDate>,
    /// Rows ordered by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of the debit column.
    pub total_debit: Amount,
    /// Sum of the credit column.
    pub total_credit: Amount,
}

impl TrialBalance {
    /// Returns true if the debit and credit columns agree.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// Read-only balance queries over the ledger.
#[derive(Clone)]
pub struct BalanceAggregator {
    repo: Arc<dyn LedgerRepository>,
}

impl BalanceAggregator {
    /// Creates an aggregator over the given repository.
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    async fn require_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.repo
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Computes an account's balance from posted entries dated on or before
    /// `as_of` (all time if `None`).
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown account, or a storage error.
    pub async fn compute_balance(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<Amount, LedgerError> {
        Ok(self.account_balance(account_id, as_of).await?.balance)
    }

    /// Computes an account's balance with its debit and credit totals.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown account, or a storage error.
    pub async fn account_balance(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<AccountBalance, LedgerError> {
        let account = self.require_account(account_id).await?;
        let lines = self
            .repo
            .balance_lines(&LineFilter::account(account_id, as_of))
            .await?;

        let mut totals = SideTotals::default();
        for line in &lines {
            totals.add(line)?;
        }

        Ok(AccountBalance {
            account_id,
            code: account.code,
            account_type: account.account_type,
            debit_total: totals.debit,
            credit_total: totals.credit,
            balance: account
                .account_type
                .normal_balance()
                .signed(totals.debit, totals.credit)?,
        })
    }

    /// Net movement on an account between `from` and `to`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown account, or a storage error.
    pub async fn balance_in_range(
        &self,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Amount, LedgerError> {
        let account = self.require_account(account_id).await?;
        let lines = self
            .repo
            .balance_lines(&LineFilter {
                account_id: Some(account_id),
                date_from: Some(from),
                date_to: Some(to),
            })
            .await?;

        let mut totals = SideTotals::default();
        for line in &lines {
            totals.add(line)?;
        }
        Ok(account
            .account_type
            .normal_balance()
            .signed(totals.debit, totals.credit)?)
    }

    /// Sums balances per account type as of a date.
    ///
    /// Every type is present in the result, zero if it has no activity.
    ///
    /// # Errors
    ///
    /// Returns a storage error or an overflow.
    pub async fn balances_by_type(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<BTreeMap<AccountType, Amount>, LedgerError> {
        self.totals_by_type(LineFilter {
            account_id: None,
            date_from: None,
            date_to: as_of,
        })
        .await
    }

    async fn totals_by_type(
        &self,
        filter: LineFilter,
    ) -> Result<BTreeMap<AccountType, Amount>, LedgerError> {
        let accounts = self.repo.list_accounts(true).await?;
        let lines = self.repo.balance_lines(&filter).await?;
        let per_account = totals_by_account(&lines)?;

        let mut by_type: BTreeMap<AccountType, Amount> =
            AccountType::ALL.iter().map(|t| (*t, Amount::ZERO)).collect();

        for account in &accounts {
            let Some(totals) = per_account.get(&account.id) else {
                continue;
            };
            let balance = account
                .account_type
                .normal_balance()
                .signed(totals.debit, totals.credit)?;
            let slot = by_type.entry(account.account_type).or_default();
            *slot = slot.checked_add(balance)?;
        }

        Ok(by_type)
    }

    /// Balance of an account plus all of its descendants.
    ///
    /// Child totals are signed with the root account's convention.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown account, or a storage error.
    pub async fn rollup_balance(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<Amount, LedgerError> {
        let root = self.require_account(account_id).await?;
        let accounts = self.repo.list_accounts(true).await?;

        let mut subtree: HashSet<AccountId> = HashSet::from([root.id]);
        let mut frontier = vec![root.id];
        while let Some(parent) = frontier.pop() {
            for child in accounts.iter().filter(|a| a.parent_id == Some(parent)) {
                if subtree.insert(child.id) {
                    frontier.push(child.id);
                }
            }
        }

        let lines = self
            .repo
            .balance_lines(&LineFilter {
                account_id: None,
                date_from: None,
                date_to: as_of,
            })
            .await?;

        let mut totals = SideTotals::default();
        for line in lines.iter().filter(|l| subtree.contains(&l.account_id)) {
            totals.add(line)?;
        }
        Ok(root
            .account_type
            .normal_balance()
            .signed(totals.debit, totals.credit)?)
    }

    /// Builds a trial balance of every account with activity.
    ///
    /// # Errors
    ///
    /// Returns a storage error or an overflow.
    pub async fn trial_balance(&self, as_of: Option<NaiveDate>) -> Result<TrialBalance, LedgerError> {
        let accounts = self.repo.list_accounts(true).await?;
        let lines = self
            .repo
            .balance_lines(&LineFilter {
                account_id: None,
                date_from: None,
                date_to: as_of,
            })
            .await?;
        let per_account = totals_by_account(&lines)?;

        let mut rows = Vec::new();
        let mut grand = SideTotals::default();

        for account in accounts {
            let Some(totals) = per_account.get(&account.id) else {
                continue;
            };
            let net = totals.debit.checked_sub(totals.credit)?;
            let (debit, credit) = if net.is_negative() {
                (Amount::ZERO, totals.credit.checked_sub(totals.debit)?)
            } else {
                (net, Amount::ZERO)
            };
            grand.merge(SideTotals { debit, credit })?;
            rows.push(TrialBalanceRow {
                account_id: account.id,
                code: account.code,
                name: account.name,
                account_type: account.account_type,
                debit,
                credit,
            });
        }

        Ok(TrialBalance {
            as_of,
            rows,
            total_debit: grand.debit,
            total_credit: grand.credit,
        })
    }

    /// Computes dashboard totals for the month containing `reference_date`.
    ///
    /// # Errors
    ///
    /// Returns a storage error or an overflow.
    pub async fn dashboard_totals(
        &self,
        reference_date: NaiveDate,
    ) -> Result<DashboardTotals, LedgerError> {
        let period_start = month_start(reference_date);

        let position = self.balances_by_type(Some(reference_date)).await?;
        let activity = self
            .totals_by_type(LineFilter {
                account_id: None,
                date_from: Some(period_start),
                date_to: Some(reference_date),
            })
            .await?;

        let of = |map: &BTreeMap<AccountType, Amount>, t| map.get(&t).copied().unwrap_or_default();
        let monthly_revenue = of(&activity, AccountType::Revenue);
        let monthly_expenses = of(&activity, AccountType::Expense);

        Ok(DashboardTotals {
            as_of: reference_date,
            period_start,
            total_assets: of(&position, AccountType::Asset),
            total_liabilities: of(&position, AccountType::Liability),
            total_equity: of(&position, AccountType::Equity),
            monthly_revenue,
            monthly_expenses,
            net_income: monthly_revenue.checked_sub(monthly_expenses)?,
        })
    }
}
