//! Ledger domain types.
//!
//! This module defines the chart of accounts, transactions and journal
//! entries used by the double-entry bookkeeping system, together with the
//! input types for creating and editing them.

use buku_shared::types::{AccountId, Amount, AmountError, JournalEntryId, TransactionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Account type in the chart of accounts.
///
/// The type fixes the account's natural sign convention:
/// - Asset/Expense are debit-normal
/// - Liability/Equity/Revenue are credit-normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned (cash, receivables).
    Asset,
    /// Obligations owed (payables).
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// All account types in reporting order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns the lowercase name used in storage and serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// An entry in the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Human-assigned code, unique across active and inactive accounts.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Parent account for rollup reporting.
    pub parent_id: Option<AccountId>,
    /// Whether new entries may reference this account.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Account code (must be unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Optional parent account.
    pub parent_id: Option<AccountId>,
}

/// Transaction lifecycle status.
///
/// `Draft --post--> Posted --reverse--> Reversed`; nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Being prepared; may be edited or deleted.
    Draft,
    /// Authoritative and immutable.
    Posted,
    /// Cancelled by a compensating posted transaction.
    Reversed,
}

impl TransactionStatus {
    /// Returns true if the transaction can be edited or deleted.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the transaction's entries count toward balances.
    ///
    /// A reversed transaction keeps counting: its compensating transaction
    /// is posted with mirrored entries, so the pair nets to zero.
    #[must_use]
    pub const fn affects_balance(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Returns the lowercase name used in storage and serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single debit or credit line within a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Owning transaction.
    pub transaction_id: TransactionId,
    /// Account affected by this line.
    pub account_id: AccountId,
    /// Debit amount in minor units (zero if this is a credit line).
    pub debit_amount: Amount,
    /// Credit amount in minor units (zero if this is a debit line).
    pub credit_amount: Amount,
    /// Optional line description.
    pub description: Option<String>,
}

/// A financial transaction consisting of balanced journal entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Accounting date.
    pub date: NaiveDate,
    /// Non-empty description.
    pub description: String,
    /// Optional external correlation key, unique when present.
    pub reference: Option<String>,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// User who created the transaction.
    pub created_by: UserId,
    /// The transaction this one compensates, if it is a reversal.
    pub reverses: Option<TransactionId>,
    /// The compensating transaction, once this one is reversed.
    pub reversed_by: Option<TransactionId>,
    /// Ordered journal entries.
    pub entries: Vec<JournalEntry>,
    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
    /// When the transaction was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the transaction was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// When the transaction was reversed.
    pub reversed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Returns true if any entry references the given account.
    #[must_use]
    pub fn references_account(&self, account_id: AccountId) -> bool {
        self.entries.iter().any(|e| e.account_id == account_id)
    }
}

/// Input for a single journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero for a credit line).
    pub debit_amount: Amount,
    /// Credit amount (zero for a debit line).
    pub credit_amount: Amount,
    /// Optional line description.
    #[serde(default)]
    pub description: Option<String>,
}

impl JournalEntryInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Amount) -> Self {
        Self {
            account_id,
            debit_amount: amount,
            credit_amount: Amount::ZERO,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Amount) -> Self {
        Self {
            account_id,
            debit_amount: Amount::ZERO,
            credit_amount: amount,
            description: None,
        }
    }

    /// Attaches a line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<&JournalEntry> for JournalEntryInput {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            account_id: entry.account_id,
            debit_amount: entry.debit_amount,
            credit_amount: entry.credit_amount,
            description: entry.description.clone(),
        }
    }
}

/// Input for creating a new transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// The accounting date.
    pub date: NaiveDate,
    /// A description of the transaction.
    pub description: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// The journal entries (must have at least 2).
    pub entries: Vec<JournalEntryInput>,
    /// The user creating the transaction.
    pub created_by: UserId,
}

/// Input for editing a draft transaction.
///
/// `None` leaves a field unchanged; `reference: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    /// New description.
    pub description: Option<String>,
    /// New reference.
    pub reference: Option<Option<String>>,
    /// Replacement entries.
    pub entries: Option<Vec<JournalEntryInput>>,
}

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Filter by date range start (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Filter by date range end (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Only transactions with an entry on this account.
    pub account_id: Option<AccountId>,
}

impl TransactionFilter {
    /// Returns true if the transaction passes the filter.
    #[must_use]
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.status.is_none_or(|s| transaction.status == s)
            && self.date_from.is_none_or(|from| transaction.date >= from)
            && self.date_to.is_none_or(|to| transaction.date <= to)
            && self
                .account_id
                .is_none_or(|account| transaction.references_account(account))
    }
}

/// Debit and credit totals of a set of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionTotals {
    /// Sum of debit amounts.
    pub debit: Amount,
    /// Sum of credit amounts.
    pub credit: Amount,
}

impl TransactionTotals {
    /// Returns true if debits equal credits exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }

    /// Returns debits minus credits.
    ///
    /// # Errors
    ///
    /// Returns `AmountError::Overflow` if the difference does not fit.
    pub fn difference(&self) -> Result<Amount, AmountError> {
        self.debit.checked_sub(self.credit)
    }
}
