//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Chart of accounts (`AccountRegistry`)
//! - Transaction lifecycle (`LedgerEngine`)
//! - Derived balances and reports (`BalanceAggregator`)
//! - Business rule validation
//! - The persistence seam and an in-memory implementation

pub mod balance;
pub mod engine;
pub mod error;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod reversal;
pub mod types;
pub mod validation;

#[cfg(test)]
mod engine_props;
#[cfg(test)]
mod validation_props;

pub use balance::{AccountBalance, BalanceAggregator, NormalBalance, TrialBalance, TrialBalanceRow};
pub use engine::LedgerEngine;
pub use error::{ErrorKind, LedgerError};
pub use memory::InMemoryLedgerRepository;
pub use registry::AccountRegistry;
pub use repository::{BalanceLine, LedgerRepository, LineFilter};
pub use types::{
    Account, AccountType, CreateAccountInput, CreateTransactionInput, JournalEntry,
    JournalEntryInput, Transaction, TransactionFilter, TransactionStatus, TransactionTotals,
    UpdateTransactionInput,
};
