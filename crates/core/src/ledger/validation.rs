//! Business rule validation for ledger operations.
//!
//! Checks run in a fixed order so the first reported failure is predictable:
//! entry count, account resolution, entry shape, balance, description.

use std::collections::HashMap;

use buku_shared::types::{AccountId, Amount};

use super::error::LedgerError;
use super::types::{Account, JournalEntry, JournalEntryInput, TransactionTotals};

/// Minimum number of entries in a transaction.
pub const MIN_ENTRIES: usize = 2;

/// Validates a proposed transaction against the chart of accounts.
///
/// `accounts` must contain every account the entries reference that exists;
/// missing keys are reported as unknown accounts.
///
/// # Errors
///
/// Returns the first violated rule as a `LedgerError`.
pub fn validate_transaction(
    description: &str,
    entries: &[JournalEntryInput],
    accounts: &HashMap<AccountId, Account>,
) -> Result<TransactionTotals, LedgerError> {
    // (a) Minimum entries
    if entries.len() < MIN_ENTRIES {
        return Err(LedgerError::InsufficientEntries {
            count: entries.len(),
        });
    }

    // (b) Every entry resolves to an active account
    validate_accounts(entries.iter().map(|e| e.account_id), accounts)?;

    // (c) Exactly one side strictly positive, (d) balanced
    let totals = validate_amounts(
        entries
            .iter()
            .map(|e| (e.debit_amount, e.credit_amount)),
    )?;

    // (e) Description
    if description.trim().is_empty() {
        return Err(LedgerError::EmptyDescription);
    }

    Ok(totals)
}

/// Checks that every referenced account exists and is active.
///
/// Lines are reported 1-based in iteration order.
///
/// # Errors
///
/// Returns `UnknownAccount` or `AccountInactive` for the first offending line.
pub fn validate_accounts<I>(
    account_ids: I,
    accounts: &HashMap<AccountId, Account>,
) -> Result<(), LedgerError>
where
    I: IntoIterator<Item = AccountId>,
{
    for (line, account_id) in (1..).zip(account_ids) {
        let account = accounts
            .get(&account_id)
            .ok_or(LedgerError::UnknownAccount { line, account_id })?;
        if !account.is_active {
            return Err(LedgerError::AccountInactive {
                line,
                code: account.code.clone(),
            });
        }
    }
    Ok(())
}

/// Re-validates stored entries right before posting.
///
/// # Errors
///
/// Returns an error if the entry count, shape or balance is violated.
pub fn validate_stored_entries(entries: &[JournalEntry]) -> Result<TransactionTotals, LedgerError> {
    if entries.len() < MIN_ENTRIES {
        return Err(LedgerError::InsufficientEntries {
            count: entries.len(),
        });
    }

    validate_amounts(
        entries
            .iter()
            .map(|e| (e.debit_amount, e.credit_amount)),
    )
}

/// Checks entry shape and the balance invariant over `(debit, credit)` pairs.
///
/// # Errors
///
/// Returns `InvalidEntryAmounts`, `InvalidAmount` on overflow, or
/// `UnbalancedTransaction`.
pub fn validate_amounts<I>(amounts: I) -> Result<TransactionTotals, LedgerError>
where
    I: IntoIterator<Item = (Amount, Amount)>,
{
    let mut debit = Amount::ZERO;
    let mut credit = Amount::ZERO;

    for (index, (entry_debit, entry_credit)) in amounts.into_iter().enumerate() {
        validate_entry_shape(index + 1, entry_debit, entry_credit)?;
        debit = debit.checked_add(entry_debit)?;
        credit = credit.checked_add(entry_credit)?;
    }

    let totals = TransactionTotals { debit, credit };
    if !totals.is_balanced() {
        return Err(LedgerError::UnbalancedTransaction {
            debit,
            credit,
            difference: totals.difference()?,
        });
    }

    Ok(totals)
}

/// Validates that exactly one side of an entry is strictly positive.
///
/// # Errors
///
/// Returns `InvalidEntryAmounts` naming the 1-based line.
pub fn validate_entry_shape(line: usize, debit: Amount, credit: Amount) -> Result<(), LedgerError> {
    let one_sided = (debit.is_positive() && credit.is_zero())
        || (debit.is_zero() && credit.is_positive());

    if one_sided {
        Ok(())
    } else {
        Err(LedgerError::InvalidEntryAmounts {
            line,
            debit,
            credit,
        })
    }
}
