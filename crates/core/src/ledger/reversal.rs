//! Reversing entries for cancelling posted transactions.
//!
//! A posted transaction is never edited. It is cancelled by a second posted
//! transaction whose entries mirror the original's with debit and credit
//! swapped, so the pair nets to zero on every account.

use buku_shared::types::{JournalEntryId, TransactionId, UserId};
use chrono::{DateTime, Utc};

use super::types::{JournalEntry, Transaction, TransactionStatus};

/// Prefix of the reference carried by a reversing transaction.
pub const REVERSAL_REFERENCE_PREFIX: &str = "REV-";

/// Returns the reference used for the reversal of `original`.
#[must_use]
pub fn reversal_reference(original: TransactionId) -> String {
    format!("{REVERSAL_REFERENCE_PREFIX}{original}")
}

/// Builds the posted reversing transaction for `original`.
///
/// The reversal is dated on the original's date so that as-of balances on
/// or after that date see the pair cancel.
#[must_use]
pub fn build_reversal(original: &Transaction, reversed_by: UserId, at: DateTime<Utc>) -> Transaction {
    let id = TransactionId::new();

    let entries = original
        .entries
        .iter()
        .map(|entry| JournalEntry {
            id: JournalEntryId::new(),
            transaction_id: id,
            account_id: entry.account_id,
            // Swap debit and credit
            debit_amount: entry.credit_amount,
            credit_amount: entry.debit_amount,
            description: Some(format!(
                "Reversal: {}",
                entry.description.as_deref().unwrap_or_default()
            )),
        })
        .collect();

    Transaction {
        id,
        date: original.date,
        description: format!("Reversal of transaction {}: {}", original.id, original.description),
        reference: Some(reversal_reference(original.id)),
        status: TransactionStatus::Posted,
        created_by: reversed_by,
        reverses: Some(original.id),
        reversed_by: None,
        entries,
        created_at: at,
        updated_at: at,
        posted_at: Some(at),
        reversed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::validation::validate_stored_entries;
    use buku_shared::types::{AccountId, Amount};
    use chrono::NaiveDate;

    fn create_posted() -> Transaction {
        let id = TransactionId::new();
        let now = Utc::now();
        let line = |account_id, debit, credit, memo: &str| JournalEntry {
            id: JournalEntryId::new(),
            transaction_id: id,
            account_id,
            debit_amount: Amount::from_minor(debit),
            credit_amount: Amount::from_minor(credit),
            description: Some(memo.to_string()),
        };
        Transaction {
            id,
            date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            description: "Office supplies".to_string(),
            reference: None,
            status: TransactionStatus::Posted,
            created_by: UserId::new(),
            reverses: None,
            reversed_by: None,
            entries: vec![
                line(AccountId::new(), 10_000, 0, "Supplies"),
                line(AccountId::new(), 0, 10_000, "Cash payment"),
            ],
            created_at: now,
            updated_at: now,
            posted_at: Some(now),
            reversed_at: None,
        }
    }

    #[test]
    fn test_build_reversal_swaps_sides() {
        let original = create_posted();
        let reversal = build_reversal(&original, UserId::new(), Utc::now());

        assert_eq!(reversal.entries.len(), 2);
        assert_eq!(reversal.entries[0].account_id, original.entries[0].account_id);
        assert_eq!(reversal.entries[0].credit_amount, Amount::from_minor(10_000));
        assert!(reversal.entries[0].debit_amount.is_zero());
        assert_eq!(reversal.entries[1].debit_amount, Amount::from_minor(10_000));
        assert!(
            reversal.entries[0]
                .description
                .as_ref()
                .unwrap()
                .starts_with("Reversal: ")
        );
    }

    #[test]
    fn test_build_reversal_links_and_dates() {
        let original = create_posted();
        let user = UserId::new();
        let reversal = build_reversal(&original, user, Utc::now());

        assert_eq!(reversal.reverses, Some(original.id));
        assert_eq!(reversal.date, original.date);
        assert_eq!(reversal.status, TransactionStatus::Posted);
        assert_eq!(reversal.created_by, user);
        assert_eq!(reversal.reference, Some(format!("REV-{}", original.id)));
        assert!(reversal.entries.iter().all(|e| e.transaction_id == reversal.id));
    }

    #[test]
    fn test_reversal_of_balanced_is_balanced() {
        let reversal = build_reversal(&create_posted(), UserId::new(), Utc::now());
        assert!(validate_stored_entries(&reversal.entries).is_ok());
    }
}
