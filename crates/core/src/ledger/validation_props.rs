//! Property-based tests for entry validation rules.
//!
//! - Any accepted set of entries has equal debit and credit totals
//! - Any set whose totals differ is rejected with the exact difference
//! - Entries with both or neither side positive are rejected

use buku_shared::types::Amount;
use proptest::prelude::*;

use super::error::LedgerError;
use super::validation::{validate_amounts, validate_entry_shape};

/// Strategy for a positive minor-unit amount.
fn positive_amount() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for a debit/credit pair list that balances by construction.
///
/// Each debit amount is split across one to three credit lines.
fn balanced_pairs() -> impl Strategy<Value = Vec<(Amount, Amount)>> {
    prop::collection::vec((positive_amount(), 1usize..=3), 1..6).prop_map(|debits| {
        let mut pairs = Vec::new();
        for (amount, splits) in debits {
            pairs.push((Amount::from_minor(amount), Amount::ZERO));
            let splits = i64::try_from(splits).unwrap_or(1).min(amount);
            let share = amount / splits;
            let mut remaining = amount;
            for i in 0..splits {
                let part = if i == splits - 1 { remaining } else { share };
                remaining -= part;
                pairs.push((Amount::ZERO, Amount::from_minor(part)));
            }
        }
        pairs
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* balanced entry set, validation accepts it and the totals agree.
    #[test]
    fn prop_balanced_entries_accepted(pairs in balanced_pairs()) {
        let totals = validate_amounts(pairs.iter().copied());
        prop_assert!(totals.is_ok(), "balanced entries rejected: {:?}", totals);
        let totals = totals.unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
    }

    /// *For any* balanced set plus an extra one-sided line, validation
    /// rejects it and reports the extra amount as the difference.
    #[test]
    fn prop_unbalanced_reports_difference(
        pairs in balanced_pairs(),
        extra in positive_amount(),
        on_debit in any::<bool>(),
    ) {
        let mut pairs = pairs;
        let line = if on_debit {
            (Amount::from_minor(extra), Amount::ZERO)
        } else {
            (Amount::ZERO, Amount::from_minor(extra))
        };
        pairs.push(line);

        let expected = if on_debit { extra } else { -extra };
        match validate_amounts(pairs) {
            Err(LedgerError::UnbalancedTransaction { difference, .. }) => {
                prop_assert_eq!(difference, Amount::from_minor(expected));
            }
            other => prop_assert!(false, "expected unbalanced, got {:?}", other),
        }
    }

    /// *For any* entry with both sides positive, the shape check rejects it.
    #[test]
    fn prop_two_sided_entry_rejected(debit in positive_amount(), credit in positive_amount()) {
        let result = validate_entry_shape(1, Amount::from_minor(debit), Amount::from_minor(credit));
        let is_invalid_shape = matches!(result, Err(LedgerError::InvalidEntryAmounts { .. }));
        prop_assert!(is_invalid_shape);
    }

    /// *For any* entry with a negative side, the shape check rejects it.
    #[test]
    fn prop_negative_entry_rejected(amount in positive_amount(), on_debit in any::<bool>()) {
        let (debit, credit) = if on_debit {
            (Amount::from_minor(-amount), Amount::ZERO)
        } else {
            (Amount::ZERO, Amount::from_minor(-amount))
        };
        let is_invalid_shape = matches!(
            validate_entry_shape(1, debit, credit),
            Err(LedgerError::InvalidEntryAmounts { .. })
        );
        prop_assert!(is_invalid_shape);
    }
}
