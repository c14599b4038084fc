//! Property-based tests for posting validation.
//!
//! - Property 1: Entry Balance Integrity
//! - Property 2: Posting Side Exclusivity

use proptest::prelude::*;
use rust_decimal::Decimal;

use closebook_shared::types::AccountId;

use super::error::LedgerError;
use super::types::PostingInput;
use super::validation::validate_postings;

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a line on either side.
fn posting_line() -> impl Strategy<Value = PostingInput> {
    (positive_amount(), any::<bool>()).prop_map(|(amount, is_debit)| {
        if is_debit {
            PostingInput::debit(AccountId::new(), amount)
        } else {
            PostingInput::credit(AccountId::new(), amount)
        }
    })
}

/// Splits `total` into `parts` positive cent amounts summing exactly to it.
fn split(total_cents: i64, parts: usize) -> Vec<Decimal> {
    let parts_i64 = i64::try_from(parts).unwrap();
    let base = total_cents / parts_i64;
    let mut amounts = vec![Decimal::new(base, 2); parts];
    amounts[0] += Decimal::new(total_cents - base * parts_i64, 2);
    amounts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // =========================================================================
    // Property 1: Entry Balance Integrity
    // =========================================================================

    /// Property 1.1: Balanced entries are accepted.
    ///
    /// *For any* set of debit lines and credit lines with equal totals,
    /// validation SHALL succeed and report identical debit and credit totals.
    #[test]
    fn prop_balanced_entry_accepted(
        total_cents in 100i64..10_000_000i64,
        debit_parts in 1usize..6,
        credit_parts in 1usize..6,
    ) {
        let mut postings: Vec<PostingInput> = split(total_cents, debit_parts)
            .into_iter()
            .map(|a| PostingInput::debit(AccountId::new(), a))
            .collect();
        postings.extend(
            split(total_cents, credit_parts)
                .into_iter()
                .map(|a| PostingInput::credit(AccountId::new(), a)),
        );

        let totals = validate_postings(&postings);
        prop_assert!(totals.is_ok(), "Balanced entry should be accepted");
        let totals = totals.unwrap();
        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.debit, Decimal::new(total_cents, 2));
    }

    /// Property 1.2: Acceptance implies exact balance.
    ///
    /// *For any* random set of lines, validation SHALL succeed if and only if
    /// total debits equal total credits, and a rejection SHALL carry both totals.
    #[test]
    fn prop_accepted_iff_balanced(
        postings in prop::collection::vec(posting_line(), 2..10),
    ) {
        let debit: Decimal = postings.iter().map(|p| p.debit).sum();
        let credit: Decimal = postings.iter().map(|p| p.credit).sum();

        match validate_postings(&postings) {
            Ok(totals) => {
                prop_assert_eq!(debit, credit);
                prop_assert_eq!(totals.debit, debit);
            }
            Err(LedgerError::UnbalancedEntry { debit: d, credit: c }) => {
                prop_assert_ne!(debit, credit);
                prop_assert_eq!(d, debit);
                prop_assert_eq!(c, credit);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// Property 1.3: A one-cent imbalance is never accepted.
    #[test]
    fn prop_one_cent_off_rejected(amount in positive_amount()) {
        let postings = vec![
            PostingInput::debit(AccountId::new(), amount),
            PostingInput::credit(AccountId::new(), amount + Decimal::new(1, 2)),
        ];
        let is_unbalanced = matches!(
            validate_postings(&postings),
            Err(LedgerError::UnbalancedEntry { .. })
        );
        prop_assert!(is_unbalanced);
    }

    // =========================================================================
    // Property 2: Posting Side Exclusivity
    // =========================================================================

    /// Property 2.1: Lines with both sides set are rejected.
    #[test]
    fn prop_both_sides_rejected(debit in positive_amount(), credit in positive_amount()) {
        let mut line = PostingInput::debit(AccountId::new(), debit);
        line.credit = credit;
        let postings = vec![line, PostingInput::credit(AccountId::new(), debit)];
        let is_invalid_sides = matches!(
            validate_postings(&postings),
            Err(LedgerError::InvalidPostingSides)
        );
        prop_assert!(is_invalid_sides);
    }

    /// Property 2.2: Negative amounts are rejected regardless of balance.
    #[test]
    fn prop_negative_rejected(amount in positive_amount()) {
        let postings = vec![
            PostingInput::debit(AccountId::new(), -amount),
            PostingInput::debit(AccountId::new(), amount),
        ];
        let is_negative = matches!(
            validate_postings(&postings),
            Err(LedgerError::NegativeAmount)
        );
        prop_assert!(is_negative);
    }
}
