//! Business rule validation for posting lines and entry state.

use rust_decimal::Decimal;

use super::account::Account;
use super::error::LedgerError;
use super::types::{EntryState, EntryTotals, PostingInput};
use closebook_shared::types::LedgerEntryId;

/// Validates the structure and balance of a set of posting lines.
///
/// Checks, in order: at least two lines, no negative amounts, exactly one
/// non-zero side per line, and total debits equal total credits exactly.
///
/// # Errors
///
/// Returns the first rule violated.
pub fn validate_postings(postings: &[PostingInput]) -> Result<EntryTotals, LedgerError> {
    if postings.len() < 2 {
        return Err(LedgerError::InsufficientPostings);
    }

    for posting in postings {
        validate_posting_amounts(posting)?;
    }

    let totals = EntryTotals::new(
        postings.iter().map(|p| p.debit).sum(),
        postings.iter().map(|p| p.credit).sum(),
    );

    if !totals.is_balanced {
        return Err(LedgerError::UnbalancedEntry {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

fn validate_posting_amounts(posting: &PostingInput) -> Result<(), LedgerError> {
    if posting.debit < Decimal::ZERO || posting.credit < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount);
    }

    match (posting.debit.is_zero(), posting.credit.is_zero()) {
        (true, true) => Err(LedgerError::ZeroAmount),
        (false, false) => Err(LedgerError::InvalidPostingSides),
        _ => Ok(()),
    }
}

/// Validates that an account can receive postings.
///
/// # Errors
///
/// Returns `AccountInactive` or `NonLeafAccount`.
pub fn validate_account(account: &Account) -> Result<(), LedgerError> {
    if !account.is_active {
        return Err(LedgerError::AccountInactive(account.id));
    }
    if !account.is_leaf {
        return Err(LedgerError::NonLeafAccount(account.id));
    }
    Ok(())
}

/// Validates that an entry can be modified.
///
/// # Errors
///
/// Returns error if the entry is confirmed or voided.
pub fn validate_can_modify(id: LedgerEntryId, state: EntryState) -> Result<(), LedgerError> {
    match state {
        EntryState::Draft => Ok(()),
        EntryState::Confirmed => Err(LedgerError::AlreadyConfirmed(id)),
        EntryState::Voided => Err(LedgerError::InvalidEntryState {
            id,
            state,
            operation: "modify",
        }),
    }
}

/// Validates that an entry can be voided. Only confirmed entries can.
///
/// # Errors
///
/// Returns `InvalidEntryState` for drafts and already voided entries.
pub fn validate_can_void(id: LedgerEntryId, state: EntryState) -> Result<(), LedgerError> {
    if state != EntryState::Confirmed {
        return Err(LedgerError::InvalidEntryState {
            id,
            state,
            operation: "void",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use closebook_shared::types::{AccountId, CompanyId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn line(debit: Decimal, credit: Decimal) -> PostingInput {
        PostingInput {
            account_id: AccountId::new(),
            debit,
            credit,
            counterparty: None,
            cost_center: None,
        }
    }

    #[test]
    fn test_balanced_postings_accepted() {
        let totals = validate_postings(&[
            line(dec!(100.00), Decimal::ZERO),
            line(Decimal::ZERO, dec!(82.00)),
            line(Decimal::ZERO, dec!(18.00)),
        ])
        .unwrap();
        assert!(totals.is_balanced);
        assert_eq!(totals.debit, dec!(100.00));
    }

    #[test]
    fn test_single_posting_rejected() {
        assert!(matches!(
            validate_postings(&[line(dec!(10), Decimal::ZERO)]),
            Err(LedgerError::InsufficientPostings)
        ));
    }

    #[test]
    fn test_unbalanced_reports_totals() {
        let err = validate_postings(&[
            line(dec!(100.00), Decimal::ZERO),
            line(Decimal::ZERO, dec!(99.99)),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnbalancedEntry { debit, credit }
                if debit == dec!(100.00) && credit == dec!(99.99)
        ));
    }

    #[rstest]
    #[case(dec!(0), dec!(0), "ZERO_AMOUNT")]
    #[case(dec!(-5), dec!(0), "NEGATIVE_AMOUNT")]
    #[case(dec!(0), dec!(-5), "NEGATIVE_AMOUNT")]
    #[case(dec!(5), dec!(5), "INVALID_POSTING_SIDES")]
    fn test_invalid_posting_amounts(
        #[case] debit: Decimal,
        #[case] credit: Decimal,
        #[case] code: &str,
    ) {
        let err = validate_postings(&[line(debit, credit), line(dec!(5), Decimal::ZERO)])
            .unwrap_err();
        assert_eq!(err.error_code(), code);
    }

    #[rstest]
    #[case(true, true, None)]
    #[case(false, true, Some("ACCOUNT_INACTIVE"))]
    #[case(true, false, Some("NON_LEAF_ACCOUNT"))]
    fn test_validate_account(
        #[case] is_active: bool,
        #[case] is_leaf: bool,
        #[case] expected: Option<&str>,
    ) {
        let account = Account {
            id: AccountId::new(),
            company_id: CompanyId::new(),
            code: "1.1.01".to_string(),
            name: "Cash".to_string(),
            account_type: super::super::account::AccountType::Asset,
            parent_id: None,
            is_active,
            is_leaf,
        };
        let result = validate_account(&account);
        assert_eq!(result.err().map(|e| e.error_code()), expected);
    }

    #[test]
    fn test_validate_can_modify() {
        let id = LedgerEntryId::new();
        assert!(validate_can_modify(id, EntryState::Draft).is_ok());
        assert!(matches!(
            validate_can_modify(id, EntryState::Confirmed),
            Err(LedgerError::AlreadyConfirmed(_))
        ));
        assert!(matches!(
            validate_can_modify(id, EntryState::Voided),
            Err(LedgerError::InvalidEntryState { .. })
        ));
    }

    #[test]
    fn test_only_confirmed_entries_can_be_voided() {
        let id = LedgerEntryId::new();
        assert!(validate_can_void(id, EntryState::Confirmed).is_ok());
        assert!(validate_can_void(id, EntryState::Draft).is_err());
        assert!(validate_can_void(id, EntryState::Voided).is_err());
    }
}
