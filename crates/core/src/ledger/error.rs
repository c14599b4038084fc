//! Ledger error types for validation and state errors.

use chrono::NaiveDate;
use closebook_shared::types::{AccountId, LedgerEntryId, PeriodId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::EntryState;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 postings.
    #[error("Entry must have at least 2 postings")]
    InsufficientPostings,

    /// Entry is not balanced (debits != credits).
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Posting amount cannot be zero.
    #[error("Posting amount cannot be zero")]
    ZeroAmount,

    /// Posting amount cannot be negative.
    #[error("Posting amount cannot be negative")]
    NegativeAmount,

    /// Posting must specify either debit or credit, not both.
    #[error("Posting must specify either debit or credit, not both")]
    InvalidPostingSides,

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Account has children and does not accept postings.
    #[error("Account {0} is not a leaf account and does not accept postings")]
    NonLeafAccount(AccountId),

    // ========== Period Errors ==========
    /// No accounting period covers the date.
    #[error("No accounting period found for date {0}")]
    NoPeriod(NaiveDate),

    /// The period covering the date does not accept entries.
    #[error("Accounting period {period_id} is closed, no entries allowed on {date}")]
    PeriodClosed {
        /// Date that was rejected.
        date: NaiveDate,
        /// Period covering the date.
        period_id: PeriodId,
    },

    // ========== Entry State Errors ==========
    /// Entry is already confirmed.
    #[error("Entry {0} is already confirmed")]
    AlreadyConfirmed(LedgerEntryId),

    /// Operation is not allowed in the entry's current state.
    #[error("Cannot {operation} entry {id} in state {state}")]
    InvalidEntryState {
        /// The entry.
        id: LedgerEntryId,
        /// Its current state.
        state: EntryState,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(LedgerEntryId),

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Storage Errors ==========
    /// Storage failure.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientPostings => "INSUFFICIENT_POSTINGS",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::InvalidPostingSides => "INVALID_POSTING_SIDES",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::NonLeafAccount(_) => "NON_LEAF_ACCOUNT",
            Self::NoPeriod(_) => "NO_PERIOD",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::AlreadyConfirmed(_) => "ALREADY_CONFIRMED",
            Self::InvalidEntryState { .. } => "INVALID_ENTRY_STATE",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::ConcurrentModification,
            StoreError::NotFound(msg) | StoreError::Backend(msg) => Self::Persistence(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InsufficientPostings.error_code(), "INSUFFICIENT_POSTINGS");
        assert_eq!(
            LedgerError::UnbalancedEntry {
                debit: dec!(1.00),
                credit: dec!(0.50),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::NoPeriod(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).error_code(),
            "NO_PERIOD"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(!LedgerError::ZeroAmount.is_retryable());
        assert!(!LedgerError::Persistence("down".to_string()).is_retryable());
    }

    #[test]
    fn test_store_conflict_maps_to_concurrent_modification() {
        let err: LedgerError = StoreError::Conflict("entry version".to_string()).into();
        assert!(matches!(err, LedgerError::ConcurrentModification));

        let err: LedgerError = StoreError::Backend("pool timeout".to_string()).into();
        assert!(matches!(err, LedgerError::Persistence(msg) if msg == "pool timeout"));
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::UnbalancedEntry {
            debit: dec!(100.00),
            credit: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Entry is not balanced. Debit: 100.00, Credit: 50.00"
        );
    }
}
