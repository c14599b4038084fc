//! Closing engine errors.

use closebook_shared::types::{FiscalYearId, PeriodId};
use thiserror::Error;

use super::report::ValidationReport;
use crate::collaborators::CollaboratorError;
use crate::fiscal::{FiscalError, PeriodState, TransitionError};
use crate::store::StoreError;

/// Errors raised by period and fiscal-year transitions.
#[derive(Debug, Error)]
pub enum ClosingError {
    /// Closing validation found issues; nothing was changed.
    #[error("Period {} cannot be closed: {} validation issue(s)", .0.period_id, .0.issues.len())]
    ValidationFailure(ValidationReport),

    /// The transition is not part of the lifecycle.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: PeriodState,
        /// Requested state.
        to: PeriodState,
    },

    /// `ClosedFinal` is terminal.
    #[error("Cannot reopen a finally closed period")]
    CannotReopenFinalized,

    /// Reopen requires a non-blank reason.
    #[error("A reason is required to reopen")]
    ReasonRequired,

    /// Another transition committed first.
    #[error("State changed concurrently, please retry")]
    ConcurrentStateChange,

    /// Period not found.
    #[error("Accounting period not found: {0}")]
    PeriodNotFound(PeriodId),

    /// Fiscal year not found.
    #[error("Fiscal year not found: {0}")]
    FiscalYearNotFound(FiscalYearId),

    /// An earlier period of the same year is still open.
    #[error("Cannot close period: earlier period {0} is still open")]
    EarlierPeriodsOpen(PeriodId),

    /// A later period of the same year is closed.
    #[error("Cannot reopen period: later period {0} is closed")]
    LaterPeriodsClosed(PeriodId),

    /// The year still has open periods.
    #[error("Cannot close fiscal year: {0} period(s) still open")]
    PeriodsStillOpen(usize),

    /// The period's fiscal year is not open.
    #[error("Fiscal year {year_id} is {state}")]
    FiscalYearNotOpen {
        /// The year.
        year_id: FiscalYearId,
        /// Its state.
        state: PeriodState,
    },

    /// Fiscal calendar error.
    #[error(transparent)]
    Fiscal(#[from] FiscalError),

    /// A collaborator failed during validation.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Storage failure; the transaction was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ClosingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationFailure(_) => "CLOSING_VALIDATION_FAILED",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::CannotReopenFinalized => "CANNOT_REOPEN_FINALIZED",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::ConcurrentStateChange => "CONCURRENT_STATE_CHANGE",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::FiscalYearNotFound(_) => "FISCAL_YEAR_NOT_FOUND",
            Self::EarlierPeriodsOpen(_) => "EARLIER_PERIODS_OPEN",
            Self::LaterPeriodsClosed(_) => "LATER_PERIODS_CLOSED",
            Self::PeriodsStillOpen(_) => "PERIODS_STILL_OPEN",
            Self::FiscalYearNotOpen { .. } => "FISCAL_YEAR_NOT_OPEN",
            Self::Fiscal(err) => err.error_code(),
            Self::Collaborator(_) => "COLLABORATOR_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentStateChange)
    }

    /// The validation report, for `ValidationFailure`.
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::ValidationFailure(report) => Some(report),
            _ => None,
        }
    }
}

impl From<TransitionError> for ClosingError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { from, to } => {
                Self::InvalidStateTransition { from, to }
            }
            TransitionError::ReasonRequired => Self::ReasonRequired,
            TransitionError::CannotReopenFinalized => Self::CannotReopenFinalized,
        }
    }
}

impl From<StoreError> for ClosingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::ConcurrentStateChange,
            StoreError::NotFound(msg) | StoreError::Backend(msg) => Self::Persistence(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ClosingError::ReasonRequired.error_code(), "REASON_REQUIRED");
        assert_eq!(
            ClosingError::CannotReopenFinalized.error_code(),
            "CANNOT_REOPEN_FINALIZED"
        );
        assert_eq!(
            ClosingError::InvalidStateTransition {
                from: PeriodState::Closed,
                to: PeriodState::Closed,
            }
            .error_code(),
            "INVALID_STATE_TRANSITION"
        );
    }

    #[test]
    fn test_only_concurrent_state_change_is_retryable() {
        assert!(ClosingError::ConcurrentStateChange.is_retryable());
        assert!(!ClosingError::ReasonRequired.is_retryable());
        assert!(!ClosingError::Persistence("x".to_string()).is_retryable());
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ClosingError::from(StoreError::Conflict("v".to_string())),
            ClosingError::ConcurrentStateChange
        ));
        assert!(matches!(
            ClosingError::from(StoreError::Backend("io".to_string())),
            ClosingError::Persistence(_)
        ));
    }

    #[test]
    fn test_transition_error_mapping() {
        assert!(matches!(
            ClosingError::from(TransitionError::ReasonRequired),
            ClosingError::ReasonRequired
        ));
        assert!(matches!(
            ClosingError::from(TransitionError::CannotReopenFinalized),
            ClosingError::CannotReopenFinalized
        ));
    }
}
