//! Fiscal calendar errors.

use chrono::NaiveDate;
use closebook_shared::DateRangeError;
use closebook_shared::types::{FiscalYearId, PeriodId};
use thiserror::Error;

use super::period::PeriodState;
use crate::store::StoreError;

/// Errors raised while defining fiscal years or guarding dated writes.
#[derive(Debug, Error)]
pub enum FiscalError {
    /// Year ends before it starts.
    #[error(transparent)]
    InvalidDateRange(#[from] DateRangeError),

    /// Year overlaps an existing fiscal year of the company.
    #[error("Fiscal year overlaps existing fiscal year {0}")]
    OverlappingYear(FiscalYearId),

    /// No period covers the date.
    #[error("No accounting period found for date {0}")]
    NoPeriod(NaiveDate),

    /// The covering period is not open.
    #[error("Accounting period {period_id} is {state}, no changes allowed on {date}")]
    PeriodClosed {
        /// Date rejected.
        date: NaiveDate,
        /// Covering period.
        period_id: PeriodId,
        /// Its state.
        state: PeriodState,
    },

    /// Storage failure.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            Self::OverlappingYear(_) => "OVERLAPPING_FISCAL_YEAR",
            Self::NoPeriod(_) => "NO_PERIOD",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<StoreError> for FiscalError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}
