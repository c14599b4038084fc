//! Period and fiscal-year state transitions.
//!
//! Pure functions: they validate a transition and produce the updated
//! value, leaving persistence and compare-and-set to the caller.

use chrono::{DateTime, Utc};
use closebook_shared::types::ActorId;
use thiserror::Error;

use super::period::{AccountingPeriod, FiscalYear, PeriodState, PeriodTotals};

/// Errors raised by an illegal transition request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The transition is not part of the lifecycle.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: PeriodState,
        /// Requested state.
        to: PeriodState,
    },

    /// Reopen requires a non-blank reason.
    #[error("A reason is required to reopen")]
    ReasonRequired,

    /// `ClosedFinal` is terminal.
    #[error("Cannot reopen a finally closed period")]
    CannotReopenFinalized,
}

/// Result of a reopen request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReopenOutcome {
    /// `Closed -> Open`.
    Reopen,
    /// The target is already open; nothing to transition.
    AlreadyOpen,
}

/// Stateless lifecycle rules.
pub struct PeriodStateMachine;

impl PeriodStateMachine {
    /// Returns true if `from -> to` is a lifecycle edge.
    #[must_use]
    pub fn is_valid_transition(from: PeriodState, to: PeriodState) -> bool {
        matches!(
            (from, to),
            (PeriodState::Open, PeriodState::Closed)
                | (PeriodState::Closed, PeriodState::Open | PeriodState::ClosedFinal)
        )
    }

    /// Validates a close request.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the target is `Open`.
    pub fn close(current: PeriodState) -> Result<PeriodState, TransitionError> {
        Self::transition(current, PeriodState::Closed)
    }

    /// Validates a finalize request.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the target is `Closed`.
    pub fn finalize(current: PeriodState) -> Result<PeriodState, TransitionError> {
        Self::transition(current, PeriodState::ClosedFinal)
    }

    /// Validates a reopen request. The reason is checked first.
    ///
    /// # Errors
    ///
    /// `ReasonRequired` for a blank reason, `CannotReopenFinalized` from
    /// `ClosedFinal`.
    pub fn reopen(current: PeriodState, reason: &str) -> Result<ReopenOutcome, TransitionError> {
        if reason.trim().is_empty() {
            return Err(TransitionError::ReasonRequired);
        }

        match current {
            PeriodState::Closed => Ok(ReopenOutcome::Reopen),
            PeriodState::Open => Ok(ReopenOutcome::AlreadyOpen),
            PeriodState::ClosedFinal => Err(TransitionError::CannotReopenFinalized),
        }
    }

    fn transition(from: PeriodState, to: PeriodState) -> Result<PeriodState, TransitionError> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }
}

impl AccountingPeriod {
    /// Copy of the period after a successful close.
    #[must_use]
    pub fn closed(&self, actor: ActorId, at: DateTime<Utc>, totals: PeriodTotals) -> Self {
        let mut period = self.clone();
        period.state = PeriodState::Closed;
        period.allows_entries = false;
        period.totals = Some(totals);
        period.stamp.closed_at = Some(at);
        period.stamp.closed_by = Some(actor);
        period
    }

    /// Copy of the period after a reopen. Close totals are dropped.
    #[must_use]
    pub fn reopened(&self, actor: ActorId, at: DateTime<Utc>, reason: &str) -> Self {
        let mut period = self.clone();
        period.state = PeriodState::Open;
        period.allows_entries = true;
        period.totals = None;
        period.stamp.reopened_at = Some(at);
        period.stamp.reopened_by = Some(actor);
        period.stamp.reopen_reason = Some(reason.trim().to_string());
        period
    }

    /// Copy of the period moved to `ClosedFinal`.
    #[must_use]
    pub fn finalized(&self) -> Self {
        let mut period = self.clone();
        period.state = PeriodState::ClosedFinal;
        period.allows_entries = false;
        period
    }
}

impl FiscalYear {
    /// Copy of the year after a successful close.
    #[must_use]
    pub fn closed(&self, actor: ActorId, at: DateTime<Utc>, totals: PeriodTotals) -> Self {
        let mut year = self.clone();
        year.state = PeriodState::Closed;
        year.totals = Some(totals);
        year.stamp.closed_at = Some(at);
        year.stamp.closed_by = Some(actor);
        year
    }

    /// Copy of the year after a reopen.
    #[must_use]
    pub fn reopened(&self, actor: ActorId, at: DateTime<Utc>, reason: &str) -> Self {
        let mut year = self.clone();
        year.state = PeriodState::Open;
        year.totals = None;
        year.stamp.reopened_at = Some(at);
        year.stamp.reopened_by = Some(actor);
        year.stamp.reopen_reason = Some(reason.trim().to_string());
        year
    }

    /// Copy of the year moved to `ClosedFinal`.
    #[must_use]
    pub fn finalized(&self) -> Self {
        let mut year = self.clone();
        year.state = PeriodState::ClosedFinal;
        year
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::calendar::generate_monthly_periods;
    use chrono::NaiveDate;
    use closebook_shared::types::{CompanyId, FiscalYearId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(PeriodState::Open, PeriodState::Closed, true)]
    #[case(PeriodState::Closed, PeriodState::Open, true)]
    #[case(PeriodState::Closed, PeriodState::ClosedFinal, true)]
    #[case(PeriodState::Open, PeriodState::ClosedFinal, false)]
    #[case(PeriodState::ClosedFinal, PeriodState::Open, false)]
    #[case(PeriodState::ClosedFinal, PeriodState::Closed, false)]
    #[case(PeriodState::Open, PeriodState::Open, false)]
    fn test_is_valid_transition(
        #[case] from: PeriodState,
        #[case] to: PeriodState,
        #[case] expected: bool,
    ) {
        assert_eq!(PeriodStateMachine::is_valid_transition(from, to), expected);
    }

    #[test]
    fn test_close_requires_open() {
        assert_eq!(PeriodStateMachine::close(PeriodState::Open), Ok(PeriodState::Closed));
        assert_eq!(
            PeriodStateMachine::close(PeriodState::Closed),
            Err(TransitionError::InvalidTransition {
                from: PeriodState::Closed,
                to: PeriodState::Closed,
            })
        );
    }

    #[test]
    fn test_finalize_requires_closed() {
        assert!(PeriodStateMachine::finalize(PeriodState::Closed).is_ok());
        assert!(PeriodStateMachine::finalize(PeriodState::Open).is_err());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn test_reopen_blank_reason(#[case] reason: &str) {
        // The reason is checked before the state.
        assert_eq!(
            PeriodStateMachine::reopen(PeriodState::ClosedFinal, reason),
            Err(TransitionError::ReasonRequired)
        );
    }

    #[test]
    fn test_reopen_outcomes() {
        assert_eq!(
            PeriodStateMachine::reopen(PeriodState::Closed, "late invoice"),
            Ok(ReopenOutcome::Reopen)
        );
        assert_eq!(
            PeriodStateMachine::reopen(PeriodState::Open, "late invoice"),
            Ok(ReopenOutcome::AlreadyOpen)
        );
        assert_eq!(
            PeriodStateMachine::reopen(PeriodState::ClosedFinal, "late invoice"),
            Err(TransitionError::CannotReopenFinalized)
        );
    }

    #[test]
    fn test_close_then_reopen_stamps() {
        let period = generate_monthly_periods(
            FiscalYearId::new(),
            CompanyId::new(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .remove(0);
        let actor = ActorId::new();
        let now = Utc::now();
        let totals = PeriodTotals {
            total_debits: dec!(118.00),
            total_credits: dec!(118.00),
            entry_count: 1,
        };

        let closed = period.closed(actor, now, totals);
        assert_eq!(closed.state, PeriodState::Closed);
        assert!(!closed.allows_entries);
        assert_eq!(closed.totals, Some(totals));
        assert_eq!(closed.stamp.closed_by, Some(actor));

        let reopened = closed.reopened(actor, now, "  missing invoice ");
        assert_eq!(reopened.state, PeriodState::Open);
        assert!(reopened.allows_entries);
        assert_eq!(reopened.totals, None);
        assert_eq!(reopened.stamp.reopen_reason.as_deref(), Some("missing invoice"));
        assert_eq!(reopened.stamp.closed_by, Some(actor));
    }
}
