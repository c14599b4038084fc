//! Fiscal year and period management.

pub mod calendar;
pub mod error;
pub mod guard;
pub mod period;
pub mod state_machine;

pub use calendar::{generate_monthly_periods, plan_fiscal_year};
pub use error::FiscalError;
pub use guard::PeriodGuard;
pub use period::{AccountingPeriod, FiscalYear, LifecycleStamp, PeriodState, PeriodTotals};
pub use state_machine::{PeriodStateMachine, ReopenOutcome, TransitionError};
