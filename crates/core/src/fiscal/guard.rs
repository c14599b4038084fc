//! Date guards for collaborators writing dated records.
//!
//! Invoicing and commissions call these before creating or editing a
//! document so nothing lands in, or moves out of, a closed period.

use std::sync::Arc;

use chrono::NaiveDate;
use closebook_shared::types::CompanyId;

use super::error::FiscalError;
use super::period::AccountingPeriod;
use crate::store::PeriodStore;

/// Checks dates against the period calendar.
#[derive(Clone)]
pub struct PeriodGuard {
    periods: Arc<dyn PeriodStore>,
}

impl PeriodGuard {
    /// Creates a guard over a period store.
    #[must_use]
    pub fn new(periods: Arc<dyn PeriodStore>) -> Self {
        Self { periods }
    }

    /// Returns the open period covering `date`.
    ///
    /// # Errors
    ///
    /// `NoPeriod` if no period covers the date, `PeriodClosed` if the
    /// covering period is closed.
    pub async fn ensure_date_open(
        &self,
        company: CompanyId,
        date: NaiveDate,
    ) -> Result<AccountingPeriod, FiscalError> {
        let period = self
            .periods
            .period_for_date(company, date)
            .await?
            .ok_or(FiscalError::NoPeriod(date))?;

        if !period.allows_entries {
            return Err(FiscalError::PeriodClosed {
                date,
                period_id: period.id,
                state: period.state,
            });
        }

        Ok(period)
    }

    /// Checks that a record may move from `from` to `to`: both the period it
    /// leaves and the period it enters must be open.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_date_open`].
    pub async fn ensure_date_change_allowed(
        &self,
        company: CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(), FiscalError> {
        let source = self.ensure_date_open(company, from).await?;
        if !source.contains_date(to) {
            self.ensure_date_open(company, to).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::{PeriodState, plan_fiscal_year};
    use crate::store::MemoryStore;
    use closebook_shared::DateRange;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    /// A 2025 calendar year whose January is closed.
    async fn guard_with_closed_january() -> (PeriodGuard, CompanyId) {
        let company = CompanyId::new();
        let range = DateRange::new(date(1, 1), date(12, 31)).unwrap();
        let (year, mut periods) = plan_fiscal_year(company, 2025, range);
        periods[0].state = PeriodState::Closed;
        periods[0].allows_entries = false;

        let store = Arc::new(MemoryStore::new());
        store.insert_fiscal_year(year, periods).await.unwrap();
        (PeriodGuard::new(store), company)
    }

    #[tokio::test]
    async fn test_open_date_returns_covering_period() {
        let (guard, company) = guard_with_closed_january().await;
        let period = guard.ensure_date_open(company, date(3, 15)).await.unwrap();
        assert_eq!(period.number, 3);
    }

    #[tokio::test]
    async fn test_closed_and_uncovered_dates_rejected() {
        let (guard, company) = guard_with_closed_january().await;

        let err = guard.ensure_date_open(company, date(1, 31)).await.unwrap_err();
        assert!(matches!(err, FiscalError::PeriodClosed { state: PeriodState::Closed, .. }));

        let outside = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let err = guard.ensure_date_open(company, outside).await.unwrap_err();
        assert!(matches!(err, FiscalError::NoPeriod(d) if d == outside));
    }

    #[tokio::test]
    async fn test_date_change_checks_both_periods() {
        let (guard, company) = guard_with_closed_january().await;

        assert!(guard.ensure_date_change_allowed(company, date(2, 1), date(2, 28)).await.is_ok());
        assert!(guard.ensure_date_change_allowed(company, date(2, 1), date(4, 2)).await.is_ok());
        assert!(guard.ensure_date_change_allowed(company, date(2, 1), date(1, 31)).await.is_err());
        assert!(guard.ensure_date_change_allowed(company, date(1, 31), date(2, 1)).await.is_err());
    }
}
