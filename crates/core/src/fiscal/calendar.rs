//! Monthly period generation for new fiscal years.

use chrono::{Datelike, NaiveDate};
use closebook_shared::DateRange;
use closebook_shared::types::{CompanyId, FiscalYearId, PeriodId};

use super::period::{AccountingPeriod, FiscalYear, LifecycleStamp, PeriodState};

/// Builds a new open fiscal year over `range` with its monthly periods.
#[must_use]
pub fn plan_fiscal_year(
    company_id: CompanyId,
    year: i32,
    range: DateRange,
) -> (FiscalYear, Vec<AccountingPeriod>) {
    let fiscal_year = FiscalYear {
        id: FiscalYearId::new(),
        company_id,
        year,
        name: format!("FY{year}"),
        start_date: range.start,
        end_date: range.end,
        state: PeriodState::Open,
        totals: None,
        stamp: LifecycleStamp::default(),
        version: 1,
    };
    let periods = generate_monthly_periods(fiscal_year.id, company_id, range.start, range.end);
    (fiscal_year, periods)
}

/// Splits `start..=end` into contiguous calendar-month periods, all `Open`.
///
/// The first and last periods are truncated when the year does not start on
/// the first or end on the last day of a month.
#[must_use]
pub fn generate_monthly_periods(
    fiscal_year_id: FiscalYearId,
    company_id: CompanyId,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<AccountingPeriod> {
    let mut periods = Vec::new();
    let mut current = Some(start_date);
    let mut number: u32 = 1;

    while let Some(period_start) = current.filter(|d| *d <= end_date) {
        let month_end = last_day_of_month(period_start.year(), period_start.month());
        let period_end = month_end.min(end_date);

        periods.push(AccountingPeriod {
            id: PeriodId::new(),
            fiscal_year_id,
            company_id,
            number,
            name: format!(
                "{} {}",
                month_name(period_start.month()),
                period_start.year()
            ),
            start_date: period_start,
            end_date: period_end,
            state: PeriodState::Open,
            allows_entries: true,
            totals: None,
            stamp: LifecycleStamp::default(),
            version: 1,
        });

        current = period_end.succ_opt();
        number += 1;
    }

    periods
}

/// Returns the last day of a month.
fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Returns month name.
fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_year_has_twelve_contiguous_periods() {
        let periods = generate_monthly_periods(
            FiscalYearId::new(),
            CompanyId::new(),
            date(2024, 1, 1),
            date(2024, 12, 31),
        );

        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0].name, "January 2024");
        assert_eq!(periods[1].end_date, date(2024, 2, 29));
        assert_eq!(periods[11].number, 12);
        assert_eq!(periods[11].end_date, date(2024, 12, 31));
        for pair in periods.windows(2) {
            assert!(pair[0].range().is_followed_by(&pair[1].range()));
        }
        assert!(periods.iter().all(|p| p.state == PeriodState::Open && p.allows_entries));
    }

    #[test]
    fn test_offset_year_truncates_edges() {
        let periods = generate_monthly_periods(
            FiscalYearId::new(),
            CompanyId::new(),
            date(2024, 7, 15),
            date(2025, 7, 14),
        );

        assert_eq!(periods.len(), 13);
        assert_eq!(periods[0].start_date, date(2024, 7, 15));
        assert_eq!(periods[0].end_date, date(2024, 7, 31));
        assert_eq!(periods[12].start_date, date(2025, 7, 1));
        assert_eq!(periods[12].end_date, date(2025, 7, 14));
    }

    #[test]
    fn test_plan_fiscal_year_links_periods() {
        let company = CompanyId::new();
        let range = DateRange::new(date(2025, 1, 1), date(2025, 12, 31)).unwrap();
        let (year, periods) = plan_fiscal_year(company, 2025, range);

        assert_eq!(year.name, "FY2025");
        assert_eq!(year.state, PeriodState::Open);
        assert_eq!(periods.len(), 12);
        assert!(periods.iter().all(|p| p.fiscal_year_id == year.id && p.company_id == company));
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2), date(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 12), date(2024, 12, 31));
    }
}
