//! Fiscal year and accounting period types.

use chrono::{DateTime, NaiveDate, Utc};
use closebook_shared::DateRange;
use closebook_shared::types::{ActorId, CompanyId, FiscalYearId, PeriodId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state shared by fiscal years and accounting periods.
///
/// `Open -> Closed -> ClosedFinal`; `Closed -> Open` is the audited
/// exception path. `ClosedFinal` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodState {
    /// Accepts ledger entries.
    Open,
    /// Closed, may still be reopened with a reason.
    Closed,
    /// Permanently closed.
    ClosedFinal,
}

impl PeriodState {
    /// Returns true if entries may be written into this state.
    #[must_use]
    pub fn allows_entries(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true for `Closed` and `ClosedFinal`.
    #[must_use]
    pub fn is_closed(self) -> bool {
        !self.allows_entries()
    }

    /// Returns the string representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::ClosedFinal => "closed_final",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "closed_final" => Some(Self::ClosedFinal),
            _ => None,
        }
    }
}

impl std::fmt::Display for PeriodState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmed-entry totals captured at close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodTotals {
    /// Sum of confirmed debits.
    pub total_debits: Decimal,
    /// Sum of confirmed credits.
    pub total_credits: Decimal,
    /// Number of confirmed entries.
    pub entry_count: u64,
}

impl PeriodTotals {
    /// Returns true if debits equal credits exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debits == self.total_credits
    }

    /// Adds another set of totals.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            total_debits: self.total_debits + other.total_debits,
            total_credits: self.total_credits + other.total_credits,
            entry_count: self.entry_count + other.entry_count,
        }
    }
}

/// Close and reopen bookkeeping shared by years and periods.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecycleStamp {
    /// When the target was last closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Who last closed it.
    pub closed_by: Option<ActorId>,
    /// When it was last reopened.
    pub reopened_at: Option<DateTime<Utc>>,
    /// Who last reopened it.
    pub reopened_by: Option<ActorId>,
    /// Why it was last reopened.
    pub reopen_reason: Option<String>,
}

/// Fiscal year definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    /// Unique identifier.
    pub id: FiscalYearId,
    /// Company this fiscal year belongs to.
    pub company_id: CompanyId,
    /// Calendar year label (e.g. 2025).
    pub year: i32,
    /// Display name (e.g. "FY2025").
    pub name: String,
    /// First day of the year.
    pub start_date: NaiveDate,
    /// Last day of the year.
    pub end_date: NaiveDate,
    /// Lifecycle state.
    pub state: PeriodState,
    /// Aggregated period totals recorded when the year closed.
    pub totals: Option<PeriodTotals>,
    /// Close/reopen metadata.
    pub stamp: LifecycleStamp,
    /// Compare-and-set token.
    pub version: i64,
}

impl FiscalYear {
    /// Date range covered by the year.
    #[must_use]
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// A period within a fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    /// Unique identifier.
    pub id: PeriodId,
    /// Fiscal year this period belongs to.
    pub fiscal_year_id: FiscalYearId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Period number within the year (1-12 for monthly).
    pub number: u32,
    /// Period name (e.g. "January 2025").
    pub name: String,
    /// Start date of the period.
    pub start_date: NaiveDate,
    /// End date of the period.
    pub end_date: NaiveDate,
    /// Lifecycle state.
    pub state: PeriodState,
    /// True only while `state` is `Open`.
    pub allows_entries: bool,
    /// Totals captured at the last close; cleared on reopen.
    pub totals: Option<PeriodTotals>,
    /// Close/reopen metadata.
    pub stamp: LifecycleStamp,
    /// Compare-and-set token; bumped by every state change and every
    /// ledger write dated inside the period.
    pub version: i64,
}

impl AccountingPeriod {
    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Date range covered by the period.
    #[must_use]
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_open_allows_entries() {
        assert!(PeriodState::Open.allows_entries());
        assert!(!PeriodState::Closed.allows_entries());
        assert!(!PeriodState::ClosedFinal.allows_entries());
        assert!(PeriodState::ClosedFinal.is_closed());
    }

    #[test]
    fn test_state_string_round_trip() {
        for state in [PeriodState::Open, PeriodState::Closed, PeriodState::ClosedFinal] {
            assert_eq!(PeriodState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PeriodState::parse("locked"), None);
    }

    #[test]
    fn test_totals_combine() {
        let a = PeriodTotals {
            total_debits: dec!(100.00),
            total_credits: dec!(100.00),
            entry_count: 2,
        };
        let b = PeriodTotals {
            total_debits: dec!(18.00),
            total_credits: dec!(18.00),
            entry_count: 1,
        };
        let sum = a.combine(b);
        assert_eq!(sum.total_debits, dec!(118.00));
        assert_eq!(sum.entry_count, 3);
        assert!(sum.is_balanced());
    }
}
