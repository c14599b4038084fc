//! Audit record types. Both are immutable once written.

use chrono::{DateTime, Utc};
use closebook_shared::types::{
    ActorId, BankAccountId, ClosureRecordId, CompanyId, PeriodId, SnapshotId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fiscal::{PeriodState, PeriodTotals};

/// What a closure record is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureScope {
    /// An accounting period.
    Period,
    /// A whole fiscal year.
    FiscalYear,
}

impl ClosureScope {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Period => "period",
            Self::FiscalYear => "fiscal_year",
        }
    }

    /// Parses a scope from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "period" => Some(Self::Period),
            "fiscal_year" => Some(Self::FiscalYear),
            _ => None,
        }
    }
}

/// The lifecycle action recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureAction {
    /// `Open -> Closed`.
    Close,
    /// `Closed -> Open`.
    Reopen,
    /// `Closed -> ClosedFinal`.
    Finalize,
}

impl ClosureAction {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Reopen => "reopen",
            Self::Finalize => "finalize",
        }
    }

    /// Parses an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "close" => Some(Self::Close),
            "reopen" => Some(Self::Reopen),
            "finalize" => Some(Self::Finalize),
            _ => None,
        }
    }
}

/// One close/reopen/finalize event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureRecord {
    /// Unique identifier.
    pub id: ClosureRecordId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Period or fiscal year.
    pub scope: ClosureScope,
    /// Id of the period or fiscal year.
    pub target_id: Uuid,
    /// Action performed.
    pub action: ClosureAction,
    /// Who performed it.
    pub actor: ActorId,
    /// When.
    pub at: DateTime<Utc>,
    /// Mandatory for reopen.
    pub reason: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// State before the action.
    pub prior_state: PeriodState,
    /// State after the action.
    pub new_state: PeriodState,
    /// Totals at the time of the action.
    pub totals: Option<PeriodTotals>,
}

impl ClosureRecord {
    /// Returns true if the record targets `period`.
    #[must_use]
    pub fn is_for_period(&self, period: PeriodId) -> bool {
        self.scope == ClosureScope::Period && self.target_id == period.into_inner()
    }
}

/// Ledger-derived vs recorded balance of one bank/cash account at a close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Unique identifier.
    pub id: SnapshotId,
    /// Period closed.
    pub period_id: PeriodId,
    /// Close event that captured it.
    pub closure_record_id: ClosureRecordId,
    /// Bank/cash account.
    pub bank_account_id: BankAccountId,
    /// Balance derived from the ledger.
    pub computed_balance: Decimal,
    /// Balance recorded by treasury.
    pub recorded_balance: Decimal,
    /// `recorded - computed`.
    pub difference: Decimal,
    /// Capture timestamp.
    pub captured_at: DateTime<Utc>,
}
