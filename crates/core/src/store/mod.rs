//! Storage seams.
//!
//! Every method that writes more than one row must do so atomically: either
//! the whole change is visible afterwards or none of it is. Guards expressed
//! as "expected" values are compare-and-set checks evaluated inside that
//! same transaction; a mismatch is reported as [`StoreError::Conflict`].

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use closebook_shared::DateRange;
use closebook_shared::types::{AccountId, CompanyId, FiscalYearId, LedgerEntryId, PeriodId};

use crate::audit::{BalanceSnapshot, ClosureRecord};
use crate::fiscal::{AccountingPeriod, FiscalYear, PeriodState};
use crate::ledger::{Account, AccountPosting, LedgerEntry, NewLedgerEntry};

pub use error::StoreError;
pub use memory::MemoryStore;

/// A period a ledger write lands in, with the version read before validating.
///
/// The store re-checks that the period is still `Open` at this version and
/// bumps the version in the same transaction as the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodLock {
    /// Period touched.
    pub period_id: PeriodId,
    /// Version observed.
    pub version: i64,
}

impl From<&AccountingPeriod> for PeriodLock {
    fn from(period: &AccountingPeriod) -> Self {
        Self {
            period_id: period.id,
            version: period.version,
        }
    }
}

/// Ledger entries, postings and the chart of accounts.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Looks up an account.
    async fn account(
        &self,
        company: CompanyId,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError>;

    /// Inserts a draft entry, allocating the next sequence for its
    /// company and prefix.
    async fn insert_entry(
        &self,
        entry: NewLedgerEntry,
        lock: PeriodLock,
    ) -> Result<LedgerEntry, StoreError>;

    /// Looks up an entry with its postings.
    async fn entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// Replaces an entry (header and postings) if its stored version is
    /// still `expected_version`. The stored version becomes
    /// `expected_version + 1`.
    async fn update_entry(
        &self,
        entry: LedgerEntry,
        expected_version: i64,
        locks: &[PeriodLock],
    ) -> Result<LedgerEntry, StoreError>;

    /// Entries of every state dated in `range`, in date then sequence order.
    async fn entries_in_range(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Confirmed postings on `account` dated on or before `through`
    /// (and on or after `from` when given), in date then sequence order.
    async fn confirmed_postings(
        &self,
        company: CompanyId,
        account: AccountId,
        from: Option<NaiveDate>,
        through: NaiveDate,
    ) -> Result<Vec<AccountPosting>, StoreError>;
}

/// Fiscal years and accounting periods.
#[async_trait]
pub trait PeriodStore: Send + Sync {
    /// Inserts a year and its periods. Fails with `Conflict` if the year
    /// overlaps an existing one of the same company.
    async fn insert_fiscal_year(
        &self,
        year: FiscalYear,
        periods: Vec<AccountingPeriod>,
    ) -> Result<(), StoreError>;

    /// Looks up a fiscal year.
    async fn fiscal_year(&self, id: FiscalYearId) -> Result<Option<FiscalYear>, StoreError>;

    /// Fiscal years of a company, ordered by start date.
    async fn fiscal_years(&self, company: CompanyId) -> Result<Vec<FiscalYear>, StoreError>;

    /// Looks up a period.
    async fn period(&self, id: PeriodId) -> Result<Option<AccountingPeriod>, StoreError>;

    /// The period covering `date`, if any.
    async fn period_for_date(
        &self,
        company: CompanyId,
        date: NaiveDate,
    ) -> Result<Option<AccountingPeriod>, StoreError>;

    /// Periods of a year ordered by number.
    async fn periods_for_year(
        &self,
        year: FiscalYearId,
    ) -> Result<Vec<AccountingPeriod>, StoreError>;
}

/// How `hidden_by_period` flags change with a period transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Tag documents and commissions dated in the period.
    Hide,
    /// Clear tags pointing at the period.
    Show,
    /// Leave tags alone.
    Unchanged,
}

/// A period state change and everything written with it.
#[derive(Debug, Clone)]
pub struct PeriodTransition {
    /// State read before validating.
    pub expected_state: PeriodState,
    /// Version read before validating.
    pub expected_version: i64,
    /// New period row; the store sets its version to `expected_version + 1`.
    pub period: AccountingPeriod,
    /// Snapshots to append.
    pub snapshots: Vec<BalanceSnapshot>,
    /// Closure record to append.
    pub record: ClosureRecord,
    /// Visibility flag change.
    pub visibility: Visibility,
}

/// Outcome of a committed period transition.
#[derive(Debug, Clone)]
pub struct CommittedTransition {
    /// The period as stored.
    pub period: AccountingPeriod,
    /// Documents and commissions whose `hidden_by_period` changed.
    pub documents_affected: u64,
}

/// A period row changed alongside its fiscal year.
#[derive(Debug, Clone)]
pub struct PeriodUpdate {
    /// State read before validating.
    pub expected_state: PeriodState,
    /// Version read before validating.
    pub expected_version: i64,
    /// New period row.
    pub period: AccountingPeriod,
}

/// A fiscal-year state change and everything written with it.
#[derive(Debug, Clone)]
pub struct YearTransition {
    /// State read before validating.
    pub expected_state: PeriodState,
    /// Version read before validating.
    pub expected_version: i64,
    /// New year row; the store sets its version to `expected_version + 1`.
    pub year: FiscalYear,
    /// Periods changed with the year.
    pub periods: Vec<PeriodUpdate>,
    /// Closure record to append.
    pub record: ClosureRecord,
}

/// Period transitions, visibility flags and the audit log.
#[async_trait]
pub trait ClosingStore: Send + Sync {
    /// Commits a period transition atomically.
    async fn commit_period_transition(
        &self,
        transition: PeriodTransition,
    ) -> Result<CommittedTransition, StoreError>;

    /// Re-applies the visibility implied by the stored period's state, if
    /// the period is still in `expected_state` at `expected_version`.
    /// Returns the number of rows whose flag changed.
    async fn sync_document_visibility(
        &self,
        period_id: PeriodId,
        expected_state: PeriodState,
        expected_version: i64,
    ) -> Result<u64, StoreError>;

    /// Commits a fiscal-year transition atomically.
    async fn commit_year_transition(
        &self,
        transition: YearTransition,
    ) -> Result<FiscalYear, StoreError>;

    /// Closure records of a company (optionally only for one period),
    /// oldest first.
    async fn closure_history(
        &self,
        company: CompanyId,
        period: Option<PeriodId>,
    ) -> Result<Vec<ClosureRecord>, StoreError>;

    /// Snapshots captured by closes of `period`, oldest first.
    async fn snapshots_for_period(
        &self,
        period: PeriodId,
    ) -> Result<Vec<BalanceSnapshot>, StoreError>;
}
