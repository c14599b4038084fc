//! The closing engine: period and fiscal-year lifecycle behind one facade.
//!
//! Every transition follows the same shape: read the target and its
//! version, check the lifecycle rules, (for closes) validate, then commit
//! everything in one compare-and-set transaction.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use closebook_shared::types::{ActorId, CompanyId, FiscalYearId, LedgerEntryId, PeriodId};
use closebook_shared::{ClosingConfig, DateRange};
use tracing::{error, info, warn};

use super::error::ClosingError;
use super::report::ValidationReport;
use super::validator::ClosingValidator;
use crate::audit::recorder::TransitionContext;
use crate::audit::{AuditRecorder, BalanceSnapshot, ClosureAction, ClosureRecord};
use crate::collaborators::{
    BankAccountProvider, CommissionProvider, SourceDocumentProvider, TreasuryMovementProvider,
};
use crate::documents::DocumentPostingRegistry;
use crate::fiscal::{
    AccountingPeriod, FiscalError, FiscalYear, PeriodGuard, PeriodState, PeriodStateMachine,
    PeriodTotals, ReopenOutcome, plan_fiscal_year,
};
use crate::ledger::{CreateEntryInput, EntryPatch, LedgerEntry, LedgerError, LedgerService};
use crate::store::{
    ClosingStore, LedgerStore, MemoryStore, PeriodStore, PeriodTransition, PeriodUpdate,
    StoreError, Visibility, YearTransition,
};
use crate::treasury::TreasuryReconciliationChecker;

/// The external subsystems the validator reads from.
#[derive(Clone)]
pub struct Collaborators {
    /// Invoicing.
    pub documents: Arc<dyn SourceDocumentProvider>,
    /// Partner commissions.
    pub commissions: Arc<dyn CommissionProvider>,
    /// Treasury accounts.
    pub banks: Arc<dyn BankAccountProvider>,
    /// Treasury movements.
    pub movements: Arc<dyn TreasuryMovementProvider>,
}

/// What a successful close produced.
#[derive(Debug, Clone)]
pub struct ClosedPeriodSummary {
    /// The period as stored after the close.
    pub period: AccountingPeriod,
    /// Confirmed totals captured.
    pub totals: PeriodTotals,
    /// One snapshot per active bank/cash account.
    pub snapshots: Vec<BalanceSnapshot>,
    /// The `Close` audit record.
    pub closure_record: ClosureRecord,
    /// Documents and commissions hidden by the close.
    pub documents_hidden: u64,
}

/// Facade over the ledger, the period state machine and the closing validator.
#[derive(Clone)]
pub struct ClosingEngine {
    periods: Arc<dyn PeriodStore>,
    closing: Arc<dyn ClosingStore>,
    ledger: LedgerService,
    validator: ClosingValidator,
    guard: PeriodGuard,
    config: ClosingConfig,
}

impl ClosingEngine {
    /// Wires the engine from its stores and collaborators.
    #[must_use]
    pub fn new(
        ledger_store: Arc<dyn LedgerStore>,
        periods: Arc<dyn PeriodStore>,
        closing: Arc<dyn ClosingStore>,
        collaborators: Collaborators,
        config: ClosingConfig,
    ) -> Self {
        let treasury = TreasuryReconciliationChecker::new(
            collaborators.banks,
            collaborators.movements,
            ledger_store.clone(),
            config.bank_tolerance,
        );
        let validator = ClosingValidator::new(
            DocumentPostingRegistry::new(collaborators.documents),
            collaborators.commissions,
            treasury,
            ledger_store.clone(),
        );
        Self {
            ledger: LedgerService::new(
                ledger_store,
                periods.clone(),
                config.default_entry_prefix.clone(),
            ),
            guard: PeriodGuard::new(periods.clone()),
            periods,
            closing,
            validator,
            config,
        }
    }

    /// Engine whose stores and collaborators are all `store`.
    #[must_use]
    pub fn in_memory(store: Arc<MemoryStore>, config: ClosingConfig) -> Self {
        let collaborators = Collaborators {
            documents: store.clone(),
            commissions: store.clone(),
            banks: store.clone(),
            movements: store.clone(),
        };
        Self::new(store.clone(), store.clone(), store, collaborators, config)
    }

    /// The ledger service used for entry writes.
    #[must_use]
    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    /// Date guard for collaborators writing dated records.
    #[must_use]
    pub fn period_guard(&self) -> &PeriodGuard {
        &self.guard
    }

    // ========== Periods ==========

    /// Closes an open period after a successful validation run.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless open, `EarlierPeriodsOpen` under
    /// sequential closing, `ValidationFailure` with the itemized report,
    /// `ConcurrentStateChange` if another transition or a ledger write
    /// committed after the period was read.
    pub async fn close_period(
        &self,
        period_id: PeriodId,
        actor: ActorId,
        reason: Option<String>,
        notes: Option<String>,
    ) -> Result<ClosedPeriodSummary, ClosingError> {
        let period = self.load_period(period_id).await?;
        let new_state = PeriodStateMachine::close(period.state)?;

        if self.config.sequential_close {
            let siblings = self.periods.periods_for_year(period.fiscal_year_id).await?;
            if let Some(open) = siblings
                .iter()
                .find(|p| p.number < period.number && p.state == PeriodState::Open)
            {
                return Err(ClosingError::EarlierPeriodsOpen(open.id));
            }
        }

        let report = self.validator.validate(&period).await?;
        if !report.is_success() {
            warn!(
                period_id = %period.id,
                actor = %actor,
                issues = report.issues.len(),
                "Period close rejected by validation"
            );
            return Err(ClosingError::ValidationFailure(report));
        }

        let ctx = TransitionContext {
            action: ClosureAction::Close,
            actor,
            at: Utc::now(),
            reason,
            notes,
            prior_state: period.state,
            new_state,
        };
        let closed = period.closed(actor, ctx.at, report.totals);
        let record = AuditRecorder::period_record(&closed, &ctx, Some(report.totals));
        let snapshots = AuditRecorder::snapshots(&closed, &record, &report.reconciliations);

        let committed = self
            .closing
            .commit_period_transition(PeriodTransition {
                expected_state: period.state,
                expected_version: period.version,
                period: closed,
                snapshots: snapshots.clone(),
                record: record.clone(),
                visibility: Visibility::Hide,
            })
            .await
            .map_err(|err| commit_error(err, period.id))?;

        info!(
            period_id = %period.id,
            actor = %actor,
            entries = report.totals.entry_count,
            total_debits = %report.totals.total_debits,
            snapshots = snapshots.len(),
            documents_hidden = committed.documents_affected,
            "Accounting period closed"
        );

        Ok(ClosedPeriodSummary {
            period: committed.period,
            totals: report.totals,
            snapshots,
            closure_record: record,
            documents_hidden: committed.documents_affected,
        })
    }

    /// Reopens a closed period. Reopening an open period only re-syncs
    /// document visibility and writes no audit record.
    ///
    /// # Errors
    ///
    /// `ReasonRequired`, `CannotReopenFinalized`, `FiscalYearNotOpen`,
    /// `LaterPeriodsClosed` under sequential closing, `ConcurrentStateChange`.
    pub async fn reopen_period(
        &self,
        period_id: PeriodId,
        actor: ActorId,
        reason: &str,
    ) -> Result<(), ClosingError> {
        if reason.trim().is_empty() {
            return Err(ClosingError::ReasonRequired);
        }
        let period = self.load_period(period_id).await?;

        if PeriodStateMachine::reopen(period.state, reason)? == ReopenOutcome::AlreadyOpen {
            let synced = self
                .closing
                .sync_document_visibility(period.id, period.state, period.version)
                .await
                .map_err(|e| commit_error(e, period.id))?;
            info!(period_id = %period.id, documents = synced, "Period already open, visibility re-synced");
            return Ok(());
        }

        let year = self.load_year(period.fiscal_year_id).await?;
        if year.state != PeriodState::Open {
            return Err(ClosingError::FiscalYearNotOpen {
                year_id: year.id,
                state: year.state,
            });
        }

        if self.config.sequential_close {
            let siblings = self.periods.periods_for_year(period.fiscal_year_id).await?;
            if let Some(later) = siblings
                .iter()
                .find(|p| p.number > period.number && p.state.is_closed())
            {
                return Err(ClosingError::LaterPeriodsClosed(later.id));
            }
        }

        let ctx = TransitionContext {
            action: ClosureAction::Reopen,
            actor,
            at: Utc::now(),
            reason: Some(reason.trim().to_string()),
            notes: None,
            prior_state: period.state,
            new_state: PeriodState::Open,
        };
        let reopened = period.reopened(actor, ctx.at, reason);
        let record = AuditRecorder::period_record(&reopened, &ctx, period.totals);

        let committed = self
            .closing
            .commit_period_transition(PeriodTransition {
                expected_state: period.state,
                expected_version: period.version,
                period: reopened,
                snapshots: vec![],
                record,
                visibility: Visibility::Show,
            })
            .await
            .map_err(|err| commit_error(err, period.id))?;

        info!(
            period_id = %period.id,
            actor = %actor,
            reason = reason.trim(),
            documents_shown = committed.documents_affected,
            "Accounting period reopened"
        );
        Ok(())
    }

    /// Moves a closed period to `ClosedFinal`.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless closed, `ConcurrentStateChange`.
    pub async fn finalize_period(
        &self,
        period_id: PeriodId,
        actor: ActorId,
        notes: Option<String>,
    ) -> Result<AccountingPeriod, ClosingError> {
        let period = self.load_period(period_id).await?;
        let new_state = PeriodStateMachine::finalize(period.state)?;

        let ctx = TransitionContext {
            action: ClosureAction::Finalize,
            actor,
            at: Utc::now(),
            reason: None,
            notes,
            prior_state: period.state,
            new_state,
        };
        let finalized = period.finalized();
        let record = AuditRecorder::period_record(&finalized, &ctx, period.totals);

        let committed = self
            .closing
            .commit_period_transition(PeriodTransition {
                expected_state: period.state,
                expected_version: period.version,
                period: finalized,
                snapshots: vec![],
                record,
                visibility: Visibility::Unchanged,
            })
            .await
            .map_err(|err| commit_error(err, period.id))?;

        info!(period_id = %period.id, actor = %actor, "Accounting period finalized");
        Ok(committed.period)
    }

    /// Runs closing validation without changing anything.
    ///
    /// # Errors
    ///
    /// `PeriodNotFound` and infrastructure failures.
    pub async fn validate_close(&self, period_id: PeriodId) -> Result<ValidationReport, ClosingError> {
        let period = self.load_period(period_id).await?;
        self.validator.validate(&period).await
    }

    /// Current state of a period.
    ///
    /// # Errors
    ///
    /// `PeriodNotFound`.
    pub async fn get_period_state(&self, period_id: PeriodId) -> Result<PeriodState, ClosingError> {
        Ok(self.load_period(period_id).await?.state)
    }

    /// Looks up a period.
    ///
    /// # Errors
    ///
    /// `PeriodNotFound`.
    pub async fn period(&self, period_id: PeriodId) -> Result<AccountingPeriod, ClosingError> {
        self.load_period(period_id).await
    }

    /// Closure records of a company, optionally for one period, oldest first.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn get_closure_history(
        &self,
        company: CompanyId,
        period: Option<PeriodId>,
    ) -> Result<Vec<ClosureRecord>, ClosingError> {
        Ok(self.closing.closure_history(company, period).await?)
    }

    /// Balance snapshots captured by closes of a period.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn period_snapshots(
        &self,
        period_id: PeriodId,
    ) -> Result<Vec<BalanceSnapshot>, ClosingError> {
        Ok(self.closing.snapshots_for_period(period_id).await?)
    }

    // ========== Fiscal years ==========

    /// Creates a fiscal year with contiguous monthly periods, all open.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange`, `OverlappingYear`.
    pub async fn create_fiscal_year(
        &self,
        company: CompanyId,
        year: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(FiscalYear, Vec<AccountingPeriod>), ClosingError> {
        let range = DateRange::new(start, end).map_err(FiscalError::from)?;

        let existing = self.periods.fiscal_years(company).await?;
        if let Some(overlap) = existing.iter().find(|y| y.range().overlaps(&range)) {
            return Err(FiscalError::OverlappingYear(overlap.id).into());
        }

        let (fiscal_year, periods) = plan_fiscal_year(company, year, range);
        self.periods
            .insert_fiscal_year(fiscal_year.clone(), periods.clone())
            .await?;

        info!(
            fiscal_year_id = %fiscal_year.id,
            company_id = %company,
            periods = periods.len(),
            "Fiscal year created"
        );
        Ok((fiscal_year, periods))
    }

    /// Closes a fiscal year once every period is closed.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless open, `PeriodsStillOpen`.
    pub async fn close_fiscal_year(
        &self,
        year_id: FiscalYearId,
        actor: ActorId,
        reason: Option<String>,
        notes: Option<String>,
    ) -> Result<FiscalYear, ClosingError> {
        let year = self.load_year(year_id).await?;
        let new_state = PeriodStateMachine::close(year.state)?;

        let periods = self.periods.periods_for_year(year.id).await?;
        let open = periods.iter().filter(|p| p.state == PeriodState::Open).count();
        if open > 0 {
            return Err(ClosingError::PeriodsStillOpen(open));
        }

        let totals = periods
            .iter()
            .filter_map(|p| p.totals)
            .fold(PeriodTotals::default(), PeriodTotals::combine);

        let ctx = TransitionContext {
            action: ClosureAction::Close,
            actor,
            at: Utc::now(),
            reason,
            notes,
            prior_state: year.state,
            new_state,
        };
        let closed = year.closed(actor, ctx.at, totals);
        let record = AuditRecorder::year_record(&closed, &ctx, Some(totals));

        let stored = self
            .commit_year(&year, closed, vec![], record)
            .await?;
        info!(fiscal_year_id = %year.id, actor = %actor, "Fiscal year closed");
        Ok(stored)
    }

    /// Reopens a closed fiscal year. Its periods stay closed.
    ///
    /// # Errors
    ///
    /// `ReasonRequired`, `CannotReopenFinalized`, `ConcurrentStateChange`.
    pub async fn reopen_fiscal_year(
        &self,
        year_id: FiscalYearId,
        actor: ActorId,
        reason: &str,
    ) -> Result<FiscalYear, ClosingError> {
        if reason.trim().is_empty() {
            return Err(ClosingError::ReasonRequired);
        }
        let year = self.load_year(year_id).await?;
        if PeriodStateMachine::reopen(year.state, reason)? == ReopenOutcome::AlreadyOpen {
            return Ok(year);
        }

        let ctx = TransitionContext {
            action: ClosureAction::Reopen,
            actor,
            at: Utc::now(),
            reason: Some(reason.trim().to_string()),
            notes: None,
            prior_state: year.state,
            new_state: PeriodState::Open,
        };
        let reopened = year.reopened(actor, ctx.at, reason);
        let record = AuditRecorder::year_record(&reopened, &ctx, year.totals);

        let stored = self.commit_year(&year, reopened, vec![], record).await?;
        info!(fiscal_year_id = %year.id, actor = %actor, reason = reason.trim(), "Fiscal year reopened");
        Ok(stored)
    }

    /// Moves a closed fiscal year and all its closed periods to `ClosedFinal`.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` unless closed, `ConcurrentStateChange`.
    pub async fn finalize_fiscal_year(
        &self,
        year_id: FiscalYearId,
        actor: ActorId,
        notes: Option<String>,
    ) -> Result<FiscalYear, ClosingError> {
        let year = self.load_year(year_id).await?;
        let new_state = PeriodStateMachine::finalize(year.state)?;

        let updates: Vec<PeriodUpdate> = self
            .periods
            .periods_for_year(year.id)
            .await?
            .into_iter()
            .filter(|p| p.state == PeriodState::Closed)
            .map(|p| PeriodUpdate {
                expected_state: p.state,
                expected_version: p.version,
                period: p.finalized(),
            })
            .collect();

        let ctx = TransitionContext {
            action: ClosureAction::Finalize,
            actor,
            at: Utc::now(),
            reason: None,
            notes,
            prior_state: year.state,
            new_state,
        };
        let finalized = year.finalized();
        let record = AuditRecorder::year_record(&finalized, &ctx, year.totals);

        let periods_finalized = updates.len();
        let stored = self.commit_year(&year, finalized, updates, record).await?;
        info!(fiscal_year_id = %year.id, actor = %actor, periods_finalized, "Fiscal year finalized");
        Ok(stored)
    }

    /// Looks up a fiscal year with its periods.
    ///
    /// # Errors
    ///
    /// `FiscalYearNotFound`.
    pub async fn fiscal_year(
        &self,
        year_id: FiscalYearId,
    ) -> Result<(FiscalYear, Vec<AccountingPeriod>), ClosingError> {
        let year = self.load_year(year_id).await?;
        let periods = self.periods.periods_for_year(year.id).await?;
        Ok((year, periods))
    }

    // ========== Ledger ==========

    /// Creates a draft ledger entry.
    ///
    /// # Errors
    ///
    /// See [`LedgerService::create_entry`].
    pub async fn post_ledger_entry(&self, input: CreateEntryInput) -> Result<LedgerEntry, LedgerError> {
        self.ledger.create_entry(input).await
    }

    /// Confirms a draft ledger entry.
    ///
    /// # Errors
    ///
    /// See [`LedgerService::confirm_entry`].
    pub async fn confirm_ledger_entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
        actor: ActorId,
    ) -> Result<LedgerEntry, LedgerError> {
        self.ledger.confirm_entry(company, id, actor).await
    }

    /// Voids a confirmed ledger entry.
    ///
    /// # Errors
    ///
    /// See [`LedgerService::void_entry`].
    pub async fn void_ledger_entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
        actor: ActorId,
    ) -> Result<LedgerEntry, LedgerError> {
        self.ledger.void_entry(company, id, actor).await
    }

    /// Updates a draft ledger entry.
    ///
    /// # Errors
    ///
    /// See [`LedgerService::update_entry`].
    pub async fn update_ledger_entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
        patch: EntryPatch,
        actor: ActorId,
    ) -> Result<LedgerEntry, LedgerError> {
        self.ledger.update_entry(company, id, patch, actor).await
    }

    async fn load_period(&self, id: PeriodId) -> Result<AccountingPeriod, ClosingError> {
        self.periods
            .period(id)
            .await?
            .ok_or(ClosingError::PeriodNotFound(id))
    }

    async fn load_year(&self, id: FiscalYearId) -> Result<FiscalYear, ClosingError> {
        self.periods
            .fiscal_year(id)
            .await?
            .ok_or(ClosingError::FiscalYearNotFound(id))
    }

    async fn commit_year(
        &self,
        current: &FiscalYear,
        year: FiscalYear,
        periods: Vec<PeriodUpdate>,
        record: ClosureRecord,
    ) -> Result<FiscalYear, ClosingError> {
        self.closing
            .commit_year_transition(YearTransition {
                expected_state: current.state,
                expected_version: current.version,
                year,
                periods,
                record,
            })
            .await
            .map_err(|err| {
                if !err.is_conflict() {
                    error!(fiscal_year_id = %current.id, error = %err, "Fiscal year transition rolled back");
                }
                err.into()
            })
    }
}

fn commit_error(err: StoreError, period_id: PeriodId) -> ClosingError {
    if err.is_conflict() {
        warn!(period_id = %period_id, error = %err, "Period transition lost a race");
    } else {
        error!(period_id = %period_id, error = %err, "Period transition rolled back");
    }
    err.into()
}
