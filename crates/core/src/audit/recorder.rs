//! Builds snapshots and closure records for a transition.

use chrono::{DateTime, Utc};
use closebook_shared::types::{ActorId, ClosureRecordId, CompanyId, SnapshotId};
use uuid::Uuid;

use super::types::{BalanceSnapshot, ClosureAction, ClosureRecord, ClosureScope};
use crate::fiscal::{AccountingPeriod, FiscalYear, PeriodState, PeriodTotals};
use crate::treasury::AccountReconciliation;

/// What changed, who did it, and why.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    /// Action performed.
    pub action: ClosureAction,
    /// Acting user or process.
    pub actor: ActorId,
    /// Timestamp shared by every row written.
    pub at: DateTime<Utc>,
    /// Reason (mandatory for reopen).
    pub reason: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// State before.
    pub prior_state: PeriodState,
    /// State after.
    pub new_state: PeriodState,
}

/// Stateless builder for audit rows.
pub struct AuditRecorder;

impl AuditRecorder {
    /// Closure record for a period transition.
    #[must_use]
    pub fn period_record(
        period: &AccountingPeriod,
        ctx: &TransitionContext,
        totals: Option<PeriodTotals>,
    ) -> ClosureRecord {
        Self::record(
            period.company_id,
            ClosureScope::Period,
            period.id.into_inner(),
            ctx,
            totals,
        )
    }

    /// Closure record for a fiscal-year transition.
    #[must_use]
    pub fn year_record(
        year: &FiscalYear,
        ctx: &TransitionContext,
        totals: Option<PeriodTotals>,
    ) -> ClosureRecord {
        Self::record(
            year.company_id,
            ClosureScope::FiscalYear,
            year.id.into_inner(),
            ctx,
            totals,
        )
    }

    /// One snapshot per reconciled account, all linked to `record`.
    #[must_use]
    pub fn snapshots(
        period: &AccountingPeriod,
        record: &ClosureRecord,
        reconciliations: &[AccountReconciliation],
    ) -> Vec<BalanceSnapshot> {
        reconciliations
            .iter()
            .map(|r| BalanceSnapshot {
                id: SnapshotId::new(),
                period_id: period.id,
                closure_record_id: record.id,
                bank_account_id: r.bank_account_id,
                computed_balance: r.computed_balance,
                recorded_balance: r.recorded_balance,
                difference: r.difference,
                captured_at: record.at,
            })
            .collect()
    }

    fn record(
        company_id: CompanyId,
        scope: ClosureScope,
        target_id: Uuid,
        ctx: &TransitionContext,
        totals: Option<PeriodTotals>,
    ) -> ClosureRecord {
        ClosureRecord {
            id: ClosureRecordId::new(),
            company_id,
            scope,
            target_id,
            action: ctx.action,
            actor: ctx.actor,
            at: ctx.at,
            reason: ctx.reason.clone(),
            notes: ctx.notes.clone(),
            prior_state: ctx.prior_state,
            new_state: ctx.new_state,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::generate_monthly_periods;
    use chrono::NaiveDate;
    use closebook_shared::types::{AccountId, BankAccountId, FiscalYearId};
    use rust_decimal_macros::dec;

    fn january() -> AccountingPeriod {
        generate_monthly_periods(
            FiscalYearId::new(),
            CompanyId::new(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .remove(0)
    }

    fn close_ctx() -> TransitionContext {
        TransitionContext {
            action: ClosureAction::Close,
            actor: ActorId::new(),
            at: Utc::now(),
            reason: None,
            notes: Some("month end".to_string()),
            prior_state: PeriodState::Open,
            new_state: PeriodState::Closed,
        }
    }

    #[test]
    fn test_period_record_targets_period() {
        let period = january();
        let ctx = close_ctx();
        let record = AuditRecorder::period_record(&period, &ctx, None);

        assert!(record.is_for_period(period.id));
        assert_eq!(record.company_id, period.company_id);
        assert_eq!(record.prior_state, PeriodState::Open);
        assert_eq!(record.new_state, PeriodState::Closed);
        assert_eq!(record.notes.as_deref(), Some("month end"));
    }

    #[test]
    fn test_snapshots_link_to_record() {
        let period = january();
        let record = AuditRecorder::period_record(&period, &close_ctx(), None);
        let reconciliations = vec![
            AccountReconciliation {
                bank_account_id: BankAccountId::new(),
                name: "Main bank".to_string(),
                ledger_account_id: AccountId::new(),
                computed_balance: dec!(1000.00),
                recorded_balance: dec!(1000.00),
                difference: dec!(0.00),
                matches: true,
            },
            AccountReconciliation {
                bank_account_id: BankAccountId::new(),
                name: "Petty cash".to_string(),
                ledger_account_id: AccountId::new(),
                computed_balance: dec!(50.00),
                recorded_balance: dec!(50.01),
                difference: dec!(0.01),
                matches: true,
            },
        ];

        let snapshots = AuditRecorder::snapshots(&period, &record, &reconciliations);

        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.closure_record_id == record.id));
        assert!(snapshots.iter().all(|s| s.captured_at == record.at));
        assert_eq!(snapshots[1].difference, dec!(0.01));
    }
}
