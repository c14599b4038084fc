//! `ClosingStore`: period and fiscal-year transitions, visibility flags,
//! and the append-only audit tables.

use async_trait::async_trait;
use closebook_core::audit::{BalanceSnapshot, ClosureRecord, ClosureScope};
use closebook_core::fiscal::{AccountingPeriod, FiscalYear, PeriodState};
use closebook_core::store::{
    ClosingStore, CommittedTransition, PeriodTransition, StoreError, Visibility, YearTransition,
};
use closebook_shared::types::{CompanyId, PeriodId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use super::PgStore;
use super::convert::{self, db_err};
use crate::entities::{
    accounting_periods, balance_snapshots, closure_records, commissions, fiscal_years,
    source_documents,
};

/// Writes `period` over the stored row if it is still in the expected
/// state and version.
async fn swap_period<C: ConnectionTrait>(
    conn: &C,
    period: &AccountingPeriod,
    expected_state: PeriodState,
    expected_version: i64,
) -> Result<(), StoreError> {
    let result = accounting_periods::Entity::update_many()
        .set(convert::period_model(period)?)
        .filter(accounting_periods::Column::Id.eq(period.id.into_inner()))
        .filter(accounting_periods::Column::State.eq(expected_state.as_str()))
        .filter(accounting_periods::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        return Err(StoreError::Conflict(format!(
            "period {} is no longer {expected_state} v{expected_version}",
            period.id
        )));
    }
    Ok(())
}

/// Applies a visibility change to documents and commissions of the period's
/// company. Returns the number of rows changed.
async fn apply_visibility<C: ConnectionTrait>(
    conn: &C,
    period: &AccountingPeriod,
    visibility: Visibility,
) -> Result<u64, StoreError> {
    let company = period.company_id.into_inner();
    let id = period.id.into_inner();

    match visibility {
        Visibility::Unchanged => Ok(0),
        Visibility::Hide => {
            let docs = source_documents::Entity::update_many()
                .col_expr(source_documents::Column::HiddenByPeriod, Expr::value(id))
                .filter(source_documents::Column::CompanyId.eq(company))
                .filter(source_documents::Column::IssueDate.between(period.start_date, period.end_date))
                .filter(
                    Condition::any()
                        .add(source_documents::Column::HiddenByPeriod.is_null())
                        .add(source_documents::Column::HiddenByPeriod.ne(id)),
                )
                .exec(conn)
                .await
                .map_err(db_err)?;
            let comms = commissions::Entity::update_many()
                .col_expr(commissions::Column::HiddenByPeriod, Expr::value(id))
                .filter(commissions::Column::CompanyId.eq(company))
                .filter(commissions::Column::Date.between(period.start_date, period.end_date))
                .filter(
                    Condition::any()
                        .add(commissions::Column::HiddenByPeriod.is_null())
                        .add(commissions::Column::HiddenByPeriod.ne(id)),
                )
                .exec(conn)
                .await
                .map_err(db_err)?;
            Ok(docs.rows_affected + comms.rows_affected)
        }
        Visibility::Show => {
            let docs = source_documents::Entity::update_many()
                .col_expr(
                    source_documents::Column::HiddenByPeriod,
                    Expr::value(Option::<Uuid>::None),
                )
                .filter(source_documents::Column::CompanyId.eq(company))
                .filter(source_documents::Column::HiddenByPeriod.eq(id))
                .exec(conn)
                .await
                .map_err(db_err)?;
            let comms = commissions::Entity::update_many()
                .col_expr(
                    commissions::Column::HiddenByPeriod,
                    Expr::value(Option::<Uuid>::None),
                )
                .filter(commissions::Column::CompanyId.eq(company))
                .filter(commissions::Column::HiddenByPeriod.eq(id))
                .exec(conn)
                .await
                .map_err(db_err)?;
            Ok(docs.rows_affected + comms.rows_affected)
        }
    }
}

async fn append_record<C: ConnectionTrait>(conn: &C, record: &ClosureRecord) -> Result<(), StoreError> {
    convert::closure_record_model(record)?
        .insert(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl ClosingStore for PgStore {
    async fn commit_period_transition(
        &self,
        transition: PeriodTransition,
    ) -> Result<CommittedTransition, StoreError> {
        let PeriodTransition {
            expected_state,
            expected_version,
            mut period,
            snapshots,
            record,
            visibility,
        } = transition;

        let txn = self.db.begin().await.map_err(db_err)?;

        period.version = expected_version + 1;
        swap_period(&txn, &period, expected_state, expected_version).await?;
        let documents_affected = apply_visibility(&txn, &period, visibility).await?;

        // The record goes first: snapshots reference it.
        append_record(&txn, &record).await?;
        for snapshot in &snapshots {
            convert::snapshot_model(snapshot)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(CommittedTransition {
            period,
            documents_affected,
        })
    }

    async fn sync_document_visibility(
        &self,
        period_id: PeriodId,
        expected_state: PeriodState,
        expected_version: i64,
    ) -> Result<u64, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // FOR UPDATE holds off a concurrent close until the flags are written.
        let stored = accounting_periods::Entity::find_by_id(period_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("period {period_id}")))?;
        let period = convert::period(stored)?;
        if period.state != expected_state || period.version != expected_version {
            return Err(StoreError::Conflict(format!(
                "period {period_id} is {} v{}, expected {expected_state} v{expected_version}",
                period.state, period.version
            )));
        }

        let visibility = if period.allows_entries {
            Visibility::Show
        } else {
            Visibility::Hide
        };
        let changed = apply_visibility(&txn, &period, visibility).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(changed)
    }

    async fn commit_year_transition(
        &self,
        transition: YearTransition,
    ) -> Result<FiscalYear, StoreError> {
        let YearTransition {
            expected_state,
            expected_version,
            mut year,
            periods,
            record,
        } = transition;

        let txn = self.db.begin().await.map_err(db_err)?;

        year.version = expected_version + 1;
        let result = fiscal_years::Entity::update_many()
            .set(convert::fiscal_year_model(&year)?)
            .filter(fiscal_years::Column::Id.eq(year.id.into_inner()))
            .filter(fiscal_years::Column::State.eq(expected_state.as_str()))
            .filter(fiscal_years::Column::Version.eq(expected_version))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::Conflict(format!(
                "fiscal year {} is no longer {expected_state} v{expected_version}",
                year.id
            )));
        }

        for update in periods {
            let mut period = update.period;
            period.version = update.expected_version + 1;
            swap_period(&txn, &period, update.expected_state, update.expected_version).await?;
        }

        append_record(&txn, &record).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(year)
    }

    async fn closure_history(
        &self,
        company: CompanyId,
        period: Option<PeriodId>,
    ) -> Result<Vec<ClosureRecord>, StoreError> {
        let mut query = closure_records::Entity::find()
            .filter(closure_records::Column::CompanyId.eq(company.into_inner()));
        if let Some(period) = period {
            query = query
                .filter(closure_records::Column::Scope.eq(ClosureScope::Period.as_str()))
                .filter(closure_records::Column::TargetId.eq(period.into_inner()));
        }

        query
            .order_by_asc(closure_records::Column::At)
            .order_by_asc(closure_records::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::closure_record)
            .collect()
    }

    async fn snapshots_for_period(
        &self,
        period: PeriodId,
    ) -> Result<Vec<BalanceSnapshot>, StoreError> {
        Ok(balance_snapshots::Entity::find()
            .filter(balance_snapshots::Column::PeriodId.eq(period.into_inner()))
            .order_by_asc(balance_snapshots::Column::CapturedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::snapshot)
            .collect())
    }
}
