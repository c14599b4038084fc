//! `PeriodStore` over the fiscal_years and accounting_periods tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use closebook_core::fiscal::{AccountingPeriod, FiscalYear};
use closebook_core::store::{PeriodStore, StoreError};
use closebook_shared::types::{CompanyId, FiscalYearId, PeriodId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Statement, TransactionTrait, Value,
};

use super::PgStore;
use super::convert::{self, db_err};
use crate::entities::{accounting_periods, fiscal_years};

#[async_trait]
impl PeriodStore for PgStore {
    async fn insert_fiscal_year(
        &self,
        year: FiscalYear,
        periods: Vec<AccountingPeriod>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Held until commit: concurrent creators for the company queue here.
        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))",
            [Value::from(year.company_id.into_inner())],
        ))
        .await
        .map_err(db_err)?;

        let overlapping = fiscal_years::Entity::find()
            .filter(fiscal_years::Column::CompanyId.eq(year.company_id.into_inner()))
            .filter(fiscal_years::Column::StartDate.lte(year.end_date))
            .filter(fiscal_years::Column::EndDate.gte(year.start_date))
            .one(&txn)
            .await
            .map_err(db_err)?;

        if let Some(existing) = overlapping {
            return Err(StoreError::Conflict(format!(
                "fiscal year overlaps {}",
                existing.id
            )));
        }

        convert::fiscal_year_model(&year)?
            .insert(&txn)
            .await
            .map_err(db_err)?;
        for period in &periods {
            convert::period_model(period)?
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn fiscal_year(&self, id: FiscalYearId) -> Result<Option<FiscalYear>, StoreError> {
        fiscal_years::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(convert::fiscal_year)
            .transpose()
    }

    async fn fiscal_years(&self, company: CompanyId) -> Result<Vec<FiscalYear>, StoreError> {
        fiscal_years::Entity::find()
            .filter(fiscal_years::Column::CompanyId.eq(company.into_inner()))
            .order_by_asc(fiscal_years::Column::StartDate)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::fiscal_year)
            .collect()
    }

    async fn period(&self, id: PeriodId) -> Result<Option<AccountingPeriod>, StoreError> {
        accounting_periods::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(convert::period)
            .transpose()
    }

    async fn period_for_date(
        &self,
        company: CompanyId,
        date: NaiveDate,
    ) -> Result<Option<AccountingPeriod>, StoreError> {
        accounting_periods::Entity::find()
            .filter(accounting_periods::Column::CompanyId.eq(company.into_inner()))
            .filter(accounting_periods::Column::StartDate.lte(date))
            .filter(accounting_periods::Column::EndDate.gte(date))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(convert::period)
            .transpose()
    }

    async fn periods_for_year(
        &self,
        year: FiscalYearId,
    ) -> Result<Vec<AccountingPeriod>, StoreError> {
        accounting_periods::Entity::find()
            .filter(accounting_periods::Column::FiscalYearId.eq(year.into_inner()))
            .order_by_asc(accounting_periods::Column::Number)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::period)
            .collect()
    }
}
