//! `SeaORM` Entity for the fiscal_years table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fiscal_years")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub year: i32,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub state: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub total_debits: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub total_credits: Option<Decimal>,
    pub entry_count: Option<i64>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub closed_by: Option<Uuid>,
    pub reopened_at: Option<DateTimeWithTimeZone>,
    pub reopened_by: Option<Uuid>,
    pub reopen_reason: Option<String>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounting_periods::Entity")]
    AccountingPeriods,
}

impl Related<super::accounting_periods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountingPeriods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
