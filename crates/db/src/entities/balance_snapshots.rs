//! `SeaORM` Entity for the balance_snapshots table (append-only).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "balance_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub period_id: Uuid,
    pub closure_record_id: Uuid,
    pub bank_account_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub computed_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub recorded_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub difference: Decimal,
    pub captured_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::closure_records::Entity",
        from = "Column::ClosureRecordId",
        to = "super::closure_records::Column::Id"
    )]
    ClosureRecords,
}

impl Related<super::closure_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClosureRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
