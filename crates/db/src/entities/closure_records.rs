//! `SeaORM` Entity for the closure_records table (append-only).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "closure_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub scope: String,
    pub target_id: Uuid,
    pub action: String,
    pub actor: Uuid,
    pub at: DateTimeWithTimeZone,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub prior_state: String,
    pub new_state: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub total_debits: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub total_credits: Option<Decimal>,
    pub entry_count: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::balance_snapshots::Entity")]
    BalanceSnapshots,
}

impl Related<super::balance_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
