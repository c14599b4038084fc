//! `SeaORM` Entity for the ledger_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub period_id: Uuid,
    pub prefix: String,
    pub sequence: i64,
    pub date: Date,
    pub description: String,
    pub reference: Option<String>,
    pub state: String,
    pub version: i64,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub voided_by: Option<Uuid>,
    pub voided_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::postings::Entity")]
    Postings,
}

impl Related<super::postings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Postings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
