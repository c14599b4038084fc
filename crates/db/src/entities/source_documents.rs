//! `SeaORM` Entity for the source_documents table.
//!
//! Owned by invoicing; the closing engine only reads posting status and
//! writes `hidden_by_period`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "source_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub kind: String,
    pub number: String,
    pub issue_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,
    pub posting_status: String,
    pub posting_error: Option<String>,
    pub entry_id: Option<Uuid>,
    pub hidden_by_period: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
