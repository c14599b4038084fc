//! Collaborator traits read straight from the collaborator-owned tables.

use std::collections::HashSet;

use async_trait::async_trait;
use closebook_core::collaborators::{
    BankAccountProvider, CollaboratorError, CommissionProvider, SourceDocumentProvider,
    TreasuryMovementProvider,
};
use closebook_core::documents::{CommissionRecord, CommissionSettlement, DocumentPostingStatus};
use closebook_core::ledger::EntryState;
use closebook_core::treasury::{BankAccount, TreasuryMovement};
use closebook_shared::DateRange;
use closebook_shared::types::{BankAccountId, CompanyId};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use super::PgStore;
use super::convert::{self, db_err};
use crate::entities::{
    bank_accounts, commissions, ledger_entries, source_documents, treasury_movements,
};

#[async_trait]
impl SourceDocumentProvider for PgStore {
    async fn posting_status(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<DocumentPostingStatus>, CollaboratorError> {
        let rows = source_documents::Entity::find()
            .filter(source_documents::Column::CompanyId.eq(company.into_inner()))
            .filter(source_documents::Column::IssueDate.between(range.start, range.end))
            .order_by_asc(source_documents::Column::Kind)
            .order_by_asc(source_documents::Column::Number)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(convert::document_status)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl CommissionProvider for PgStore {
    async fn settlement_status(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<CommissionSettlement, CollaboratorError> {
        let records: Vec<CommissionRecord> = commissions::Entity::find()
            .filter(commissions::Column::CompanyId.eq(company.into_inner()))
            .filter(commissions::Column::Date.between(range.start, range.end))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::commission)
            .collect::<Result<_, _>>()?;

        let invoice_ids: Vec<Uuid> = records
            .iter()
            .filter_map(|r| r.invoice_entry_id.map(|id| id.into_inner()))
            .collect();
        let confirmed: HashSet<Uuid> = if invoice_ids.is_empty() {
            HashSet::new()
        } else {
            ledger_entries::Entity::find()
                .select_only()
                .column(ledger_entries::Column::Id)
                .filter(ledger_entries::Column::Id.is_in(invoice_ids))
                .filter(ledger_entries::Column::State.eq(EntryState::Confirmed.as_str()))
                .into_tuple::<Uuid>()
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .collect()
        };

        Ok(CommissionSettlement::tally(&records, |entry_id| {
            confirmed.contains(&entry_id.into_inner())
        }))
    }
}

#[async_trait]
impl BankAccountProvider for PgStore {
    async fn active_accounts(
        &self,
        company: CompanyId,
    ) -> Result<Vec<BankAccount>, CollaboratorError> {
        Ok(bank_accounts::Entity::find()
            .filter(bank_accounts::Column::CompanyId.eq(company.into_inner()))
            .filter(bank_accounts::Column::IsActive.eq(true))
            .order_by_asc(bank_accounts::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::bank_account)
            .collect())
    }
}

#[async_trait]
impl TreasuryMovementProvider for PgStore {
    async fn movements(
        &self,
        account: BankAccountId,
        range: DateRange,
    ) -> Result<Vec<TreasuryMovement>, CollaboratorError> {
        Ok(treasury_movements::Entity::find()
            .filter(treasury_movements::Column::BankAccountId.eq(account.into_inner()))
            .filter(treasury_movements::Column::Date.between(range.start, range.end))
            .order_by_asc(treasury_movements::Column::Date)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::movement)
            .collect())
    }
}
