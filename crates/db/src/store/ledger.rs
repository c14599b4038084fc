//! `LedgerStore` over the ledger_entries and postings tables.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use closebook_core::ledger::{
    Account, AccountPosting, EntryState, LedgerEntry, NewLedgerEntry, Posting, entry_number,
};
use closebook_core::store::{LedgerStore, PeriodLock, StoreError};
use closebook_shared::DateRange;
use closebook_shared::types::{AccountId, CompanyId, LedgerEntryId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Statement, TransactionTrait,
    Value,
};
use uuid::Uuid;

use super::convert::{self, db_err};
use super::{PgStore, acquire};
use crate::entities::{accounts, ledger_entries, postings};

const NEXT_SEQUENCE_SQL: &str = r"
INSERT INTO entry_sequences (company_id, prefix, last_value)
VALUES ($1, $2, 1)
ON CONFLICT (company_id, prefix)
DO UPDATE SET last_value = entry_sequences.last_value + 1
RETURNING last_value
";

#[derive(Debug, FromQueryResult)]
struct PostingRow {
    entry_id: Uuid,
    prefix: String,
    sequence: i64,
    date: NaiveDate,
    description: String,
    debit: Decimal,
    credit: Decimal,
}

async fn next_sequence<C: ConnectionTrait>(
    conn: &C,
    company: CompanyId,
    prefix: &str,
) -> Result<i64, StoreError> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        NEXT_SEQUENCE_SQL,
        [
            Value::from(company.into_inner()),
            Value::from(prefix.to_string()),
        ],
    );
    let row = conn
        .query_one(stmt)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::Backend("sequence allocation returned no row".to_string()))?;
    row.try_get::<i64>("", "last_value").map_err(db_err)
}

async fn insert_postings<C: ConnectionTrait>(conn: &C, lines: &[Posting]) -> Result<(), StoreError> {
    for (line, posting) in lines.iter().enumerate() {
        convert::posting_model(posting, line + 1)?
            .insert(conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

impl PgStore {
    async fn load_postings(
        &self,
        entry_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<Posting>>, StoreError> {
        let rows = postings::Entity::find()
            .filter(postings::Column::EntryId.is_in(entry_ids))
            .order_by_asc(postings::Column::EntryId)
            .order_by_asc(postings::Column::LineNumber)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut grouped: HashMap<Uuid, Vec<Posting>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.entry_id)
                .or_default()
                .push(convert::posting(row));
        }
        Ok(grouped)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn account(
        &self,
        company: CompanyId,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::CompanyId.eq(company.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn insert_entry(
        &self,
        entry: NewLedgerEntry,
        lock: PeriodLock,
    ) -> Result<LedgerEntry, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        acquire(&txn, lock).await?;
        let sequence = next_sequence(&txn, entry.company_id, &entry.prefix).await?;
        let stored = entry.into_entry(sequence);

        convert::entry_model(&stored)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        insert_postings(&txn, &stored.postings).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(stored)
    }

    async fn entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let Some(model) = ledger_entries::Entity::find_by_id(id.into_inner())
            .filter(ledger_entries::Column::CompanyId.eq(company.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut lines = self.load_postings(vec![model.id]).await?;
        let postings = lines.remove(&model.id).unwrap_or_default();
        convert::entry(model, postings).map(Some)
    }

    async fn update_entry(
        &self,
        mut entry: LedgerEntry,
        expected_version: i64,
        locks: &[PeriodLock],
    ) -> Result<LedgerEntry, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        entry.version = expected_version + 1;
        let result = ledger_entries::Entity::update_many()
            .set(convert::entry_model(&entry))
            .filter(ledger_entries::Column::Id.eq(entry.id.into_inner()))
            .filter(ledger_entries::Column::Version.eq(expected_version))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            let exists = ledger_entries::Entity::find_by_id(entry.id.into_inner())
                .one(&txn)
                .await
                .map_err(db_err)?
                .is_some();
            return Err(if exists {
                StoreError::Conflict(format!(
                    "entry {} changed since version {expected_version}",
                    entry.id
                ))
            } else {
                StoreError::NotFound(format!("entry {}", entry.id))
            });
        }

        for lock in locks {
            acquire(&txn, *lock).await?;
        }

        postings::Entity::delete_many()
            .filter(postings::Column::EntryId.eq(entry.id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        insert_postings(&txn, &entry.postings).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(entry)
    }

    async fn entries_in_range(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::CompanyId.eq(company.into_inner()))
            .filter(ledger_entries::Column::Date.between(range.start, range.end))
            .order_by_asc(ledger_entries::Column::Date)
            .order_by_asc(ledger_entries::Column::Prefix)
            .order_by_asc(ledger_entries::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut lines = self
            .load_postings(models.iter().map(|m| m.id).collect())
            .await?;
        models
            .into_iter()
            .map(|m| {
                let postings = lines.remove(&m.id).unwrap_or_default();
                convert::entry(m, postings)
            })
            .collect()
    }

    async fn confirmed_postings(
        &self,
        company: CompanyId,
        account: AccountId,
        from: Option<NaiveDate>,
        through: NaiveDate,
    ) -> Result<Vec<AccountPosting>, StoreError> {
        let mut query = postings::Entity::find()
            .select_only()
            .column(postings::Column::EntryId)
            .column(postings::Column::Debit)
            .column(postings::Column::Credit)
            .join(JoinType::InnerJoin, postings::Relation::LedgerEntries.def())
            .column(ledger_entries::Column::Prefix)
            .column(ledger_entries::Column::Sequence)
            .column(ledger_entries::Column::Date)
            .column(ledger_entries::Column::Description)
            .filter(ledger_entries::Column::CompanyId.eq(company.into_inner()))
            .filter(ledger_entries::Column::State.eq(EntryState::Confirmed.as_str()))
            .filter(postings::Column::AccountId.eq(account.into_inner()))
            .filter(ledger_entries::Column::Date.lte(through));

        if let Some(from) = from {
            query = query.filter(ledger_entries::Column::Date.gte(from));
        }

        let rows: Vec<PostingRow> = query
            .order_by_asc(ledger_entries::Column::Date)
            .order_by_asc(ledger_entries::Column::Prefix)
            .order_by_asc(ledger_entries::Column::Sequence)
            .order_by_asc(postings::Column::LineNumber)
            .into_model::<PostingRow>()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| AccountPosting {
                entry_id: LedgerEntryId::from_uuid(row.entry_id),
                entry_number: entry_number(&row.prefix, row.sequence),
                date: row.date,
                description: row.description,
                debit: row.debit,
                credit: row.credit,
            })
            .collect())
    }
}
