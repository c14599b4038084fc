//! End-to-end closing against PostgreSQL.
//!
//! Needs a reachable database (`DATABASE_URL` or `CLOSEBOOK__DATABASE__URL`);
//! each test skips itself when none is available. Every test works in its
//! own company so runs do not interfere.

#![allow(clippy::similar_names)]

use std::env;

use chrono::{NaiveDate, Utc};
use closebook_core::documents::PostingStatus;
use closebook_core::ledger::{AccountType, CreateEntryInput, LedgerError, PostingInput};
use closebook_core::store::{ClosingStore, PeriodStore};
use closebook_core::{ClosingEngine, ClosingError, PeriodState};
use closebook_db::entities::{accounts, bank_accounts, source_documents};
use closebook_db::migration::{Migrator, MigratorTrait};
use closebook_db::{PgStore, pg_engine};
use closebook_shared::types::{AccountId, ActorId, CompanyId, DocumentId, PeriodId};
use closebook_shared::{ClosingConfig, DatabaseConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};
use uuid::Uuid;

fn get_database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("CLOSEBOOK__DATABASE__URL"))
        .ok()
}

async fn database() -> Option<DatabaseConnection> {
    let url = get_database_url()?;
    let config = DatabaseConfig {
        url,
        max_connections: 5,
        min_connections: 1,
    };
    let db = closebook_db::connect(&config).await.ok()?;
    Migrator::up(&db, None).await.ok()?;
    Some(db)
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

struct Books {
    db: DatabaseConnection,
    engine: ClosingEngine,
    company: CompanyId,
    actor: ActorId,
    january: PeriodId,
    receivable: AccountId,
    sales: AccountId,
}

async fn add_account(db: &DatabaseConnection, company: CompanyId, code: &str, kind: AccountType) -> AccountId {
    let id = Uuid::now_v7();
    accounts::ActiveModel {
        id: Set(id),
        company_id: Set(company.into_inner()),
        code: Set(code.to_string()),
        name: Set(code.to_string()),
        account_type: Set(kind.as_str().to_string()),
        parent_id: Set(None),
        is_active: Set(true),
        is_leaf: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
    AccountId::from_uuid(id)
}

async fn books() -> Option<Books> {
    let db = database().await?;
    let engine = pg_engine(db.clone(), ClosingConfig::default());
    let company = CompanyId::new();
    let (_, periods) = engine
        .create_fiscal_year(company, 2025, date(1, 1), date(12, 31))
        .await
        .unwrap();

    let receivable = add_account(&db, company, "1.1.03", AccountType::Asset).await;
    let sales = add_account(&db, company, "4.1.01", AccountType::Income).await;
    let cash = add_account(&db, company, "1.1.01", AccountType::Asset).await;

    bank_accounts::ActiveModel {
        id: Set(Uuid::now_v7()),
        company_id: Set(company.into_inner()),
        name: Set("Main bank".to_string()),
        ledger_account_id: Set(cash.into_inner()),
        opening_balance: Set(dec!(500.00)),
        recorded_balance: Set(dec!(500.00)),
        is_active: Set(true),
    }
    .insert(&db)
    .await
    .unwrap();

    Some(Books {
        db,
        engine,
        company,
        actor: ActorId::new(),
        january: periods[0].id,
        receivable,
        sales,
    })
}

impl Books {
    fn sale(&self, on: NaiveDate, amount: Decimal) -> CreateEntryInput {
        CreateEntryInput {
            company_id: self.company,
            date: on,
            description: "Sales invoice".to_string(),
            reference: None,
            prefix: None,
            postings: vec![
                PostingInput::debit(self.receivable, amount),
                PostingInput::credit(self.sales, amount),
            ],
            created_by: self.actor,
        }
    }

    async fn add_document(&self, on: NaiveDate, status: PostingStatus) -> DocumentId {
        let id = Uuid::now_v7();
        source_documents::ActiveModel {
            id: Set(id),
            company_id: Set(self.company.into_inner()),
            kind: Set("sales_invoice".to_string()),
            number: Set(format!("F-{}", &id.simple().to_string()[..8])),
            issue_date: Set(on),
            total: Set(dec!(118.00)),
            posting_status: Set(status.as_str().to_string()),
            posting_error: Set(status.error().map(str::to_string)),
            entry_id: Set(None),
            hidden_by_period: Set(None),
        }
        .insert(&self.db)
        .await
        .unwrap();
        DocumentId::from_uuid(id)
    }

    async fn hidden_by(&self, doc: DocumentId) -> Option<Uuid> {
        source_documents::Entity::find_by_id(doc.into_inner())
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
            .hidden_by_period
    }
}

#[tokio::test]
async fn test_close_and_reopen_round_trip() {
    let Some(bk) = books().await else {
        eprintln!("skipping: no database available");
        return;
    };

    let entry = bk.engine.post_ledger_entry(bk.sale(date(1, 15), dec!(118.00))).await.unwrap();
    bk.engine
        .confirm_ledger_entry(bk.company, entry.id, bk.actor)
        .await
        .unwrap();
    let doc = bk.add_document(date(1, 15), PostingStatus::Posted).await;

    let summary = bk
        .engine
        .close_period(bk.january, bk.actor, None, Some("Month end".to_string()))
        .await
        .unwrap();
    assert_eq!(summary.period.state, PeriodState::Closed);
    assert_eq!(summary.totals.total_debits, dec!(118.00));
    assert_eq!(summary.snapshots.len(), 1);
    assert_eq!(bk.hidden_by(doc).await, Some(bk.january.into_inner()));

    let late = bk.engine.post_ledger_entry(bk.sale(date(1, 20), dec!(1.00))).await;
    assert!(matches!(late, Err(LedgerError::PeriodClosed { .. })));

    bk.engine
        .reopen_period(bk.january, bk.actor, "Missing credit note")
        .await
        .unwrap();
    assert_eq!(bk.hidden_by(doc).await, None);

    let history = bk
        .engine
        .get_closure_history(bk.company, Some(bk.january))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].reason.as_deref(), Some("Missing credit note"));
    assert_eq!(bk.engine.period_snapshots(bk.january).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_posting_blocks_close() {
    let Some(bk) = books().await else {
        eprintln!("skipping: no database available");
        return;
    };

    bk.add_document(
        date(1, 3),
        PostingStatus::PostingFailed {
            error: "tax code missing".to_string(),
        },
    )
    .await;

    let err = bk
        .engine
        .close_period(bk.january, bk.actor, None, None)
        .await
        .unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].code(), "DOCUMENT_POSTING_FAILED");
    assert_eq!(
        bk.engine.get_period_state(bk.january).await.unwrap(),
        PeriodState::Open
    );
}

#[tokio::test]
async fn test_stale_visibility_sync_keeps_closed_period_hidden() {
    let Some(bk) = books().await else {
        eprintln!("skipping: no database available");
        return;
    };
    let doc = bk.add_document(date(1, 18), PostingStatus::Posted).await;
    let store = PgStore::new(bk.db.clone());
    let stale = store.period(bk.january).await.unwrap().unwrap();

    bk.engine
        .close_period(bk.january, bk.actor, None, None)
        .await
        .unwrap();

    let err = store
        .sync_document_visibility(stale.id, stale.state, stale.version)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(bk.hidden_by(doc).await, Some(bk.january.into_inner()));
}

#[tokio::test]
async fn test_concurrent_closes_commit_once() {
    let Some(bk) = books().await else {
        eprintln!("skipping: no database available");
        return;
    };
    let other = pg_engine(bk.db.clone(), ClosingConfig::default());

    let (first, second) = tokio::join!(
        bk.engine.close_period(bk.january, bk.actor, None, None),
        other.close_period(bk.january, bk.actor, None, None),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(ClosingError::ConcurrentStateChange | ClosingError::InvalidStateTransition { .. })
    )));
    let history = bk.engine.get_closure_history(bk.company, None).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_entry_sequences_are_gap_free() {
    let Some(bk) = books().await else {
        eprintln!("skipping: no database available");
        return;
    };

    let created = futures::future::join_all(
        (0..5).map(|_| bk.engine.post_ledger_entry(bk.sale(date(2, 10), dec!(10.00)))),
    )
    .await;

    let mut sequences: Vec<i64> = created
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.sequence)
        .collect();
    sequences.sort_unstable();
    let expected: Vec<i64> = (1..=i64::try_from(sequences.len()).unwrap()).collect();
    assert_eq!(sequences, expected);
}

#[tokio::test]
async fn test_store_reads_back_period_rows() {
    let Some(bk) = books().await else {
        eprintln!("skipping: no database available");
        return;
    };
    let store = PgStore::new(bk.db.clone());
    let period = store.period(bk.january).await.unwrap().unwrap();
    assert_eq!(period.number, 1);
    assert_eq!(period.state, PeriodState::Open);
    assert!(period.totals.is_none());

    let found = store
        .period_for_date(bk.company, date(1, 31))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, bk.january);
    assert_eq!(store.fiscal_years(bk.company).await.unwrap().len(), 1);
}
