//! PostgreSQL implementation of the closing engine's storage and
//! collaborator traits.
//!
//! Every multi-row write runs in one database transaction. Compare-and-set
//! guards are `UPDATE ... WHERE version = $expected AND state = $expected`
//! statements; zero affected rows is a `Conflict` and rolls everything back.

mod closing;
mod collaborators;
mod convert;
mod ledger;
mod periods;

use closebook_core::store::{PeriodLock, StoreError};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::accounting_periods;
use convert::db_err;

/// Store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Creates a store over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Bumps an open period's version if it still has the version the writer
/// read.
async fn acquire<C: ConnectionTrait>(conn: &C, lock: PeriodLock) -> Result<(), StoreError> {
    let result = accounting_periods::Entity::update_many()
        .col_expr(
            accounting_periods::Column::Version,
            Expr::col(accounting_periods::Column::Version).add(1),
        )
        .filter(accounting_periods::Column::Id.eq(lock.period_id.into_inner()))
        .filter(accounting_periods::Column::Version.eq(lock.version))
        .filter(accounting_periods::Column::AllowsEntries.eq(true))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        return Err(StoreError::Conflict(format!(
            "period {} is closed or changed since version {}",
            lock.period_id, lock.version
        )));
    }
    Ok(())
}
