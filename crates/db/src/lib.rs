//! Database layer with `SeaORM` entities and the PostgreSQL store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - `PgStore`, implementing every storage and collaborator trait of
//!   `closebook-core`
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::PgStore;

use std::sync::Arc;
use std::time::Duration;

use closebook_core::{ClosingEngine, Collaborators};
use closebook_shared::{ClosingConfig, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(max_connections = config.max_connections, "Database pool ready");
    Ok(db)
}

/// Builds a closing engine whose stores and collaborators all read the
/// same database.
#[must_use]
pub fn pg_engine(db: DatabaseConnection, config: ClosingConfig) -> ClosingEngine {
    let store = Arc::new(PgStore::new(db));
    let collaborators = Collaborators {
        documents: store.clone(),
        commissions: store.clone(),
        banks: store.clone(),
        movements: store.clone(),
    };
    ClosingEngine::new(store.clone(), store.clone(), store, collaborators, config)
}
