//! Database migration runner for Closebook.
//!
//! Usage:
//!   migrator up [n]    - Run pending migrations (all, or the next `n`)
//!   migrator down [n]  - Roll back the last `n` migrations (default 1)
//!   migrator status    - Show migration status
//!   migrator fresh     - Drop all tables and re-run migrations
//!
//! The database is taken from the regular configuration
//! (`config/*` files and `CLOSEBOOK__DATABASE__URL`).

use anyhow::{Context, bail};
use closebook_db::{connect, migration::Migrator};
use closebook_shared::{AppConfig, init_tracing};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "up".to_string());
    let steps = args
        .next()
        .map(|s| s.parse::<u32>())
        .transpose()
        .context("step count must be a positive integer")?;

    let db = connect(&config.database).await?;

    match command.as_str() {
        "up" => Migrator::up(&db, steps).await?,
        "down" => Migrator::down(&db, Some(steps.unwrap_or(1))).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        other => bail!("unknown command `{other}` (expected up, down, status or fresh)"),
    }

    info!(command = %command, "Migration command finished");
    Ok(())
}
