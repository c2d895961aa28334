//! Database initialization
//!
//! Opens the SQLite pool shared by every handler and creates the schema if
//! needed. All statements are idempotent, so startup against an existing
//! database is safe.

use crate::config::DatabaseConfig;
use crate::time::millis_to_duration;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Open the connection pool and create tables if needed
pub async fn init_database(database_url: &str, config: &DatabaseConfig) -> Result<SqlitePool> {
    // Pragmas on the connect options apply to every pooled connection,
    // not just the one that happens to run a PRAGMA statement.
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(millis_to_duration(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    ping(&pool).await?;
    create_schema(&pool).await?;

    info!(
        max_connections = config.max_connections,
        busy_timeout_ms = config.busy_timeout_ms,
        "Database ready"
    );

    Ok(pool)
}

/// Round-trip a trivial query through the pool
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_time_slices_table(pool).await?;
    create_contract_locks_table(pool).await?;
    Ok(())
}

async fn create_time_slices_table(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT: identifiers are never reused, so they follow insert order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS time_slices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contract_id TEXT NOT NULL,
            top_article_id INTEGER NOT NULL,
            validity_tag TEXT NOT NULL,
            invoice_date TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_time_slices_contract_created \
         ON time_slices(contract_id, created_at)",
    )
    .execute(pool)
    .await?;

    // A contract never records the same article twice
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_time_slices_contract_article \
         ON time_slices(contract_id, top_article_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_contract_locks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contract_locks (
            contract_id TEXT PRIMARY KEY,
            locked_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
