//! Time slice queries

use chrono::{DateTime, Utc};
use contract_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashSet;

use crate::models::{TimeSlice, TimeSliceId};

/// Invoice date and creation time of a contract's most recent slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestSlice {
    pub invoice_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Column values for a new row
#[derive(Debug, Clone)]
pub struct NewTimeSliceRow<'a> {
    pub contract_id: &'a str,
    pub top_article_id: i64,
    pub validity_tag: &'a str,
    pub invoice_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Take the per-contract write lock for the current transaction.
///
/// Must be the first statement of the transaction: it is a write, so SQLite
/// grants the database write lock before any read snapshot is taken, and a
/// concurrent writer waits (busy timeout) until this transaction ends.
pub async fn lock_contract(
    conn: &mut SqliteConnection,
    contract_id: &str,
    at: &DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO contract_locks (contract_id, locked_at)
        VALUES (?, ?)
        ON CONFLICT(contract_id) DO UPDATE SET locked_at = excluded.locked_at
        "#,
    )
    .bind(contract_id)
    .bind(time::to_storage(at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// All article IDs already recorded for a contract
pub async fn known_article_ids(
    conn: &mut SqliteConnection,
    contract_id: &str,
) -> Result<HashSet<i64>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT top_article_id FROM time_slices WHERE contract_id = ?")
            .bind(contract_id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(ids.into_iter().collect())
}

/// Most recently created slice for a contract, if any
pub async fn latest_slice(
    conn: &mut SqliteConnection,
    contract_id: &str,
) -> Result<Option<LatestSlice>> {
    let row: Option<(String, String)> = sqlx::query_as(
        r#"
        SELECT invoice_date, created_at
        FROM time_slices
        WHERE contract_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(contract_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|(invoice_date, created_at)| {
        Ok(LatestSlice {
            invoice_date: time::from_storage(&invoice_date)?,
            created_at: time::from_storage(&created_at)?,
        })
    })
    .transpose()
}

/// Overwrite the invoice date on every slice of a contract.
///
/// Returns the number of rows updated.
pub async fn backfill_invoice_date(
    conn: &mut SqliteConnection,
    contract_id: &str,
    invoice_date: &DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("UPDATE time_slices SET invoice_date = ? WHERE contract_id = ?")
        .bind(time::to_storage(invoice_date))
        .bind(contract_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Insert a slice and return its assigned identifier
pub async fn insert_time_slice(
    conn: &mut SqliteConnection,
    row: &NewTimeSliceRow<'_>,
) -> Result<TimeSliceId> {
    let result = sqlx::query(
        r#"
        INSERT INTO time_slices (contract_id, top_article_id, validity_tag, invoice_date, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(row.contract_id)
    .bind(row.top_article_id)
    .bind(row.validity_tag)
    .bind(time::to_storage(&row.invoice_date))
    .bind(time::to_storage(&row.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All slices for a contract, newest first
pub async fn list_for_contract(pool: &SqlitePool, contract_id: &str) -> Result<Vec<TimeSlice>> {
    let rows = sqlx::query(
        r#"
        SELECT id, contract_id, top_article_id, validity_tag, invoice_date, created_at
        FROM time_slices
        WHERE contract_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_time_slice).collect()
}

fn row_to_time_slice(row: &SqliteRow) -> Result<TimeSlice> {
    let invoice_date: String = row.try_get("invoice_date")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(TimeSlice {
        id: row.try_get("id")?,
        contract_id: row.try_get("contract_id")?,
        top_article_id: row.try_get("top_article_id")?,
        validity_tag: row.try_get("validity_tag")?,
        invoice_date: time::from_storage(&invoice_date)?,
        created_at: time::from_storage(&created_at)?,
    })
}
