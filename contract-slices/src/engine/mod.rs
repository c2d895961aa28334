//! Time slice decision and persistence engine
//!
//! Creates one time slice per call inside a single transaction:
//! 1. Take the per-contract write lock
//! 2. Load the article IDs already recorded for the contract
//! 3. Pick the highest submitted ID not yet recorded, or reject
//! 4. If the newest slice's invoice date falls on another calendar day,
//!    overwrite the invoice date on every slice of the contract
//! 5. Insert the new slice and commit
//!
//! The transaction rolls back on rejection, on any error, and when the
//! caller's deadline expires before the commit is issued (dropping a
//! `sqlx::Transaction` rolls it back).

pub mod selection;

use chrono::{DateTime, Duration as ChronoDuration, SubsecRound, Utc};
use contract_common::{time, Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::time::Duration;
use tracing::debug;

use crate::db::time_slices::{self, LatestSlice, NewTimeSliceRow};
use crate::models::{NewTimeSlice, TimeSliceId};

pub use selection::highest_new;

/// Result of a create call
#[derive(Debug)]
pub enum CreateOutcome {
    /// New slice committed with this identifier
    Created(TimeSliceId),
    /// Every submitted article ID is already recorded for the contract
    AllArticlesKnown,
    /// Store failure or expired deadline; nothing was committed
    Failed(Error),
}

/// Writes time slices
#[derive(Clone)]
pub struct TimeSliceEngine {
    pool: SqlitePool,
}

impl TimeSliceEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a time slice for `slice.contract_id`
    pub async fn create_time_slice(&self, slice: &NewTimeSlice) -> CreateOutcome {
        match self.stage(slice).await {
            Ok(staged) => self.finish(slice, staged).await,
            Err(e) => CreateOutcome::Failed(e),
        }
    }

    /// Like [`create_time_slice`](Self::create_time_slice), abandoning the
    /// transaction if it is not ready to commit within `deadline`.
    ///
    /// The deadline stops at the commit. Once the commit is issued the call
    /// waits for it, so `Failed` always means nothing was written.
    pub async fn create_time_slice_within(
        &self,
        slice: &NewTimeSlice,
        deadline: Duration,
    ) -> CreateOutcome {
        match tokio::time::timeout(deadline, self.stage(slice)).await {
            Ok(Ok(staged)) => self.finish(slice, staged).await,
            Ok(Err(e)) => CreateOutcome::Failed(e),
            Err(_) => CreateOutcome::Failed(Error::Internal(format!(
                "deadline of {} ms exceeded",
                deadline.as_millis()
            ))),
        }
    }

    async fn finish(&self, slice: &NewTimeSlice, staged: Option<Staged>) -> CreateOutcome {
        let Some(Staged { tx, id, top_article_id }) = staged else {
            return CreateOutcome::AllArticlesKnown;
        };

        if let Err(e) = tx.commit().await {
            return CreateOutcome::Failed(e.into());
        }

        debug!(
            contract_id = %slice.contract_id,
            time_slice_id = id,
            top_article_id,
            "Time slice committed"
        );
        CreateOutcome::Created(id)
    }

    /// Run every step short of the commit. `None` means nothing was new and
    /// the transaction has already been rolled back.
    async fn stage(&self, slice: &NewTimeSlice) -> Result<Option<Staged>> {
        let mut tx = self.pool.begin().await?;
        let now = time::now();

        time_slices::lock_contract(&mut tx, &slice.contract_id, &now).await?;

        let known = time_slices::known_article_ids(&mut tx, &slice.contract_id).await?;
        let Some(top_article_id) = highest_new(&slice.article_ids, &known) else {
            tx.rollback().await?;
            debug!(
                contract_id = %slice.contract_id,
                known = known.len(),
                "No new article ID in request"
            );
            return Ok(None);
        };

        let latest = time_slices::latest_slice(&mut tx, &slice.contract_id).await?;
        if let Some(previous) = &latest {
            if needs_backfill(&previous.invoice_date, &slice.invoice_date) {
                let updated = time_slices::backfill_invoice_date(
                    &mut tx,
                    &slice.contract_id,
                    &slice.invoice_date,
                )
                .await?;
                debug!(
                    contract_id = %slice.contract_id,
                    rows = updated,
                    "Invoice date realigned on existing slices"
                );
            }
        }

        let row = NewTimeSliceRow {
            contract_id: &slice.contract_id,
            top_article_id,
            validity_tag: &slice.validity_tag,
            invoice_date: slice.invoice_date,
            created_at: next_created_at(latest.as_ref(), now),
        };
        let id = time_slices::insert_time_slice(&mut tx, &row).await?;

        Ok(Some(Staged {
            tx,
            id,
            top_article_id,
        }))
    }
}

/// A fully written, uncommitted slice
struct Staged {
    tx: Transaction<'static, Sqlite>,
    id: TimeSliceId,
    top_article_id: i64,
}

/// Existing slices take the incoming invoice date when it falls on a
/// different calendar day than the newest stored one
pub fn needs_backfill(latest: &DateTime<Utc>, incoming: &DateTime<Utc>) -> bool {
    !time::same_calendar_day(latest, incoming)
}

/// Creation time for the next slice: `now` at storage precision, bumped past
/// the contract's newest slice when the clock has not advanced beyond it
fn next_created_at(latest: Option<&LatestSlice>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match latest {
        Some(previous) if previous.created_at >= now => {
            previous.created_at + ChronoDuration::microseconds(1)
        }
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contract_common::config::DatabaseConfig;
    use contract_common::db::init_database;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn request(contract_id: &str, article_ids: &[i64], invoice_date: DateTime<Utc>) -> NewTimeSlice {
        NewTimeSlice {
            contract_id: contract_id.to_string(),
            article_ids: article_ids.to_vec(),
            validity_tag: "A".to_string(),
            invoice_date,
        }
    }

    async fn setup() -> (TempDir, SqlitePool, TimeSliceEngine) {
        let temp_dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", temp_dir.path().join("engine.db").display());
        let pool = init_database(&url, &DatabaseConfig::default()).await.unwrap();
        let engine = TimeSliceEngine::new(pool.clone());
        (temp_dir, pool, engine)
    }

    fn created(outcome: CreateOutcome) -> TimeSliceId {
        match outcome {
            CreateOutcome::Created(id) => id,
            other => panic!("expected Created, got {:?}", other),
        }
    }

    #[test]
    fn test_needs_backfill_compares_calendar_days() {
        let day = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let same_day_later = Utc.with_ymd_and_hms(2024, 1, 10, 22, 15, 0).unwrap();
        assert!(!needs_backfill(&day, &same_day_later));
        assert!(needs_backfill(&day, &date(2024, 2, 1)));
        assert!(needs_backfill(&date(2024, 2, 1), &day));
    }

    #[test]
    fn test_next_created_at_uses_now_when_clock_advanced() {
        let now = date(2024, 1, 10) + ChronoDuration::milliseconds(5);
        let latest = LatestSlice {
            invoice_date: date(2024, 1, 10),
            created_at: date(2024, 1, 10),
        };
        assert_eq!(next_created_at(Some(&latest), now), now);
        assert_eq!(next_created_at(None, now), now);
    }

    #[test]
    fn test_next_created_at_bumps_past_latest() {
        let now = date(2024, 1, 10);
        let latest = LatestSlice {
            invoice_date: now,
            created_at: now + ChronoDuration::seconds(3),
        };
        let next = next_created_at(Some(&latest), now);
        assert_eq!(next, latest.created_at + ChronoDuration::microseconds(1));
    }

    #[test]
    fn test_next_created_at_truncates_to_micros() {
        let now = date(2024, 1, 10) + ChronoDuration::nanoseconds(1_500);
        let next = next_created_at(None, now);
        assert_eq!(next, date(2024, 1, 10) + ChronoDuration::microseconds(1));
    }

    #[tokio::test]
    async fn test_first_create_picks_highest() {
        let (_dir, pool, engine) = setup().await;

        let id = created(engine.create_time_slice(&request("C1", &[5, 3, 9], date(2024, 1, 10))).await);

        let top: i64 = sqlx::query_scalar("SELECT top_article_id FROM time_slices WHERE id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(top, 9);
    }

    #[tokio::test]
    async fn test_rejection_writes_nothing() {
        let (_dir, pool, engine) = setup().await;
        created(engine.create_time_slice(&request("C1", &[9], date(2024, 1, 10))).await);

        for _ in 0..3 {
            let outcome = engine
                .create_time_slice(&request("C1", &[9, 9], date(2024, 3, 1)))
                .await;
            assert!(matches!(outcome, CreateOutcome::AllArticlesKnown), "got {:?}", outcome);
        }

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT top_article_id, invoice_date FROM time_slices WHERE contract_id = 'C1'")
                .fetch_all(&pool)
                .await
                .unwrap();
        // Rejected calls neither insert nor back-fill
        assert_eq!(rows, vec![(9, "2024-01-10T00:00:00.000000Z".to_string())]);

        let locks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contract_locks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(locks, 1, "only the successful create leaves a lock row");
    }

    #[tokio::test]
    async fn test_backfill_on_new_day() {
        let (_dir, pool, engine) = setup().await;
        for id in [1, 2, 3] {
            created(engine.create_time_slice(&request("C1", &[id], date(2024, 1, 10))).await);
        }
        created(engine.create_time_slice(&request("C1", &[4], date(2024, 2, 1))).await);

        let dates: Vec<String> =
            sqlx::query_scalar("SELECT invoice_date FROM time_slices WHERE contract_id = 'C1'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(dates.len(), 4);
        assert!(dates.iter().all(|d| d == "2024-02-01T00:00:00.000000Z"), "{:?}", dates);
    }

    #[tokio::test]
    async fn test_same_day_keeps_existing_dates() {
        let (_dir, pool, engine) = setup().await;
        let morning = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 1, 10, 20, 0, 0).unwrap();

        created(engine.create_time_slice(&request("C1", &[1], morning)).await);
        created(engine.create_time_slice(&request("C1", &[2], evening)).await);

        let dates: Vec<(i64, String)> = sqlx::query_as(
            "SELECT top_article_id, invoice_date FROM time_slices WHERE contract_id = 'C1' ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(
            dates,
            vec![
                (1, "2024-01-10T08:00:00.000000Z".to_string()),
                (2, "2024-01-10T20:00:00.000000Z".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_backfill_is_scoped_to_contract() {
        let (_dir, pool, engine) = setup().await;
        created(engine.create_time_slice(&request("C1", &[1], date(2024, 1, 10))).await);
        created(engine.create_time_slice(&request("C2", &[1], date(2024, 1, 10))).await);
        created(engine.create_time_slice(&request("C1", &[2], date(2024, 2, 1))).await);

        let other: String =
            sqlx::query_scalar("SELECT invoice_date FROM time_slices WHERE contract_id = 'C2'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(other, "2024-01-10T00:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_sequential_creates_are_ordered() {
        let (_dir, pool, engine) = setup().await;
        let first = created(engine.create_time_slice(&request("C1", &[1], date(2024, 1, 10))).await);
        let second = created(engine.create_time_slice(&request("C1", &[2], date(2024, 1, 10))).await);
        assert!(second > first);

        let stamps: Vec<String> =
            sqlx::query_scalar("SELECT created_at FROM time_slices WHERE contract_id = 'C1' ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(stamps[1] > stamps[0], "created_at must strictly increase: {:?}", stamps);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let (_dir, pool, engine) = setup().await;
        sqlx::query("DROP TABLE time_slices").execute(&pool).await.unwrap();

        let outcome = engine.create_time_slice(&request("C1", &[1], date(2024, 1, 10))).await;
        assert!(matches!(outcome, CreateOutcome::Failed(Error::Database(_))), "got {:?}", outcome);
    }

    #[tokio::test]
    async fn test_expired_deadline_rolls_back() {
        let (_dir, pool, engine) = setup().await;

        // Hold the write lock from another transaction
        let mut blocker = pool.begin().await.unwrap();
        time_slices::lock_contract(&mut blocker, "C1", &time::now()).await.unwrap();

        let outcome = engine
            .create_time_slice_within(
                &request("C1", &[1], date(2024, 1, 10)),
                Duration::from_millis(200),
            )
            .await;
        assert!(matches!(outcome, CreateOutcome::Failed(Error::Internal(_))), "got {:?}", outcome);

        blocker.rollback().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM time_slices")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "abandoned create must not commit");

        created(engine.create_time_slice(&request("C1", &[1], date(2024, 1, 10))).await);
    }

    #[tokio::test]
    async fn test_deadline_outcome_matches_store() {
        let (_dir, pool, engine) = setup().await;

        // Deadlines short enough to expire at any step; whatever is reported
        // must agree with what was committed
        let mut committed = 0;
        for (n, micros) in [0u64, 1, 10, 50, 100, 250, 500, 1_000, 5_000, 50_000]
            .into_iter()
            .enumerate()
        {
            let outcome = engine
                .create_time_slice_within(
                    &request("C1", &[n as i64 + 1], date(2024, 1, 10)),
                    Duration::from_micros(micros),
                )
                .await;

            let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM time_slices")
                .fetch_one(&pool)
                .await
                .unwrap();
            match outcome {
                CreateOutcome::Created(_) => committed += 1,
                CreateOutcome::Failed(_) => {}
                CreateOutcome::AllArticlesKnown => panic!("article {} was new", n + 1),
            }
            assert_eq!(stored, committed, "deadline {}us reported {:?}", micros, outcome);
        }
    }
}
