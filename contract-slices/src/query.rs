//! Time slice listing

use contract_common::Result;
use sqlx::SqlitePool;

use crate::db::time_slices;
use crate::models::TimeSlice;

/// Reads time slices; every call goes to the store
#[derive(Clone)]
pub struct TimeSliceQuery {
    pool: SqlitePool,
}

impl TimeSliceQuery {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All slices for a contract, newest first. An unknown contract yields
    /// an empty list, not an error.
    pub async fn list_time_slices(&self, contract_id: &str) -> Result<Vec<TimeSlice>> {
        time_slices::list_for_contract(&self.pool, contract_id).await
    }
}
