//! Data access for the time_slices table
//!
//! Write-path functions take a `SqliteConnection` so they can run inside the
//! engine's transaction; the read-only listing runs on the pool.

pub mod time_slices;

pub use time_slices::{
    backfill_invoice_date, insert_time_slice, known_article_ids, latest_slice,
    list_for_contract, lock_contract, LatestSlice, NewTimeSliceRow,
};
