//! Persistence contract for attendance records.
//!
//! Writes are per-key atomic upserts with last-write-wins semantics; two
//! staff marking the same camper resolve by timestamp with no merge. That is
//! an accepted limitation for a single-camp, low-contention deployment.

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;

use crate::model::attendance::{AttendanceRecord, NewRecord};
use crate::model::checkpoint::Checkpoint;
use crate::model::status::Status;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "store unavailable: {}", _0)]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Shared fields of a bulk write; the per-camper part is the id list.
#[derive(Debug, Clone)]
pub struct BulkWrite {
    pub program_name: String,
    pub week: i64,
    pub date: NaiveDate,
    pub checkpoint: Checkpoint,
    pub status: Status,
    pub recorded_by: String,
}

/// One aggregate row for the admin summary view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusCount {
    pub program_name: String,
    pub checkpoint_id: i64,
    pub status: String,
    pub count: i64,
}

/// The record store the attendance core writes through.
///
/// `put` with `Status::Unmarked` removes the row (a missing row *is*
/// unmarked); every other status upserts. `reset` is the only bulk delete.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Per-checkpoint statuses for one camper on one day.
    async fn day(
        &self,
        person_id: &str,
        program: &str,
        date: NaiveDate,
    ) -> Result<HashMap<Checkpoint, Status>, StoreError>;

    /// Per-checkpoint statuses for every marked camper of a program/day.
    async fn program_day(
        &self,
        program: &str,
        date: NaiveDate,
    ) -> Result<HashMap<String, HashMap<Checkpoint, Status>>, StoreError>;

    /// Full rows for a program/day, for the admin detail view.
    async fn records_for(
        &self,
        program: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Idempotent per-key upsert, last-write-wins.
    async fn put(&self, record: &NewRecord) -> Result<(), StoreError>;

    /// One status for many campers as a single operation; returns the number
    /// of records written.
    async fn bulk_put(&self, person_ids: &[String], write: &BulkWrite) -> Result<u64, StoreError>;

    /// Clear all records for a program/date; returns the deleted count.
    async fn reset(&self, program: &str, date: NaiveDate) -> Result<u64, StoreError>;

    /// Status counts grouped by program and checkpoint for one date.
    async fn counts_for_date(&self, date: NaiveDate) -> Result<Vec<StatusCount>, StoreError>;
}
