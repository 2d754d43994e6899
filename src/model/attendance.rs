use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::checkpoint::Checkpoint;
use super::status::Status;

/// One stored attendance row. At most one row exists per
/// (person_id, program_name, date, checkpoint_id); a missing row means the
/// camper is unmarked for that checkpoint.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub person_id: String,
    pub program_name: String,
    pub week: i64,
    pub date: NaiveDate,
    pub checkpoint_id: i64,
    pub status: String,
    pub recorded_by: String,
    pub recorded_at: NaiveDateTime,
    pub notes: Option<String>,
}

/// Upsert payload for a single attendance write.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub person_id: String,
    pub program_name: String,
    pub week: i64,
    pub date: NaiveDate,
    pub checkpoint: Checkpoint,
    pub status: Status,
    pub recorded_by: String,
    pub notes: Option<String>,
}
