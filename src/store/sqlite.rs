use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::model::attendance::{AttendanceRecord, NewRecord};
use crate::model::checkpoint::Checkpoint;
use crate::model::status::Status;

use super::{AttendanceStore, BulkWrite, StatusCount, StoreError};

/// SQLite-backed record store. The camp's whole season fits in one file; the
/// unique constraint on the identity key makes every write an upsert.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    async fn upsert(&self, record: &NewRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (person_id, program_name, week, date, checkpoint_id, status, recorded_by, recorded_at, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (person_id, program_name, date, checkpoint_id) DO UPDATE SET
                status = excluded.status,
                recorded_by = excluded.recorded_by,
                recorded_at = excluded.recorded_at,
                notes = excluded.notes
            "#,
        )
        .bind(&record.person_id)
        .bind(&record.program_name)
        .bind(record.week)
        .bind(record.date)
        .bind(record.checkpoint.id())
        .bind(record.status.to_string())
        .bind(&record.recorded_by)
        .bind(Utc::now().naive_utc())
        .bind(&record.notes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_key(&self, record: &NewRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM attendance_records
            WHERE person_id = ? AND program_name = ? AND date = ? AND checkpoint_id = ?
            "#,
        )
        .bind(&record.person_id)
        .bind(&record.program_name)
        .bind(record.date)
        .bind(record.checkpoint.id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn fold_statuses(rows: Vec<(String, i64, String)>) -> HashMap<String, HashMap<Checkpoint, Status>> {
    let mut by_person: HashMap<String, HashMap<Checkpoint, Status>> = HashMap::new();
    for (person_id, checkpoint_id, status) in rows {
        // Skip rows from retired checkpoints or unknown statuses
        let (Some(cp), Ok(status)) = (Checkpoint::from_id(checkpoint_id), Status::from_str(&status))
        else {
            continue;
        };
        by_person.entry(person_id).or_default().insert(cp, status);
    }
    by_person
}

#[async_trait]
impl AttendanceStore for SqliteStore {
    async fn day(
        &self,
        person_id: &str,
        program: &str,
        date: NaiveDate,
    ) -> Result<HashMap<Checkpoint, Status>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64, String)>(
            r#"
            SELECT person_id, checkpoint_id, status FROM attendance_records
            WHERE person_id = ? AND program_name = ? AND date = ?
            "#,
        )
        .bind(person_id)
        .bind(program)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_statuses(rows).remove(person_id).unwrap_or_default())
    }

    async fn program_day(
        &self,
        program: &str,
        date: NaiveDate,
    ) -> Result<HashMap<String, HashMap<Checkpoint, Status>>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64, String)>(
            r#"
            SELECT person_id, checkpoint_id, status FROM attendance_records
            WHERE program_name = ? AND date = ?
            "#,
        )
        .bind(program)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_statuses(rows))
    }

    async fn records_for(
        &self,
        program: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE program_name = ? AND date = ?
            ORDER BY person_id, checkpoint_id
            "#,
        )
        .bind(program)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn put(&self, record: &NewRecord) -> Result<(), StoreError> {
        if record.status == Status::Unmarked {
            self.delete_key(record).await
        } else {
            self.upsert(record).await
        }
    }

    async fn bulk_put(&self, person_ids: &[String], write: &BulkWrite) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Bulk unmark removes the rows, mirroring the single-record path
        if write.status == Status::Unmarked {
            let mut removed = 0u64;
            for person_id in person_ids {
                let result = sqlx::query(
                    r#"
                    DELETE FROM attendance_records
                    WHERE person_id = ? AND program_name = ? AND date = ? AND checkpoint_id = ?
                    "#,
                )
                .bind(person_id)
                .bind(&write.program_name)
                .bind(write.date)
                .bind(write.checkpoint.id())
                .execute(&mut *tx)
                .await?;
                removed += result.rows_affected();
            }
            tx.commit().await?;
            return Ok(removed);
        }

        let now = Utc::now().naive_utc();
        for person_id in person_ids {
            sqlx::query(
                r#"
                INSERT INTO attendance_records
                    (person_id, program_name, week, date, checkpoint_id, status, recorded_by, recorded_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (person_id, program_name, date, checkpoint_id) DO UPDATE SET
                    status = excluded.status,
                    recorded_by = excluded.recorded_by,
                    recorded_at = excluded.recorded_at
                "#,
            )
            .bind(person_id)
            .bind(&write.program_name)
            .bind(write.week)
            .bind(write.date)
            .bind(write.checkpoint.id())
            .bind(write.status.to_string())
            .bind(&write.recorded_by)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(person_ids.len() as u64)
    }

    async fn reset(&self, program: &str, date: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"DELETE FROM attendance_records WHERE program_name = ? AND date = ?"#,
        )
        .bind(program)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn counts_for_date(&self, date: NaiveDate) -> Result<Vec<StatusCount>, StoreError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT program_name, checkpoint_id, status, COUNT(*) as count
            FROM attendance_records
            WHERE date = ?
            GROUP BY program_name, checkpoint_id, status
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}
