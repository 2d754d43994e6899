use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::attendance::{AttendanceRecord, NewRecord};
use crate::model::checkpoint::Checkpoint;
use crate::model::status::Status;

use super::{AttendanceStore, BulkWrite, StatusCount, StoreError};

type Key = (String, String, NaiveDate, i64);

/// In-memory record store used by the session and unit tests. Keeps a write
/// log so tests can assert exactly which writes reached persistence, and can
/// be switched into a failing mode to exercise rollback paths.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Key, Status>>,
    log: Mutex<Vec<NewRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make every subsequent write fail, simulating a transport failure.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn write_log(&self) -> Vec<NewRecord> {
        self.log.lock().unwrap().clone()
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn key(record: &NewRecord) -> Key {
        (
            record.person_id.clone(),
            record.program_name.clone(),
            record.date,
            record.checkpoint.id(),
        )
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn day(
        &self,
        person_id: &str,
        program: &str,
        date: NaiveDate,
    ) -> Result<HashMap<Checkpoint, Status>, StoreError> {
        Ok(self
            .program_day(program, date)
            .await?
            .remove(person_id)
            .unwrap_or_default())
    }

    async fn program_day(
        &self,
        program: &str,
        date: NaiveDate,
    ) -> Result<HashMap<String, HashMap<Checkpoint, Status>>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut by_person: HashMap<String, HashMap<Checkpoint, Status>> = HashMap::new();
        for ((person, prog, d, checkpoint_id), status) in records.iter() {
            if prog == program && *d == date {
                if let Some(cp) = Checkpoint::from_id(*checkpoint_id) {
                    by_person.entry(person.clone()).or_default().insert(cp, *status);
                }
            }
        }
        Ok(by_person)
    }

    async fn records_for(
        &self,
        _program: &str,
        _date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        // The session never reads full rows; only the SQLite store serves the
        // admin detail view.
        Ok(Vec::new())
    }

    async fn put(&self, record: &NewRecord) -> Result<(), StoreError> {
        self.check_up()?;
        self.log.lock().unwrap().push(record.clone());
        let mut records = self.records.lock().unwrap();
        if record.status == Status::Unmarked {
            records.remove(&Self::key(record));
        } else {
            records.insert(Self::key(record), record.status);
        }
        Ok(())
    }

    async fn bulk_put(&self, person_ids: &[String], write: &BulkWrite) -> Result<u64, StoreError> {
        self.check_up()?;
        // Bulk unmark reports rows actually removed, matching the SQLite store
        let mut removed = 0u64;
        for person_id in person_ids {
            let record = NewRecord {
                person_id: person_id.clone(),
                program_name: write.program_name.clone(),
                week: write.week,
                date: write.date,
                checkpoint: write.checkpoint,
                status: write.status,
                recorded_by: write.recorded_by.clone(),
                notes: None,
            };
            self.log.lock().unwrap().push(record.clone());
            let mut records = self.records.lock().unwrap();
            if record.status == Status::Unmarked {
                if records.remove(&Self::key(&record)).is_some() {
                    removed += 1;
                }
            } else {
                records.insert(Self::key(&record), record.status);
            }
        }
        if write.status == Status::Unmarked {
            Ok(removed)
        } else {
            Ok(person_ids.len() as u64)
        }
    }

    async fn reset(&self, program: &str, date: NaiveDate) -> Result<u64, StoreError> {
        self.check_up()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|(_, prog, d, _), _| !(prog == program && *d == date));
        Ok((before - records.len()) as u64)
    }

    async fn counts_for_date(&self, date: NaiveDate) -> Result<Vec<StatusCount>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut grouped: HashMap<(String, i64, String), i64> = HashMap::new();
        for ((_, prog, d, checkpoint_id), status) in records.iter() {
            if *d == date {
                *grouped
                    .entry((prog.clone(), *checkpoint_id, status.to_string()))
                    .or_default() += 1;
            }
        }
        Ok(grouped
            .into_iter()
            .map(|((program_name, checkpoint_id, status), count)| StatusCount {
                program_name,
                checkpoint_id,
                status,
                count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn bulk_unmark_counts_only_existing_rows() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 6, 16).unwrap();
        let ids: Vec<String> = ["p1", "p2", "p3"].iter().map(|s| s.to_string()).collect();

        let mut write = BulkWrite {
            program_name: "Trailblazers".to_string(),
            week: 2,
            date,
            checkpoint: Checkpoint::Daily,
            status: Status::Present,
            recorded_by: "leader1".to_string(),
        };
        assert_eq!(store.bulk_put(&ids[..2], &write).await.unwrap(), 2);

        // p3 has no row, so unmarking all three removes two
        write.status = Status::Unmarked;
        assert_eq!(store.bulk_put(&ids, &write).await.unwrap(), 2);
        assert!(store.program_day("Trailblazers", date).await.unwrap().is_empty());
    }
}
