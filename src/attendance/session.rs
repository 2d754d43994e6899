//! Optimistic attendance session for one program/date view.
//!
//! Every staff action mutates the in-memory view first, then pushes the
//! resulting record writes through a per-key debounce window to the store.
//! A failed write rolls back exactly the affected camper's checkpoints and
//! surfaces a failure event; it is never retried automatically. Bulk
//! operations and the admin override cycle skip the debounce and write
//! immediately.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::model::attendance::NewRecord;
use crate::model::camper::RosterEntry;
use crate::model::checkpoint::Checkpoint;
use crate::model::status::Status;
use crate::schedule;
use crate::store::{AttendanceStore, BulkWrite};

use super::debounce::{DebounceKey, Debouncer};
use super::error::AttendanceError;
use super::lock;
use super::rules::{self, CamperDay, DisplayState, RecordWrite};

/// Result of a write that completed after its debounce window.
#[derive(Debug)]
pub struct WriteOutcome {
    pub person_id: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub lock_hour: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            debounce: Duration::from_millis(300),
            lock_hour: lock::DEFAULT_LOCK_HOUR,
        }
    }
}

/// Explicit view state for one program/date: the camper day-map, the lock
/// rule, and the pending debounced writes. No hidden globals, so the
/// reconciliation rules test without any UI attached.
pub struct AttendanceSession<S: AttendanceStore + 'static> {
    store: Arc<S>,
    program: String,
    date: NaiveDate,
    week: i64,
    recorded_by: String,
    lock_hour: u32,
    state: Arc<Mutex<HashMap<String, CamperDay>>>,
    debouncer: Debouncer,
    outcomes: UnboundedSender<WriteOutcome>,
    outcome_rx: Mutex<Option<UnboundedReceiver<WriteOutcome>>>,
}

impl<S: AttendanceStore + 'static> AttendanceSession<S> {
    pub fn new(
        store: Arc<S>,
        program: impl Into<String>,
        date: NaiveDate,
        recorded_by: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        let (tx, rx) = unbounded();
        AttendanceSession {
            store,
            program: program.into(),
            date,
            week: schedule::record_week(date),
            recorded_by: recorded_by.into(),
            lock_hour: config.lock_hour,
            state: Arc::new(Mutex::new(HashMap::new())),
            debouncer: Debouncer::new(config.debounce),
            outcomes: tx,
            outcome_rx: Mutex::new(Some(rx)),
        }
    }

    /// Replace the view wholesale from the roster and the store. The roster
    /// is the authoritative camper list; stored records fill in statuses.
    pub async fn load(&self, roster: &[RosterEntry]) -> Result<(), AttendanceError> {
        let by_person = self.store.program_day(&self.program, self.date).await?;
        let mut state = self.state.lock().unwrap();
        state.clear();
        for entry in roster {
            let day = by_person
                .get(&entry.person_id)
                .map(CamperDay::from_statuses)
                .unwrap_or_default();
            state.insert(entry.person_id.clone(), day);
        }
        Ok(())
    }

    /// Receiver for write outcomes; the view layer drains this to show
    /// failure toasts. Can be taken once.
    pub fn take_outcomes(&self) -> Option<UnboundedReceiver<WriteOutcome>> {
        self.outcome_rx.lock().unwrap().take()
    }

    pub fn day_of(&self, person_id: &str) -> CamperDay {
        self.state
            .lock()
            .unwrap()
            .get(person_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn display_of(&self, person_id: &str) -> DisplayState {
        DisplayState::of(self.day_of(person_id))
    }

    pub fn is_locked_now(&self) -> bool {
        lock::is_locked(self.date, Local::now().naive_local(), self.lock_hour)
    }

    fn check_lock(&self) -> Result<(), AttendanceError> {
        lock::ensure_unlocked(self.date, Local::now().naive_local(), self.lock_hour)
    }

    fn record_for(&self, person_id: &str, write: RecordWrite) -> NewRecord {
        NewRecord {
            person_id: person_id.to_string(),
            program_name: self.program.clone(),
            week: self.week,
            date: self.date,
            checkpoint: write.checkpoint,
            status: write.status,
            recorded_by: self.recorded_by.clone(),
            notes: None,
        }
    }

    fn apply_local(&self, person_id: &str, writes: &[RecordWrite]) {
        let mut state = self.state.lock().unwrap();
        let entry = state.entry(person_id.to_string()).or_default();
        *entry = entry.apply(writes);
    }

    /// Queue a debounced write-through for one camper action. The snapshot
    /// holds the prior status of exactly the touched checkpoints, so a
    /// rollback never clobbers an unrelated in-flight control.
    fn queue(&self, person_id: &str, prior: CamperDay, writes: Vec<RecordWrite>) {
        let rollback: Vec<RecordWrite> = writes
            .iter()
            .map(|w| RecordWrite::new(w.checkpoint, prior.status_of(w.checkpoint)))
            .collect();
        let records: Vec<NewRecord> = writes.iter().map(|w| self.record_for(person_id, *w)).collect();

        let key = DebounceKey {
            person_id: person_id.to_string(),
            checkpoint: writes[0].checkpoint,
        };
        let store = self.store.clone();
        let state = self.state.clone();
        let outcomes = self.outcomes.clone();
        let person = person_id.to_string();

        self.debouncer.schedule(key, async move {
            let mut failure = None;
            for record in &records {
                if let Err(e) = store.put(record).await {
                    failure = Some(e.to_string());
                    break;
                }
            }
            if let Some(error) = failure {
                // Revert only this action's checkpoints
                {
                    let mut state = state.lock().unwrap();
                    let entry = state.entry(person.clone()).or_default();
                    *entry = entry.apply(&rollback);
                }
                tracing::warn!(person_id = %person, error = %error, "Attendance write failed, rolled back");
                let _ = outcomes.unbounded_send(WriteOutcome {
                    person_id: person,
                    ok: false,
                    error: Some(error),
                });
            } else {
                let _ = outcomes.unbounded_send(WriteOutcome {
                    person_id: person,
                    ok: true,
                    error: None,
                });
            }
        });
    }

    /// Staff click on a daily-status button (present/absent/late), with
    /// toggle-off and the absence cascade.
    pub fn set_primary(&self, person_id: &str, requested: Status) -> Result<(), AttendanceError> {
        self.check_lock()?;
        let prior = self.day_of(person_id);
        let writes = rules::primary_transition(prior, requested)?;
        self.apply_local(person_id, &writes);
        self.queue(person_id, prior, writes);
        Ok(())
    }

    /// Staff click on the early-pickup toggle. A precondition failure makes
    /// no network call at all.
    pub fn toggle_early_pickup(&self, person_id: &str) -> Result<(), AttendanceError> {
        self.check_lock()?;
        let prior = self.day_of(person_id);
        let writes = rules::early_pickup_toggle(prior)?;
        self.apply_local(person_id, &writes);
        self.queue(person_id, prior, writes);
        Ok(())
    }

    /// Staff click on a KC before/after toggle.
    pub fn toggle_kc(&self, person_id: &str, which: Checkpoint) -> Result<(), AttendanceError> {
        self.check_lock()?;
        let prior = self.day_of(person_id);
        let writes = rules::kc_toggle(prior, which)?;
        self.apply_local(person_id, &writes);
        self.queue(person_id, prior, writes);
        Ok(())
    }

    /// Mark every camper not already at `status`; one network operation.
    /// Returns the number of campers affected.
    pub async fn mark_all(&self, status: Status) -> Result<u64, AttendanceError> {
        self.check_lock()?;
        if !status.valid_for_daily() {
            return Err(AttendanceError::validation(format!(
                "'{}' is not a valid daily status",
                status
            )));
        }

        let targets: Vec<String> = {
            let state = self.state.lock().unwrap();
            state
                .iter()
                .filter(|(_, day)| day.primary != status)
                .map(|(person, _)| person.clone())
                .collect()
        };
        if targets.is_empty() {
            return Ok(0);
        }

        let snapshot = self.snapshot(&targets);
        let writes = [RecordWrite::new(Checkpoint::Daily, status)];
        for person in &targets {
            self.apply_local(person, &writes);
        }

        match self.store.bulk_put(&targets, &self.bulk(Checkpoint::Daily, status)).await {
            Ok(count) => Ok(count),
            Err(e) => {
                self.restore(snapshot);
                Err(e.into())
            }
        }
    }

    /// Clear every marked camper back to unmarked, then clear their
    /// early-pickup flags in a second bulk call. KC state is untouched.
    pub async fn unmark_all(&self) -> Result<u64, AttendanceError> {
        self.check_lock()?;

        let targets: Vec<String> = {
            let state = self.state.lock().unwrap();
            state
                .iter()
                .filter(|(_, day)| day.primary != Status::Unmarked || day.early_pickup)
                .map(|(person, _)| person.clone())
                .collect()
        };
        if targets.is_empty() {
            return Ok(0);
        }

        let snapshot = self.snapshot(&targets);
        {
            let mut state = self.state.lock().unwrap();
            for person in &targets {
                if let Some(day) = state.get_mut(person) {
                    day.primary = Status::Unmarked;
                    day.early_pickup = false;
                }
            }
        }

        let daily = self
            .store
            .bulk_put(&targets, &self.bulk(Checkpoint::Daily, Status::Unmarked))
            .await;
        let cleared = match daily {
            Ok(count) => count,
            Err(e) => {
                self.restore(snapshot);
                return Err(e.into());
            }
        };
        if let Err(e) = self
            .store
            .bulk_put(&targets, &self.bulk(Checkpoint::EarlyPickup, Status::Unmarked))
            .await
        {
            self.restore(snapshot);
            return Err(e.into());
        }
        Ok(cleared)
    }

    /// Admin override: advance one camper through the fixed status cycle.
    /// Written immediately; a failure reverts exactly one step.
    pub async fn admin_cycle(&self, person_id: &str) -> Result<DisplayState, AttendanceError> {
        self.check_lock()?;
        let prior = self.day_of(person_id);
        let writes = rules::cycle_writes(prior);
        self.apply_local(person_id, &writes);

        for write in &writes {
            if let Err(e) = self.store.put(&self.record_for(person_id, *write)).await {
                let mut state = self.state.lock().unwrap();
                state.insert(person_id.to_string(), prior);
                return Err(e.into());
            }
        }
        Ok(self.display_of(person_id))
    }

    fn bulk(&self, checkpoint: Checkpoint, status: Status) -> BulkWrite {
        BulkWrite {
            program_name: self.program.clone(),
            week: self.week,
            date: self.date,
            checkpoint,
            status,
            recorded_by: self.recorded_by.clone(),
        }
    }

    fn snapshot(&self, person_ids: &[String]) -> Vec<(String, CamperDay)> {
        let state = self.state.lock().unwrap();
        person_ids
            .iter()
            .map(|p| (p.clone(), state.get(p).copied().unwrap_or_default()))
            .collect()
    }

    fn restore(&self, snapshot: Vec<(String, CamperDay)>) {
        let mut state = self.state.lock().unwrap();
        for (person, day) in snapshot {
            state.insert(person, day);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use actix_web::rt;
    use chrono::Duration as ChronoDuration;

    fn roster(n: usize) -> Vec<RosterEntry> {
        (1..=n)
            .map(|i| RosterEntry {
                person_id: format!("p{}", i),
                name: format!("Camper {}", i),
                has_kc: i % 2 == 0,
            })
            .collect()
    }

    fn open_date() -> NaiveDate {
        // A week out is never locked
        Local::now().date_naive() + ChronoDuration::days(7)
    }

    fn session(store: Arc<MemoryStore>, date: NaiveDate) -> AttendanceSession<MemoryStore> {
        AttendanceSession::new(
            store,
            "Trailblazers",
            date,
            "leader1",
            SessionConfig {
                debounce: Duration::from_millis(15),
                ..SessionConfig::default()
            },
        )
    }

    async fn settle() {
        rt::time::sleep(Duration::from_millis(60)).await;
    }

    #[actix_web::test]
    async fn optimistic_apply_then_debounced_write() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(2)).await.unwrap();

        session.set_primary("p1", Status::Present).unwrap();
        // Visible immediately, persisted only after the debounce window
        assert_eq!(session.day_of("p1").primary, Status::Present);
        assert_eq!(store.write_count(), 0);

        settle().await;
        assert_eq!(store.write_count(), 1);
        let day = store.day("p1", "Trailblazers", open_date()).await.unwrap();
        assert_eq!(day[&Checkpoint::Daily], Status::Present);
    }

    #[actix_web::test]
    async fn rapid_clicks_coalesce_into_one_write() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(1)).await.unwrap();

        session.set_primary("p1", Status::Present).unwrap();
        session.set_primary("p1", Status::Late).unwrap();

        settle().await;
        let log = store.write_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, Status::Late);
        assert_eq!(session.day_of("p1").primary, Status::Late);
    }

    #[actix_web::test]
    async fn toggle_off_marks_absent_and_clears_early_pickup() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(1)).await.unwrap();

        session.set_primary("p1", Status::Present).unwrap();
        settle().await;
        session.toggle_early_pickup("p1").unwrap();
        settle().await;
        assert!(session.day_of("p1").early_pickup);

        // Clicking present again toggles off
        session.set_primary("p1", Status::Present).unwrap();
        let day = session.day_of("p1");
        assert_eq!(day.primary, Status::Absent);
        assert!(!day.early_pickup);

        settle().await;
        let stored = store.day("p1", "Trailblazers", open_date()).await.unwrap();
        assert_eq!(stored[&Checkpoint::Daily], Status::Absent);
        assert_eq!(stored[&Checkpoint::EarlyPickup], Status::Absent);
    }

    #[actix_web::test]
    async fn absence_issues_two_writes_when_early_pickup_set() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(1)).await.unwrap();

        session.set_primary("p1", Status::Present).unwrap();
        settle().await;
        session.toggle_early_pickup("p1").unwrap();
        settle().await;
        let before = store.write_count();

        session.set_primary("p1", Status::Absent).unwrap();
        settle().await;
        assert_eq!(store.write_count() - before, 2);
        let stored = store.day("p1", "Trailblazers", open_date()).await.unwrap();
        assert_eq!(stored[&Checkpoint::Daily], Status::Absent);
        assert_eq!(stored[&Checkpoint::EarlyPickup], Status::Absent);
    }

    #[actix_web::test]
    async fn early_pickup_precondition_makes_no_network_call() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(1)).await.unwrap();

        session.set_primary("p1", Status::Absent).unwrap();
        settle().await;
        let before = store.write_count();

        let err = session.toggle_early_pickup("p1").unwrap_err();
        assert!(matches!(err, AttendanceError::Precondition { .. }));
        settle().await;
        assert_eq!(store.write_count(), before);
        assert!(!session.day_of("p1").early_pickup);
    }

    #[actix_web::test]
    async fn kc_toggles_do_not_touch_other_checkpoints() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(2)).await.unwrap();

        session.toggle_kc("p2", Checkpoint::KcBefore).unwrap();
        session.toggle_kc("p2", Checkpoint::KcAfter).unwrap();
        settle().await;

        let day = session.day_of("p2");
        assert!(day.kc_before);
        assert!(day.kc_after);
        assert_eq!(day.primary, Status::Unmarked);

        session.toggle_kc("p2", Checkpoint::KcAfter).unwrap();
        settle().await;
        let stored = store.day("p2", "Trailblazers", open_date()).await.unwrap();
        assert_eq!(stored[&Checkpoint::KcBefore], Status::Present);
        assert_eq!(stored[&Checkpoint::KcAfter], Status::Absent);
    }

    #[actix_web::test]
    async fn failed_write_rolls_back_that_key_only() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(2)).await.unwrap();
        let mut outcomes = session.take_outcomes().unwrap();

        session.set_primary("p2", Status::Present).unwrap();
        settle().await;

        store.fail_writes(true);
        session.set_primary("p1", Status::Present).unwrap();
        assert_eq!(session.day_of("p1").primary, Status::Present);
        settle().await;

        // p1 reverted, p2 untouched, failure surfaced once
        assert_eq!(session.day_of("p1").primary, Status::Unmarked);
        assert_eq!(session.day_of("p2").primary, Status::Present);
        let ok = outcomes.try_next().unwrap().unwrap();
        assert!(ok.ok);
        let failed = outcomes.try_next().unwrap().unwrap();
        assert_eq!(failed.person_id, "p1");
        assert!(!failed.ok);
    }

    #[actix_web::test]
    async fn mark_all_skips_campers_already_at_target() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(5)).await.unwrap();

        session.set_primary("p1", Status::Present).unwrap();
        session.set_primary("p2", Status::Present).unwrap();
        settle().await;
        let before = store.write_count();

        let count = session.mark_all(Status::Present).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(store.write_count() - before, 3);
        for person in ["p1", "p2", "p3", "p4", "p5"] {
            assert_eq!(session.day_of(person).primary, Status::Present);
        }

        // Second invocation is a no-op
        assert_eq!(session.mark_all(Status::Present).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn mark_all_failure_reverts_everyone() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(3)).await.unwrap();

        store.fail_writes(true);
        let err = session.mark_all(Status::Present).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Store(_)));
        for person in ["p1", "p2", "p3"] {
            assert_eq!(session.day_of(person).primary, Status::Unmarked);
        }
    }

    #[actix_web::test]
    async fn unmark_all_clears_daily_and_early_pickup() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(3)).await.unwrap();

        session.mark_all(Status::Present).await.unwrap();
        session.toggle_early_pickup("p1").unwrap();
        settle().await;

        let cleared = session.unmark_all().await.unwrap();
        assert_eq!(cleared, 3);
        for person in ["p1", "p2", "p3"] {
            assert_eq!(session.day_of(person), CamperDay::default());
        }
        assert!(store
            .program_day("Trailblazers", open_date())
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn unmark_all_leaves_kc_state_alone() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(2)).await.unwrap();

        session.toggle_kc("p1", Checkpoint::KcBefore).unwrap();
        session.set_primary("p2", Status::Present).unwrap();
        settle().await;

        // p1 is KC-only, so only p2 has a daily/EP mark to clear
        let cleared = session.unmark_all().await.unwrap();
        assert_eq!(cleared, 1);

        assert!(session.day_of("p1").kc_before);
        assert_eq!(session.day_of("p2").primary, Status::Unmarked);
        let stored = store.day("p1", "Trailblazers", open_date()).await.unwrap();
        assert_eq!(stored[&Checkpoint::KcBefore], Status::Present);
    }

    #[actix_web::test]
    async fn admin_cycle_visits_each_state_once_and_wraps() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(1)).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(session.admin_cycle("p1").await.unwrap());
        }
        assert_eq!(
            seen,
            vec![
                DisplayState::Present,
                DisplayState::Absent,
                DisplayState::Late,
                DisplayState::EarlyPickup,
                DisplayState::Unmarked,
            ]
        );
        // Wrap removed the rows entirely
        assert!(store
            .program_day("Trailblazers", open_date())
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn admin_cycle_failure_reverts_one_step() {
        let store = Arc::new(MemoryStore::new());
        let session = session(store.clone(), open_date());
        session.load(&roster(1)).await.unwrap();

        session.admin_cycle("p1").await.unwrap(); // -> present
        store.fail_writes(true);
        let err = session.admin_cycle("p1").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Store(_)));
        assert_eq!(session.display_of("p1"), DisplayState::Present);
    }

    #[actix_web::test]
    async fn locked_dates_reject_every_mutation() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = Local::now().date_naive() - ChronoDuration::days(1);
        let session = session(store.clone(), yesterday);
        session.load(&roster(1)).await.unwrap();

        assert!(session.is_locked_now());
        assert!(matches!(
            session.set_primary("p1", Status::Present).unwrap_err(),
            AttendanceError::LockedDay { .. }
        ));
        assert!(matches!(
            session.toggle_early_pickup("p1").unwrap_err(),
            AttendanceError::LockedDay { .. }
        ));
        assert!(matches!(
            session.mark_all(Status::Present).await.unwrap_err(),
            AttendanceError::LockedDay { .. }
        ));
        assert!(matches!(
            session.admin_cycle("p1").await.unwrap_err(),
            AttendanceError::LockedDay { .. }
        ));
        settle().await;
        assert_eq!(store.write_count(), 0);
    }
}
