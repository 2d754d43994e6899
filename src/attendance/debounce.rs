use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::rt;

use crate::model::checkpoint::Checkpoint;

/// Debounce key: one timer per camper control, not one global timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub person_id: String,
    pub checkpoint: Checkpoint,
}

/// Per-key debounced scheduler. Scheduling on a key cancels that key's
/// pending task, so rapid repeated clicks on one control coalesce into a
/// single write while different controls stay independent and concurrently
/// in flight.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<HashMap<DebounceKey, rt::task::JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn schedule<F>(&self, key: DebounceKey, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let delay = self.delay;
        let handle = rt::spawn(async move {
            rt::time::sleep(delay).await;
            task.await;
        });
        if let Some(prev) = self.pending.lock().unwrap().insert(key, handle) {
            prev.abort();
        }
    }
}

impl Drop for Debouncer {
    // Pending writes are abandoned when the view goes away
    fn drop(&mut self) {
        for (_, handle) in self.pending.lock().unwrap().drain() {
            handle.abort();
        }
    }
}
