//! Per-event-type coalescing of high-frequency bursts.

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::classify::{ClassifyJob, TapCore};

/// One pending deferred classification per event type.
///
/// Slot presence is the whole state machine: while a slot exists the type is
/// inside its coalescing window and further occurrences are discarded, so a
/// burst yields exactly one record and it reflects the first occurrence.
pub(crate) struct ThrottleGate {
    interval: Duration,
    runtime: Handle,
    slots: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl ThrottleGate {
    pub fn new(interval_ms: u64, runtime: Handle) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            runtime,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Schedules deferred classification for `job` unless its type already
    /// has a pending slot. Returns false when the event was discarded.
    pub fn submit(&self, core: Weak<TapCore>, job: ClassifyJob) -> bool {
        let mut slots = self.slots.lock();
        if slots.contains_key(job.event_type()) {
            return false;
        }

        let event_type = job.event_type().to_owned();
        let interval = self.interval;
        let slot_key = event_type.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(core) = core.upgrade() {
                core.finish_deferred(&slot_key, job);
            }
        });
        slots.insert(event_type, task);
        true
    }

    /// Clears the slot for `event_type` after its deferred work ran.
    pub fn release(&self, event_type: &str) {
        if self.slots.lock().remove(event_type).is_some() {
            trace!(target: "event-tap", event_type, "throttle window closed");
        }
    }

    /// Aborts every pending deferred classification. Teardown only.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(String, JoinHandle<()>)> = {
            let mut slots = self.slots.lock();
            slots.drain().collect()
        };
        let cancelled = drained.len();
        for (event_type, task) in drained {
            task.abort();
            trace!(target: "event-tap", event_type = %event_type, "pending throttle slot cancelled");
        }
        cancelled
    }

    /// Number of event types currently inside a coalescing window.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.slots.lock().len()
    }
}
