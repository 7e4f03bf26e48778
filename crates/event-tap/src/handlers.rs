//! Subscriber registry with per-handler failure isolation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::metrics::TapMetrics;
use crate::model::EventRecord;

/// Subscriber invoked once per committed record.
pub type RecordHandler = Arc<dyn Fn(&EventRecord) + Send + Sync + 'static>;

/// Insertion-ordered handler set, deduplicated by callback identity.
#[derive(Default)]
pub(crate) struct HandlerSet {
    entries: RwLock<Vec<RecordHandler>>,
}

impl HandlerSet {
    /// Adds `handler` unless that exact callback is already present.
    pub fn add(&self, handler: RecordHandler) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
            return false;
        }
        entries.push(handler);
        true
    }

    pub fn remove(&self, handler: &RecordHandler) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|existing| !Arc::ptr_eq(existing, handler));
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Fans `record` out to a snapshot of the current handlers.
    ///
    /// Handlers run outside the set's lock, so a handler may add or remove
    /// handlers without deadlocking; membership changes take effect from the
    /// next record. A panicking handler is logged and counted while the
    /// remaining handlers still run.
    pub fn emit(&self, record: &EventRecord, metrics: &TapMetrics) {
        let snapshot: Vec<RecordHandler> = self.entries.read().iter().cloned().collect();
        for handler in snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| (handler)(record))).is_err() {
                metrics.record_handler_failure();
                warn!(
                    target: "event-tap",
                    event_type = %record.event_type,
                    "record handler panicked; continuing fan-out"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventPhase;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_record() -> EventRecord {
        EventRecord {
            event_type: "click".into(),
            target: "button#go".into(),
            ts_mono: 7,
            ts_wall: Utc::now(),
            duration_us: Some(2),
            phase: EventPhase::Bubbling,
            bubbles: true,
            cancelled: false,
            synthetic: false,
        }
    }

    #[test]
    fn duplicate_handlers_are_rejected() {
        let set = HandlerSet::default();
        let handler: RecordHandler = Arc::new(|_record| {});
        assert!(set.add(Arc::clone(&handler)));
        assert!(!set.add(Arc::clone(&handler)));
        assert_eq!(set.len(), 1);

        assert!(set.remove(&handler));
        assert!(!set.remove(&handler));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn emit_reaches_every_handler() {
        let set = HandlerSet::default();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            set.add(Arc::new(move |_record| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        set.emit(&sample_record(), &TapMetrics::default());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn panicking_handler_does_not_stop_fan_out() {
        let set = HandlerSet::default();
        let hits = Arc::new(AtomicUsize::new(0));

        set.add(Arc::new(|_record| panic!("subscriber bug")));
        let counted = Arc::clone(&hits);
        set.add(Arc::new(move |_record| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        let metrics = TapMetrics::default();
        set.emit(&sample_record(), &metrics);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().handler_failures, 1);
    }

    #[test]
    fn handler_may_mutate_the_set_during_emit() {
        let set = Arc::new(HandlerSet::default());
        let set_ref = Arc::clone(&set);
        let added = Arc::new(AtomicUsize::new(0));
        let added_ref = Arc::clone(&added);

        set.add(Arc::new(move |_record| {
            let inner = Arc::clone(&added_ref);
            set_ref.add(Arc::new(move |_record| {
                inner.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        let metrics = TapMetrics::default();
        set.emit(&sample_record(), &metrics);
        // The handler added during emit only sees the next record.
        assert_eq!(added.load(Ordering::SeqCst), 0);
        set.emit(&sample_record(), &metrics);
        assert!(added.load(Ordering::SeqCst) >= 1);
    }
}
