//! Engine counters exposed as cheap snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cloneable handle over the engine's internal counters.
#[derive(Debug, Clone, Default)]
pub struct TapMetrics {
    inner: Arc<TapMetricsInner>,
}

#[derive(Debug, Default)]
struct TapMetricsInner {
    records_committed: AtomicU64,
    events_filtered: AtomicU64,
    throttle_scheduled: AtomicU64,
    throttle_discarded: AtomicU64,
    handler_failures: AtomicU64,
    history_trimmed: AtomicU64,
}

impl TapMetrics {
    pub(crate) fn record_commit(&self) {
        self.inner.records_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.inner.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_scheduled(&self) {
        self.inner.throttle_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttle_discarded(&self) {
        self.inner.throttle_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_failure(&self) {
        self.inner.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_history_trim(&self, removed: u64) {
        self.inner.history_trimmed.fetch_add(removed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TapMetricSnapshot {
        TapMetricSnapshot {
            records_committed: self.inner.records_committed.load(Ordering::Relaxed),
            events_filtered: self.inner.events_filtered.load(Ordering::Relaxed),
            throttle_scheduled: self.inner.throttle_scheduled.load(Ordering::Relaxed),
            throttle_discarded: self.inner.throttle_discarded.load(Ordering::Relaxed),
            handler_failures: self.inner.handler_failures.load(Ordering::Relaxed),
            history_trimmed: self.inner.history_trimmed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapMetricSnapshot {
    pub records_committed: u64,
    pub events_filtered: u64,
    pub throttle_scheduled: u64,
    pub throttle_discarded: u64,
    pub handler_failures: u64,
    pub history_trimmed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshots() {
        let metrics = TapMetrics::default();
        metrics.record_commit();
        metrics.record_commit();
        metrics.record_filtered();
        metrics.record_history_trim(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.records_committed, 2);
        assert_eq!(snap.events_filtered, 1);
        assert_eq!(snap.history_trimmed, 3);
        assert_eq!(snap.handler_failures, 0);
    }

    #[test]
    fn clones_share_the_same_counters() {
        let metrics = TapMetrics::default();
        let alias = metrics.clone();
        alias.record_throttle_scheduled();
        assert_eq!(metrics.snapshot().throttle_scheduled, 1);
    }
}
