//! Event classification and record construction.
//!
//! [`TapCore`] is the shared state behind one engine instance. Wrapped
//! listeners feed [`TapCore::observe`] on every invocation; the core filters
//! by tracked type, routes throttle-eligible types through the gate, and
//! turns everything else into a committed [`EventRecord`] on the spot.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use eavesdrop_event_host::{DispatchStage, EventTarget, RawEvent, TargetId};
use tracing::trace;

use crate::config::{throttle_eligible, TapPolicyView};
use crate::handlers::HandlerSet;
use crate::history::HistoryBuffer;
use crate::intercept::PatchEntry;
use crate::metrics::TapMetrics;
use crate::model::{EventPhase, EventRecord};
use crate::selector;
use crate::throttle::ThrottleGate;

/// Shared state behind one engine instance.
///
/// Wrapped listeners hold this only weakly; dropping the engine is enough to
/// turn every wrapper into a pure pass-through. `self_ref` is the weak
/// handle cloned into wrappers and deferred tasks; it is set at construction
/// through `Arc::new_cyclic`.
pub(crate) struct TapCore {
    pub(crate) self_ref: Weak<TapCore>,
    pub(crate) policy: TapPolicyView,
    pub(crate) tracked: HashSet<String>,
    pub(crate) origin: Instant,
    pub(crate) inert: AtomicBool,
    pub(crate) history: HistoryBuffer,
    pub(crate) handlers: HandlerSet,
    pub(crate) throttle: ThrottleGate,
    pub(crate) patches: DashMap<TargetId, PatchEntry>,
    pub(crate) metrics: TapMetrics,
}

/// Captured state of one qualifying invocation, independent of the live
/// event.
///
/// Deferred classification outlives the dispatch turn, so the job snapshots
/// everything record construction needs at observation time. A coalesced
/// burst therefore yields a record describing its first occurrence.
pub(crate) struct ClassifyJob {
    event_type: String,
    phase: EventPhase,
    stage: DispatchStage,
    bubbles: bool,
    cancelled: bool,
    synthetic: bool,
    target: Weak<EventTarget>,
    started: Instant,
}

impl ClassifyJob {
    fn capture(
        event: &RawEvent,
        phase: EventPhase,
        target: Weak<EventTarget>,
        started: Instant,
    ) -> Self {
        Self {
            event_type: event.event_type().to_owned(),
            phase,
            stage: event.stage(),
            bubbles: event.bubbles(),
            cancelled: event.default_prevented(),
            synthetic: !event.is_trusted(),
            target,
            started,
        }
    }

    pub(crate) fn event_type(&self) -> &str {
        &self.event_type
    }
}

impl TapCore {
    pub(crate) fn is_inert(&self) -> bool {
        self.inert.load(Ordering::SeqCst)
    }

    /// Whether listeners registered for `phase` should be wrapped at all.
    pub(crate) fn phase_enabled(&self, phase: EventPhase) -> bool {
        match phase {
            EventPhase::Capturing => self.policy.capture_phase,
            EventPhase::Bubbling => self.policy.bubble_phase,
            EventPhase::AtTarget => true,
        }
    }

    /// Entry point from wrapped listeners.
    ///
    /// Runs before the wrapped user listener, holds no lock while user code
    /// is on the stack below it, and never panics outward.
    pub(crate) fn observe(&self, event: &RawEvent, phase: EventPhase, target: &Weak<EventTarget>) {
        if self.is_inert() {
            return;
        }
        let started = Instant::now();
        if !self.tracked.contains(event.event_type()) {
            self.metrics.record_filtered();
            return;
        }

        let job = ClassifyJob::capture(event, phase, target.clone(), started);
        if throttle_eligible(event.event_type()) {
            if self.throttle.submit(self.self_ref.clone(), job) {
                self.metrics.record_throttle_scheduled();
            } else {
                self.metrics.record_throttle_discarded();
                trace!(
                    target: "event-tap",
                    event_type = event.event_type(),
                    "occurrence discarded inside throttle window"
                );
            }
        } else {
            self.finish(job);
        }
    }

    /// Deferred-path completion: classify first, then reopen the window.
    pub(crate) fn finish_deferred(&self, event_type: &str, job: ClassifyJob) {
        self.finish(job);
        self.throttle.release(event_type);
    }

    fn finish(&self, job: ClassifyJob) {
        if self.is_inert() {
            return;
        }
        let record = self.build_record(job);
        self.commit(record);
    }

    fn build_record(&self, job: ClassifyJob) -> EventRecord {
        let target = match job.target.upgrade() {
            Some(target) => selector::describe(&target),
            None => selector::UNKNOWN_TARGET.to_string(),
        };
        // An explicit at-target stage overrides the registration phase.
        let phase = if job.stage == DispatchStage::AtTarget {
            EventPhase::AtTarget
        } else {
            job.phase
        };
        let duration_us = self
            .policy
            .enable_timing
            .then(|| job.started.elapsed().as_micros() as u64);
        EventRecord {
            event_type: job.event_type,
            target,
            ts_mono: self.origin.elapsed().as_micros(),
            ts_wall: Utc::now(),
            duration_us,
            phase,
            bubbles: job.bubbles,
            cancelled: job.cancelled,
            synthetic: job.synthetic,
        }
    }

    /// Appends to history, then fans out to handlers, in that order.
    fn commit(&self, record: EventRecord) {
        let trimmed = self.history.push(record.clone());
        if trimmed > 0 {
            self.metrics.record_history_trim(trimmed as u64);
        }
        self.metrics.record_commit();
        self.handlers.emit(&record, &self.metrics);
    }
}
