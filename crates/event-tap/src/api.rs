//! Engine construction, the public contract, and lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use eavesdrop_event_host::EventTarget;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::classify::TapCore;
use crate::config::TapPolicyView;
use crate::errors::{TapError, TapErrorKind, TapResult};
use crate::handlers::{HandlerSet, RecordHandler};
use crate::history::HistoryBuffer;
use crate::metrics::{TapMetricSnapshot, TapMetrics};
use crate::model::EventRecord;
use crate::throttle::ThrottleGate;

/// Public contract of a tap engine instance.
pub trait EventTap: fmt::Debug + Send + Sync {
    /// Displaces `target`'s registration capability with an observing
    /// wrapper. Idempotent per target; the engine only holds the target
    /// weakly.
    fn instrument(&self, target: &Arc<EventTarget>);

    /// Restores the capability captured when `target` was instrumented.
    /// Unknown targets are ignored.
    fn uninstrument(&self, target: &Arc<EventTarget>);

    /// Subscribes `handler` to every committed record. The same callback is
    /// registered at most once.
    fn add_handler(&self, handler: RecordHandler);

    /// Removes a previously added handler. Unknown handlers are ignored.
    fn remove_handler(&self, handler: &RecordHandler);

    /// Oldest-to-newest copy of the retained records.
    fn event_history(&self) -> Vec<EventRecord>;

    /// Drops all retained records. Instrumentation stays active.
    fn clear_history(&self);

    /// Tears the engine down: cancels pending throttle slots, clears the
    /// handler set and history, and turns all future observation into
    /// no-ops. Patched targets are NOT restored; callers uninstrument the
    /// targets they instrumented. Idempotent.
    fn destroy(&self);

    /// Current counter snapshot.
    fn metrics(&self) -> TapMetricSnapshot;
}

/// Interception engine over a frozen policy.
pub struct EventTapEngine {
    core: Arc<TapCore>,
}

impl EventTapEngine {
    /// Engine over the default policy.
    ///
    /// Requires an ambient tokio runtime; deferred classification runs on
    /// it.
    pub fn new() -> TapResult<Arc<Self>> {
        Self::with_policy(TapPolicyView::default())
    }

    /// Engine over `policy`, validated first.
    pub fn with_policy(policy: TapPolicyView) -> TapResult<Arc<Self>> {
        policy.validate()?;
        let runtime =
            Handle::try_current().map_err(|_| TapError::from(TapErrorKind::NoRuntime))?;
        let core = Arc::new_cyclic(|weak| TapCore {
            self_ref: weak.clone(),
            tracked: policy.tracked_set(),
            origin: Instant::now(),
            inert: AtomicBool::new(false),
            history: HistoryBuffer::new(policy.max_event_history),
            handlers: HandlerSet::default(),
            throttle: ThrottleGate::new(policy.throttle_interval_ms, runtime),
            patches: DashMap::new(),
            metrics: TapMetrics::default(),
            policy,
        });
        debug!(
            target: "event-tap",
            tracked = core.tracked.len(),
            max_history = core.policy.max_event_history,
            "tap engine created"
        );
        Ok(Arc::new(Self { core }))
    }

    /// The policy this engine was built over.
    pub fn policy(&self) -> &TapPolicyView {
        &self.core.policy
    }

    /// Number of targets currently patched.
    pub fn instrumented_targets(&self) -> usize {
        self.core.patched_targets()
    }

    /// Whether [`EventTap::destroy`] has run.
    pub fn is_destroyed(&self) -> bool {
        self.core.is_inert()
    }
}

impl fmt::Debug for EventTapEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTapEngine")
            .field("tracked", &self.core.tracked.len())
            .field("patched_targets", &self.core.patched_targets())
            .field("destroyed", &self.core.is_inert())
            .finish()
    }
}

impl EventTap for EventTapEngine {
    fn instrument(&self, target: &Arc<EventTarget>) {
        self.core.instrument(target);
    }

    fn uninstrument(&self, target: &Arc<EventTarget>) {
        self.core.uninstrument(target);
    }

    fn add_handler(&self, handler: RecordHandler) {
        if self.core.is_inert() {
            return;
        }
        if !self.core.handlers.add(handler) {
            debug!(target: "event-tap", "duplicate record handler ignored");
        }
    }

    fn remove_handler(&self, handler: &RecordHandler) {
        self.core.handlers.remove(handler);
    }

    fn event_history(&self) -> Vec<EventRecord> {
        self.core.history.snapshot()
    }

    fn clear_history(&self) {
        self.core.history.clear();
    }

    fn destroy(&self) {
        if self.core.inert.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancelled = self.core.throttle.cancel_all();
        self.core.handlers.clear();
        self.core.history.clear();
        info!(
            target: "event-tap",
            cancelled_slots = cancelled,
            patched_targets = self.core.patched_targets(),
            live_targets = self.core.live_patched_targets(),
            "tap engine destroyed"
        );
    }

    fn metrics(&self) -> TapMetricSnapshot {
        self.core.metrics.snapshot()
    }
}

/// Builder over [`EventTapEngine`] for callers that assemble policy
/// piecewise.
#[derive(Debug, Default)]
pub struct EventTapBuilder {
    policy: TapPolicyView,
}

impl EventTapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: TapPolicyView) -> Self {
        self.policy = policy;
        self
    }

    pub fn tracked_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.tracked_events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn capture_phase(mut self, enabled: bool) -> Self {
        self.policy.capture_phase = enabled;
        self
    }

    pub fn bubble_phase(mut self, enabled: bool) -> Self {
        self.policy.bubble_phase = enabled;
        self
    }

    pub fn enable_timing(mut self, enabled: bool) -> Self {
        self.policy.enable_timing = enabled;
        self
    }

    pub fn max_event_history(mut self, bound: usize) -> Self {
        self.policy.max_event_history = bound;
        self
    }

    pub fn throttle_interval_ms(mut self, interval: u64) -> Self {
        self.policy.throttle_interval_ms = interval;
        self
    }

    pub fn build(self) -> TapResult<Arc<dyn EventTap>> {
        EventTapEngine::with_policy(self.policy).map(|engine| engine as Arc<dyn EventTap>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TapErrorKind;
    use eavesdrop_event_host::{ElementInfo, RawEvent};
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn builder_applies_policy_overrides() {
        let tap = EventTapBuilder::new()
            .tracked_events(["click"])
            .max_event_history(5)
            .enable_timing(false)
            .build()
            .unwrap();
        tap.clear_history();
        assert!(tap.event_history().is_empty());
    }

    #[tokio::test]
    async fn invalid_policy_is_rejected_at_construction() {
        let err = EventTapBuilder::new()
            .max_event_history(0)
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), TapErrorKind::InvalidPolicy(_)));
    }

    #[test]
    fn construction_outside_a_runtime_fails() {
        let err = EventTapEngine::new().unwrap_err();
        assert!(matches!(err.kind(), TapErrorKind::NoRuntime));
    }

    #[tokio::test]
    async fn debug_rendering_tracks_lifecycle_state() {
        let engine = EventTapEngine::new().unwrap();
        assert!(format!("{engine:?}").contains("destroyed: false"));
        engine.destroy();
        assert!(format!("{engine:?}").contains("destroyed: true"));
    }

    #[tokio::test]
    async fn destroy_is_idempotent_and_silences_the_engine() {
        let engine = EventTapEngine::new().unwrap();
        let target = EventTarget::element(ElementInfo::new("button"));
        engine.instrument(&target);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_ref = Arc::clone(&seen);
        engine.add_handler(Arc::new(move |_record| {
            seen_ref.fetch_add(1, Ordering::SeqCst);
        }));

        target.add_listener("click", Arc::new(|_e| {}), false);
        target.dispatch(&RawEvent::new("click"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        engine.destroy();
        engine.destroy();
        assert!(engine.is_destroyed());
        assert!(engine.event_history().is_empty());

        // Dispatch still works; the engine just no longer records.
        target.dispatch(&RawEvent::new("click"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(engine.event_history().is_empty());

        // Post-destroy registrations stay untracked as well.
        engine.add_handler(Arc::new(|_record| {}));
        let after = EventTarget::element(ElementInfo::new("a"));
        engine.instrument(&after);
        assert_eq!(engine.instrumented_targets(), 1);
    }
}
