//! Capability interception: wrap registrations, keep the undo path exact.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::{debug, trace};

use eavesdrop_event_host::{
    EventTarget, Listener, ListenerCapability, ListenerOptions, RawEvent,
};

use crate::classify::TapCore;
use crate::model::EventPhase;

/// Engine-side bookkeeping for one instrumented target.
///
/// The target reference is weak: instrumentation must never extend a
/// target's lifetime.
pub(crate) struct PatchEntry {
    pub(crate) target: Weak<EventTarget>,
    pub(crate) state: Arc<PatchState>,
}

/// Displaced capability plus the binding table for one target.
pub(crate) struct PatchState {
    original: Arc<dyn ListenerCapability>,
    bindings: Mutex<Vec<Binding>>,
}

/// Association from an original listener (by callback identity) and phase to
/// the wrapper registered on its behalf.
struct Binding {
    listener: Listener,
    capture: bool,
    wrapped: Listener,
}

impl PatchState {
    fn new(original: Arc<dyn ListenerCapability>) -> Arc<Self> {
        Arc::new(Self {
            original,
            bindings: Mutex::new(Vec::new()),
        })
    }

    fn lookup(&self, listener: &Listener, capture: bool) -> Option<Listener> {
        self.bindings
            .lock()
            .iter()
            .find(|b| b.capture == capture && Arc::ptr_eq(&b.listener, listener))
            .map(|b| Arc::clone(&b.wrapped))
    }

    /// Removes and returns the wrapper for (`listener`, `capture`), first
    /// match only.
    fn take(&self, listener: &Listener, capture: bool) -> Option<Listener> {
        let mut bindings = self.bindings.lock();
        let idx = bindings
            .iter()
            .position(|b| b.capture == capture && Arc::ptr_eq(&b.listener, listener))?;
        Some(bindings.remove(idx).wrapped)
    }

    fn record(&self, listener: &Listener, capture: bool, wrapped: Listener) {
        self.bindings.lock().push(Binding {
            listener: Arc::clone(listener),
            capture,
            wrapped,
        });
    }

    pub(crate) fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }
}

/// Wrapping capability installed on instrumented targets.
///
/// Holds the displaced original as data and delegates every call to it. When
/// the engine is gone or the phase is not wrapped by policy, calls pass
/// through untouched, so callers cannot tell the slot was ever swapped.
pub(crate) struct TapCapability {
    core: Weak<TapCore>,
    target: Weak<EventTarget>,
    state: Arc<PatchState>,
}

impl TapCapability {
    fn wrap(&self, listener: &Listener, phase: EventPhase) -> Listener {
        let core = self.core.clone();
        let target = self.target.clone();
        let inner = Arc::clone(listener);
        Arc::new(move |event: &RawEvent| {
            if let Some(core) = core.upgrade() {
                core.observe(event, phase, &target);
            }
            (inner)(event);
        })
    }
}

impl ListenerCapability for TapCapability {
    fn register(&self, event_type: &str, listener: Listener, opts: ListenerOptions) {
        let phase = phase_for(opts.capture);
        let wrap = self
            .core
            .upgrade()
            .map(|core| !core.is_inert() && core.phase_enabled(phase))
            .unwrap_or(false);
        if !wrap {
            self.state.original.register(event_type, listener, opts);
            return;
        }

        // One wrapper per (listener, phase); re-registrations reuse it so
        // the underlying dedup still sees the same callback.
        let wrapped = match self.state.lookup(&listener, opts.capture) {
            Some(existing) => existing,
            None => {
                let wrapped = self.wrap(&listener, phase);
                self.state.record(&listener, opts.capture, Arc::clone(&wrapped));
                wrapped
            }
        };
        trace!(
            target: "event-tap",
            event_type,
            capture = opts.capture,
            "listener registered through wrapper"
        );
        self.state.original.register(event_type, wrapped, opts);
    }

    fn unregister(&self, event_type: &str, listener: &Listener, opts: ListenerOptions) {
        match self.state.take(listener, opts.capture) {
            Some(wrapped) => {
                trace!(
                    target: "event-tap",
                    event_type,
                    capture = opts.capture,
                    "wrapped listener removed"
                );
                self.state.original.unregister(event_type, &wrapped, opts);
            }
            // Never wrapped (phase disabled, registered before
            // instrumentation, or plain unknown): forward as-is.
            None => self.state.original.unregister(event_type, listener, opts),
        }
    }
}

fn phase_for(capture: bool) -> EventPhase {
    if capture {
        EventPhase::Capturing
    } else {
        EventPhase::Bubbling
    }
}

impl TapCore {
    /// Displaces `target`'s registration capability with a wrapping one.
    /// Idempotent per target; a no-op once the engine is destroyed.
    pub(crate) fn instrument(&self, target: &Arc<EventTarget>) {
        if self.is_inert() {
            return;
        }
        match self.patches.entry(target.id()) {
            Entry::Occupied(_) => {
                debug!(target: "event-tap", target_id = %target.id(), "target already instrumented");
            }
            Entry::Vacant(slot) => {
                let state = PatchState::new(target.registration());
                let capability = Arc::new(TapCapability {
                    core: self.self_ref.clone(),
                    target: Arc::downgrade(target),
                    state: Arc::clone(&state),
                });
                target.replace_registration(capability);
                slot.insert(PatchEntry {
                    target: Arc::downgrade(target),
                    state,
                });
                debug!(target: "event-tap", target_id = %target.id(), "target instrumented");
            }
        }
    }

    /// Restores the capability captured at instrumentation time, verbatim.
    /// Unknown targets are ignored. Listeners wrapped while instrumented
    /// stay wrapped until their owners remove and re-register them.
    pub(crate) fn uninstrument(&self, target: &Arc<EventTarget>) {
        match self.patches.remove(&target.id()) {
            Some((_, entry)) => {
                target.replace_registration(Arc::clone(&entry.state.original));
                debug!(
                    target: "event-tap",
                    target_id = %target.id(),
                    live_bindings = entry.state.binding_count(),
                    "target restored"
                );
            }
            None => {
                debug!(target: "event-tap", target_id = %target.id(), "uninstrument on unpatched target");
            }
        }
    }

    /// Number of targets currently patched.
    pub(crate) fn patched_targets(&self) -> usize {
        self.patches.len()
    }

    /// Patched targets whose host object is still alive.
    pub(crate) fn live_patched_targets(&self) -> usize {
        self.patches
            .iter()
            .filter(|entry| entry.target.upgrade().is_some())
            .count()
    }
}
