//! Composed helpers for instrumenting well-known platform scopes.

use std::sync::Arc;

use eavesdrop_event_host::{EventTarget, Platform};
use tracing::debug;

use crate::api::EventTap;

/// Instruments the platform document, when one exists.
///
/// Returns the instrumented target so the caller can keep it alive; the
/// engine itself only holds a weak association.
pub fn instrument_document<T>(tap: &Arc<T>, platform: &Platform) -> Option<Arc<EventTarget>>
where
    T: EventTap + ?Sized,
{
    match platform.document() {
        Some(document) => {
            tap.instrument(document);
            Some(Arc::clone(document))
        }
        None => {
            debug!(target: "event-tap", "platform has no document; nothing instrumented");
            None
        }
    }
}

/// Instruments the platform global scope, when one exists.
pub fn instrument_global_scope<T>(tap: &Arc<T>, platform: &Platform) -> Option<Arc<EventTarget>>
where
    T: EventTap + ?Sized,
{
    match platform.global_scope() {
        Some(global) => {
            tap.instrument(global);
            Some(Arc::clone(global))
        }
        None => {
            debug!(target: "event-tap", "platform has no global scope; nothing instrumented");
            None
        }
    }
}

/// Instruments both well-known scopes and hands back a combined undo.
pub fn instrument_auto(tap: &Arc<dyn EventTap>, platform: &Platform) -> ScopeGuard {
    let mut targets = Vec::new();
    if let Some(document) = instrument_document(tap, platform) {
        targets.push(document);
    }
    if let Some(global) = instrument_global_scope(tap, platform) {
        targets.push(global);
    }
    ScopeGuard {
        tap: Arc::clone(tap),
        targets,
    }
}

/// Keeps the auto-instrumented scopes alive and undoes them on request.
pub struct ScopeGuard {
    tap: Arc<dyn EventTap>,
    targets: Vec<Arc<EventTarget>>,
}

impl ScopeGuard {
    /// Scopes the helper instrumented, in instrumentation order.
    pub fn targets(&self) -> &[Arc<EventTarget>] {
        &self.targets
    }

    /// Restores every scope the helper instrumented.
    pub fn teardown(self) {
        for target in &self.targets {
            self.tap.uninstrument(target);
        }
    }
}
