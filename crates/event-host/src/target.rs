//! Event targets and the swappable registration capability.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{trace, warn};

use crate::event::RawEvent;
use crate::ids::TargetId;

/// Listener callback registered against an [`EventTarget`].
pub type Listener = Arc<dyn Fn(&RawEvent) + Send + Sync + 'static>;

/// Options accepted by registration and removal calls.
///
/// `From<bool>` mirrors the shorthand form where a bare flag selects the
/// capturing phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self { capture: true }
    }
}

impl From<bool> for ListenerOptions {
    fn from(capture: bool) -> Self {
        Self { capture }
    }
}

/// Listener-registration capability of a target.
///
/// The active capability lives in a swappable slot on the target, so an
/// instrumentation layer can displace it and hold the original as plain
/// data while delegating to it.
pub trait ListenerCapability: Send + Sync {
    /// Registers `listener` for `event_type`. A listener already registered
    /// for the same type and phase is not added twice.
    fn register(&self, event_type: &str, listener: Listener, opts: ListenerOptions);

    /// Removes a previous registration. Unknown listeners are ignored.
    fn unregister(&self, event_type: &str, listener: &Listener, opts: ListenerOptions);
}

/// Element metadata consulted when describing a target.
#[derive(Debug, Clone, Default)]
pub struct ElementInfo {
    pub tag: String,
    attributes: BTreeMap<String, String>,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// What kind of object a target stands for.
#[derive(Debug, Clone)]
pub enum TargetKind {
    Element(ElementInfo),
    Document,
    GlobalScope,
}

struct ListenerEntry {
    event_type: String,
    listener: Listener,
    capture: bool,
}

/// Registration-ordered listener rows for one target.
#[derive(Default)]
struct ListenerTable {
    entries: Mutex<Vec<ListenerEntry>>,
}

impl ListenerTable {
    /// Returns false when an identical (type, listener, phase) row exists.
    fn insert(&self, event_type: &str, listener: Listener, capture: bool) -> bool {
        let mut entries = self.entries.lock();
        let duplicate = entries.iter().any(|entry| {
            entry.capture == capture
                && entry.event_type == event_type
                && Arc::ptr_eq(&entry.listener, &listener)
        });
        if duplicate {
            return false;
        }
        entries.push(ListenerEntry {
            event_type: event_type.to_owned(),
            listener,
            capture,
        });
        true
    }

    fn remove(&self, event_type: &str, listener: &Listener, capture: bool) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|entry| {
            entry.capture == capture
                && entry.event_type == event_type
                && Arc::ptr_eq(&entry.listener, listener)
        }) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    fn matching(&self, event_type: &str) -> Vec<Listener> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.event_type == event_type)
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Default capability writing straight into the target's listener table.
struct NativeCapability {
    table: Arc<ListenerTable>,
}

impl ListenerCapability for NativeCapability {
    fn register(&self, event_type: &str, listener: Listener, opts: ListenerOptions) {
        if !self.table.insert(event_type, listener, opts.capture) {
            trace!(target: "event-host", event_type, "duplicate registration ignored");
        }
    }

    fn unregister(&self, event_type: &str, listener: &Listener, opts: ListenerOptions) {
        if !self.table.remove(event_type, listener, opts.capture) {
            trace!(target: "event-host", event_type, "removal of unknown listener ignored");
        }
    }
}

/// One addressable event source: an element, a document, or a global scope.
///
/// Listener registration always goes through the current capability slot;
/// dispatch reads the underlying table directly, so whatever the capability
/// actually registered is what runs.
pub struct EventTarget {
    id: TargetId,
    kind: TargetKind,
    table: Arc<ListenerTable>,
    capability: RwLock<Arc<dyn ListenerCapability>>,
}

impl EventTarget {
    fn with_kind(kind: TargetKind) -> Arc<Self> {
        let table = Arc::new(ListenerTable::default());
        let native: Arc<dyn ListenerCapability> = Arc::new(NativeCapability {
            table: Arc::clone(&table),
        });
        Arc::new(Self {
            id: TargetId::new(),
            kind,
            table,
            capability: RwLock::new(native),
        })
    }

    pub fn element(info: ElementInfo) -> Arc<Self> {
        Self::with_kind(TargetKind::Element(info))
    }

    pub fn document() -> Arc<Self> {
        Self::with_kind(TargetKind::Document)
    }

    pub fn global_scope() -> Arc<Self> {
        Self::with_kind(TargetKind::GlobalScope)
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn kind(&self) -> &TargetKind {
        &self.kind
    }

    /// Current registration capability (native unless instrumented).
    pub fn registration(&self) -> Arc<dyn ListenerCapability> {
        Arc::clone(&self.capability.read())
    }

    /// Swaps the registration capability, returning the displaced one.
    pub fn replace_registration(
        &self,
        capability: Arc<dyn ListenerCapability>,
    ) -> Arc<dyn ListenerCapability> {
        std::mem::replace(&mut *self.capability.write(), capability)
    }

    /// Registers `listener` through the current capability.
    pub fn add_listener(
        &self,
        event_type: &str,
        listener: Listener,
        opts: impl Into<ListenerOptions>,
    ) {
        // Clone the slot first so user code never runs under the slot lock.
        let capability = self.registration();
        capability.register(event_type, listener, opts.into());
    }

    /// Removes `listener` through the current capability.
    pub fn remove_listener(
        &self,
        event_type: &str,
        listener: &Listener,
        opts: impl Into<ListenerOptions>,
    ) {
        let capability = self.registration();
        capability.unregister(event_type, listener, opts.into());
    }

    /// Number of listener rows currently registered, wrappers included.
    pub fn listener_count(&self) -> usize {
        self.table.len()
    }

    /// Synchronously delivers `event` to every listener registered for its
    /// type, in registration order. A panicking listener is contained and the
    /// rest still run. Returns false when a listener cancelled the event.
    pub fn dispatch(&self, event: &RawEvent) -> bool {
        let listeners = self.table.matching(event.event_type());
        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| (listener)(event))).is_err() {
                warn!(
                    target: "event-host",
                    event_type = event.event_type(),
                    "listener panicked during dispatch"
                );
            }
        }
        !event.default_prevented()
    }
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTarget")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("listeners", &self.table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(hits: Arc<AtomicUsize>) -> Listener {
        Arc::new(move |_event: &RawEvent| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let target = EventTarget::element(ElementInfo::new("button"));
        let hits = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(Arc::clone(&hits));

        target.add_listener("click", Arc::clone(&listener), false);
        target.add_listener("click", Arc::clone(&listener), false);
        assert_eq!(target.listener_count(), 1);

        // Same listener on the capturing phase is a distinct row.
        target.add_listener("click", Arc::clone(&listener), true);
        assert_eq!(target.listener_count(), 2);

        target.dispatch(&RawEvent::new("click"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removal_of_unknown_listener_is_a_noop() {
        let target = EventTarget::document();
        let listener = counting_listener(Arc::new(AtomicUsize::new(0)));
        target.remove_listener("click", &listener, false);
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn dispatch_runs_listeners_in_registration_order() {
        let target = EventTarget::global_scope();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let listener: Listener = Arc::new(move |_event| order.lock().push(tag));
            target.add_listener("resize", listener, false);
        }

        target.dispatch(&RawEvent::new("resize"));
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn dispatch_contains_listener_panics() {
        let target = EventTarget::document();
        let hits = Arc::new(AtomicUsize::new(0));

        let panicking: Listener = Arc::new(|_event| panic!("boom"));
        target.add_listener("click", panicking, false);
        target.add_listener("click", counting_listener(Arc::clone(&hits)), false);

        target.dispatch(&RawEvent::new("click"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_reports_cancellation() {
        let target = EventTarget::element(ElementInfo::new("form"));
        let cancelling: Listener = Arc::new(|event| event.prevent_default());
        target.add_listener("submit", cancelling, false);

        assert!(!target.dispatch(&RawEvent::new("submit")));
        assert!(target.dispatch(&RawEvent::new("reset")));
    }

    #[test]
    fn replace_registration_returns_previous_capability() {
        struct Muted;
        impl ListenerCapability for Muted {
            fn register(&self, _: &str, _: Listener, _: ListenerOptions) {}
            fn unregister(&self, _: &str, _: &Listener, _: ListenerOptions) {}
        }

        let target = EventTarget::document();
        let native = target.registration();
        let previous = target.replace_registration(Arc::new(Muted));
        assert!(Arc::ptr_eq(&native, &previous));

        // The muted capability swallows registrations entirely.
        let listener = counting_listener(Arc::new(AtomicUsize::new(0)));
        target.add_listener("click", listener, false);
        assert_eq!(target.listener_count(), 0);
    }
}
