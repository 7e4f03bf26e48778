//! Raw platform events as delivered to listeners.

use std::sync::atomic::{AtomicBool, Ordering};

/// Propagation stage an event is travelling in when a listener sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Capturing,
    AtTarget,
    Bubbling,
}

/// One event instance flowing through a target's listeners.
///
/// Carries the minimum surface the tap engine classifies: the type name and
/// the propagation flags a DOM-like host exposes. Cancellation uses interior
/// mutability so listeners can cancel through the shared reference they are
/// handed.
#[derive(Debug)]
pub struct RawEvent {
    event_type: String,
    stage: DispatchStage,
    bubbles: bool,
    cancelable: bool,
    trusted: bool,
    default_prevented: AtomicBool,
}

impl RawEvent {
    /// Plain trusted event in the bubbling stage.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            stage: DispatchStage::Bubbling,
            bubbles: true,
            cancelable: true,
            trusted: true,
            default_prevented: AtomicBool::new(false),
        }
    }

    /// Marks the event as synthetic rather than platform-generated.
    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    pub fn with_stage(mut self, stage: DispatchStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    pub fn non_cancelable(mut self) -> Self {
        self.cancelable = false;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn stage(&self) -> DispatchStage {
        self.stage
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Requests cancellation. Ignored for non-cancelable events.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.store(true, Ordering::Relaxed);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Relaxed)
    }
}
