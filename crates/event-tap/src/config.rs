//! Engine policy: what to track, how to wrap, how much to keep.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{TapError, TapErrorKind, TapResult};

/// Event types coalesced through the throttle gate.
///
/// Fixed membership: these fire at input-device or frame frequency and would
/// flood history and handlers if recorded per occurrence.
const THROTTLED_EVENT_TYPES: [&str; 6] = [
    "mousemove",
    "pointermove",
    "touchmove",
    "wheel",
    "scroll",
    "resize",
];

/// Whether `event_type` goes through the coalescing path.
pub fn throttle_eligible(event_type: &str) -> bool {
    THROTTLED_EVENT_TYPES.contains(&event_type)
}

static DEFAULT_TRACKED_EVENTS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "click",
        "dblclick",
        "mousedown",
        "mouseup",
        "mousemove",
        "keydown",
        "keyup",
        "input",
        "change",
        "submit",
        "focus",
        "blur",
        "scroll",
        "resize",
        "touchstart",
        "touchend",
        "load",
        "unload",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

/// Policy snapshot the engine is built over. Frozen at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapPolicyView {
    /// Event types that produce records; everything else is dropped at the
    /// classification gate.
    pub tracked_events: Vec<String>,
    /// Wrap listeners registered for the capturing phase.
    pub capture_phase: bool,
    /// Wrap listeners registered for the bubbling phase.
    pub bubble_phase: bool,
    /// Measure the observation path's own synchronous overhead.
    pub enable_timing: bool,
    /// Upper bound on retained history records.
    pub max_event_history: usize,
    /// Coalescing window for throttle-eligible types, in milliseconds.
    pub throttle_interval_ms: u64,
}

impl Default for TapPolicyView {
    fn default() -> Self {
        Self {
            tracked_events: DEFAULT_TRACKED_EVENTS.clone(),
            capture_phase: true,
            bubble_phase: true,
            enable_timing: true,
            max_event_history: 1000,
            throttle_interval_ms: 16,
        }
    }
}

impl TapPolicyView {
    pub fn validate(&self) -> TapResult<()> {
        if self.max_event_history == 0 {
            return Err(TapError::from(TapErrorKind::InvalidPolicy(
                "max_event_history must be at least 1".into(),
            )));
        }
        Ok(())
    }

    pub(crate) fn tracked_set(&self) -> HashSet<String> {
        self.tracked_events.iter().cloned().collect()
    }
}
