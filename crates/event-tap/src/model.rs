//! Record types handed to history readers and record handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Propagation phase a listener observed for a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventPhase {
    Capturing,
    AtTarget,
    Bubbling,
}

impl EventPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            EventPhase::Capturing => "capturing",
            EventPhase::AtTarget => "at-target",
            EventPhase::Bubbling => "bubbling",
        }
    }
}

/// Immutable snapshot of one observed listener invocation.
///
/// This is the whole contract between the engine and its consumers; mapping
/// records onto spans, metrics or exports is downstream work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event type name as the host reported it.
    pub event_type: String,
    /// Compact descriptor of the target the listener was registered on.
    pub target: String,
    /// Microseconds on the engine's monotonic clock, anchored at engine
    /// creation. Safe for ordering and arithmetic.
    pub ts_mono: u128,
    /// Wall-clock companion timestamp, for display only.
    pub ts_wall: DateTime<Utc>,
    /// Synchronous overhead of the observation path, when timing is enabled.
    pub duration_us: Option<u64>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelled: bool,
    pub synthetic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_in_kebab_case() {
        let json = serde_json::to_string(&EventPhase::AtTarget).unwrap();
        assert_eq!(json, "\"at-target\"");
        let back: EventPhase = serde_json::from_str("\"bubbling\"").unwrap();
        assert_eq!(back, EventPhase::Bubbling);
        assert_eq!(EventPhase::Capturing.as_str(), "capturing");
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = EventRecord {
            event_type: "click".into(),
            target: "button#save".into(),
            ts_mono: 1_042,
            ts_wall: Utc::now(),
            duration_us: Some(17),
            phase: EventPhase::Bubbling,
            bubbles: true,
            cancelled: false,
            synthetic: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event_type"], "click");
        assert_eq!(json["phase"], "bubbling");
        assert_eq!(json["duration_us"], 17);
        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.target, "button#save");
        assert_eq!(back.ts_mono, 1_042);
    }
}
