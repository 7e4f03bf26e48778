//! Host-side event surface for Eavesdrop.
//!
//! Models the environment being instrumented: event targets (elements,
//! documents, global scopes) whose listener-registration capability lives in
//! a swappable slot, plus a synchronous dispatcher that drives registered
//! listeners the way the platform would. The tap engine in `event-tap`
//! displaces that capability to observe listener traffic without the host
//! noticing.

pub mod event;
pub mod platform;
pub mod target;

/// Identifier newtypes for host-side objects.
pub mod ids {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Unique identifier for an event target.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TargetId(pub Uuid);

    impl TargetId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl std::fmt::Display for TargetId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "target-{}", self.0)
        }
    }
}

pub use event::{DispatchStage, RawEvent};
pub use ids::TargetId;
pub use platform::Platform;
pub use target::{
    ElementInfo, EventTarget, Listener, ListenerCapability, ListenerOptions, TargetKind,
};
