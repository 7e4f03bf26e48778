//! Eavesdrop tap engine.
//!
//! Displaces the listener-registration capability of host event targets with
//! an observing wrapper, classifies every invocation of the listeners it
//! wrapped, coalesces high-frequency types, and feeds the resulting records
//! to a bounded history plus subscribed handlers. Callers see the host
//! behave exactly as before: same listener semantics, same dedup, same
//! removal, with observation layered on the side.

pub mod api;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod metrics;
pub mod model;
pub mod selector;

mod classify;
mod handlers;
mod history;
mod intercept;
mod throttle;

pub use api::{EventTap, EventTapBuilder, EventTapEngine};
pub use config::{throttle_eligible, TapPolicyView};
pub use errors::{TapError, TapErrorKind, TapResult};
pub use handlers::RecordHandler;
pub use helpers::{instrument_auto, instrument_document, instrument_global_scope, ScopeGuard};
pub use metrics::TapMetricSnapshot;
pub use model::{EventPhase, EventRecord};
