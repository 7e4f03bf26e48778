//! Ambient view of the host environment.

use std::sync::Arc;

use crate::target::EventTarget;

/// Which well-known scopes the host exposes.
///
/// A browser-like embedding has both a document and a global scope; headless
/// or worker embeddings may have neither. Helpers that instrument ambient
/// scopes consult this view and degrade to no-ops for absent ones.
#[derive(Debug, Clone, Default)]
pub struct Platform {
    document: Option<Arc<EventTarget>>,
    global_scope: Option<Arc<EventTarget>>,
}

impl Platform {
    /// Host with both well-known scopes present.
    pub fn full() -> Self {
        Self {
            document: Some(EventTarget::document()),
            global_scope: Some(EventTarget::global_scope()),
        }
    }

    /// Host exposing no ambient scopes.
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn new(document: Option<Arc<EventTarget>>, global_scope: Option<Arc<EventTarget>>) -> Self {
        Self {
            document,
            global_scope,
        }
    }

    pub fn document(&self) -> Option<&Arc<EventTarget>> {
        self.document.as_ref()
    }

    pub fn global_scope(&self) -> Option<&Arc<EventTarget>> {
        self.global_scope.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn has_global_scope(&self) -> bool {
        self.global_scope.is_some()
    }
}
