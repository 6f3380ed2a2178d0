use std::sync::{Arc, RwLock};

use super::types::Backend;

/// Shared, swappable reference to the active backend.
///
/// Clones observe the same slot, so replacing the backend through one clone
/// is visible to every holder on their next call.
#[derive(Clone)]
pub struct BackendHandle {
    slot: Arc<RwLock<Arc<dyn Backend>>>,
}

impl BackendHandle {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(backend)),
        }
    }

    /// The backend in use right now.
    #[must_use]
    pub fn current(&self) -> Arc<dyn Backend> {
        let guard = self.slot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `backend`, returning the previous one.
    pub fn replace(&self, backend: Arc<dyn Backend>) -> Arc<dyn Backend> {
        let mut guard = self.slot.write().unwrap_or_else(|e| e.into_inner());
        tracing::info!(
            from = guard.backend_type(),
            to = backend.backend_type(),
            "Replacing active backend"
        );
        std::mem::replace(&mut *guard, backend)
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current();
        f.debug_struct("BackendHandle")
            .field("backend_type", &current.backend_type())
            .field("instance_id", &current.instance_id())
            .finish()
    }
}
