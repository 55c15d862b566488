//! Registry item ownership.
//!
//! The `ItemRegistry` is the single owner of [`RegistryItem`] lifetimes, one
//! item per connected session. Everything else in the daemon sees items
//! through `Arc` clones (or the weak handles the command mapping keeps), so
//! an item stays valid exactly as long as its session is registered here.

use crate::metrics;
use crate::state::application::{Application, RegistryItem, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the registry items of all connected applications.
#[derive(Default)]
pub struct ItemRegistry {
    items: HashMap<SessionId, Arc<RegistryItem>>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application for `session_id`, returning its item.
    ///
    /// Registering a session that is already live returns the existing item
    /// unchanged; the new name is ignored.
    pub fn register(&mut self, name: impl Into<String>, session_id: SessionId) -> Arc<RegistryItem> {
        let name = name.into();
        if let Some(existing) = self.items.get(&session_id) {
            warn!(session_id, name = %name, "Session already registered");
            return Arc::clone(existing);
        }

        let item = Arc::new(RegistryItem::new(Application::new(name.clone(), session_id)));
        self.items.insert(session_id, Arc::clone(&item));
        info!(session_id, name = %name, "Application registered");
        metrics::set_connected_applications(self.items.len());
        item
    }

    /// The item for `session_id`, if that session is registered.
    pub fn item(&self, session_id: SessionId) -> Option<Arc<RegistryItem>> {
        self.items.get(&session_id).cloned()
    }

    /// Remove and return the item for `session_id`.
    ///
    /// The caller must purge the command mapping with the returned item
    /// before dropping it, so no weak subscription handle outlives its
    /// referent unnoticed.
    pub fn unregister(&mut self, session_id: SessionId) -> Option<Arc<RegistryItem>> {
        let removed = self.items.remove(&session_id);
        match &removed {
            Some(item) => {
                let name = item.application().map_or("<unassociated>", |a| a.name());
                info!(session_id, name = %name, "Application unregistered");
            }
            None => warn!(session_id, "Unregister for unknown session"),
        }
        metrics::set_connected_applications(self.items.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
