//! Application manager.
//!
//! Ties the item registry and the command mapping together behind one
//! serialized surface. The mapping itself is lock-free by design; this is
//! the single logical caller that provides mutual exclusion around it, and
//! it always locks the whole mapping so subscription table and request
//! counters mutate together.

use crate::state::{
    Application, CommandId, CommandMapping, CommandType, ItemRegistry, RegistryItem, SessionId,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Owns all registry state for the daemon.
///
/// Lock order is items before mapping, everywhere.
#[derive(Default)]
pub struct AppManager {
    items: Mutex<ItemRegistry>,
    mapping: Mutex<CommandMapping>,
}

impl AppManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected application and return its registry item.
    pub fn register_application(
        &self,
        name: impl Into<String>,
        session_id: SessionId,
    ) -> Arc<RegistryItem> {
        self.items.lock().register(name, session_id)
    }

    /// Subscribe `session_id` to `(command_id, command_type)`.
    ///
    /// An unknown session is forwarded to the mapping as a missing item, so
    /// it is reported there and changes nothing.
    pub fn subscribe(
        &self,
        session_id: SessionId,
        command_id: CommandId,
        command_type: CommandType,
    ) {
        let item = self.items.lock().item(session_id);
        if item.is_none() {
            warn!(session_id, command_id, "Subscribe from unregistered session");
        }
        self.mapping
            .lock()
            .add_command(command_id, command_type, item.as_ref());
    }

    /// Drop the subscription for `(command_id, command_type)`.
    pub fn unsubscribe(&self, command_id: CommandId, command_type: CommandType) {
        self.mapping.lock().remove_command(command_id, command_type);
    }

    /// The application item an incoming command should be routed to.
    ///
    /// Resolution only: actually delivering the command is the dispatcher's
    /// business, not ours.
    pub fn resolve(
        &self,
        command_id: CommandId,
        command_type: CommandType,
    ) -> Option<Arc<RegistryItem>> {
        self.mapping
            .lock()
            .find_registry_item_assigned_to_command(command_id, command_type)
    }

    /// All types currently subscribed for `command_id`, ascending.
    pub fn types_for(&self, command_id: CommandId) -> Vec<CommandType> {
        self.mapping.lock().types_for(command_id)
    }

    /// Note a request sent under `command_id`; returns the new outstanding
    /// count (0 if the id has no subscription history).
    pub fn request_sent(&self, command_id: CommandId) -> u32 {
        self.mapping
            .lock()
            .increment_unresponded_request_count(command_id)
    }

    /// Note a response received for `command_id`; returns the new
    /// outstanding count.
    pub fn response_received(&self, command_id: CommandId) -> u32 {
        self.mapping
            .lock()
            .decrement_unresponded_request_count(command_id)
    }

    /// Outstanding request count for `command_id`.
    pub fn unresponded_requests(&self, command_id: CommandId) -> u32 {
        self.mapping.lock().unresponded_request_count(command_id)
    }

    /// Tear down everything owned by a disconnecting session.
    ///
    /// The item leaves the registry first and is purged from the mapping
    /// while this call still holds a strong reference, so no subscription
    /// ever outlives its item unnoticed.
    pub fn on_application_disconnected(&self, session_id: SessionId) {
        let removed = self.items.lock().unregister(session_id);
        if let Some(item) = removed {
            self.mapping.lock().remove_item(Some(&item));
        }
    }

    /// Number of currently registered applications.
    pub fn connected_applications(&self) -> usize {
        self.items.lock().len()
    }

    /// Look up a registered session's application identity.
    pub fn application(&self, session_id: SessionId) -> Option<Application> {
        self.items
            .lock()
            .item(session_id)
            .and_then(|item| item.application().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_resolve_disconnect_flow() {
        let manager = AppManager::new();
        manager.register_application("media", 1);

        manager.subscribe(1, 7, CommandType::Ui);
        let owner = manager.resolve(7, CommandType::Ui).expect("subscribed");
        assert_eq!(owner.session_id(), Some(1));

        manager.on_application_disconnected(1);
        assert!(manager.resolve(7, CommandType::Ui).is_none());
        assert_eq!(manager.connected_applications(), 0);
    }

    #[test]
    fn test_subscribe_from_unknown_session_changes_nothing() {
        let manager = AppManager::new();
        manager.subscribe(9, 7, CommandType::Ui);

        assert!(manager.resolve(7, CommandType::Ui).is_none());
        assert_eq!(manager.request_sent(7), 0);
    }

    #[test]
    fn test_request_counters_survive_disconnect_of_other_sessions() {
        let manager = AppManager::new();
        manager.register_application("nav", 1);
        manager.register_application("media", 2);

        manager.subscribe(1, 10, CommandType::Ui);
        manager.subscribe(2, 20, CommandType::Voice);
        assert_eq!(manager.request_sent(20), 1);

        manager.on_application_disconnected(1);
        assert_eq!(manager.unresponded_requests(20), 1);
        assert!(manager.resolve(20, CommandType::Voice).is_some());
    }
}
