//! Command subscription registry.
//!
//! Maps each subscribed `(command id, command type)` pair to the connected
//! application that owns it, and tracks how many requests issued under a
//! command id are still awaiting a response.
//!
//! The mapping holds no lock of its own: it is designed to be owned by a
//! single logical caller (see [`AppManager`](crate::manager::AppManager),
//! which serializes access behind one mutex). Subscriptions store
//! `Weak<RegistryItem>` handles, so an item that was destroyed without being
//! unregistered is observably gone rather than dangling.

use crate::error::RegistryError;
use crate::metrics;
use crate::state::application::RegistryItem;
use crate::state::command::{CommandId, CommandKey, CommandType};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Subscription and unresponded-request state for all connected applications.
#[derive(Default)]
pub struct CommandMapping {
    /// Subscriptions, sorted by command id and then type. At most one
    /// subscriber per key; the first writer wins.
    subscriptions: BTreeMap<CommandKey, Weak<RegistryItem>>,

    /// Requests sent under a command id that have not been answered yet.
    /// An entry exists from the first subscription of that id onward.
    requests_per_command: HashMap<CommandId, u32>,
}

impl CommandMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `app` as the subscriber for `(command_id, command_type)`.
    ///
    /// A missing application handle or an `Undefined` type is reported and
    /// leaves both tables untouched. An already-subscribed key is left with
    /// its original owner. The unresponded-request counter for `command_id`
    /// is created at 0 if this id has never been seen; an existing counter
    /// keeps its value.
    pub fn add_command(
        &mut self,
        command_id: CommandId,
        command_type: CommandType,
        app: Option<&Arc<RegistryItem>>,
    ) {
        let Some(app) = app else {
            error!(command_id, "Adding a command to a missing registry item");
            metrics::registry_error(RegistryError::MissingApplication.error_code());
            return;
        };
        if !command_type.is_valid() {
            error!(command_id, "Adding a command with an undefined type");
            metrics::registry_error(RegistryError::InvalidCommandType.error_code());
            return;
        }

        let name = app
            .application()
            .map_or("<unassociated>", |a| a.name())
            .to_string();
        info!(
            command_id,
            command_type = ?command_type,
            app = %name,
            "Subscribed to command"
        );

        self.subscriptions
            .entry(CommandKey::new(command_id, command_type))
            .or_insert_with(|| Arc::downgrade(app));
        self.requests_per_command.entry(command_id).or_insert(0);
        metrics::command_subscribed();
    }

    /// Remove the subscription for `(command_id, command_type)` if present.
    ///
    /// The unresponded-request counter for `command_id` is decremented
    /// whether or not a subscription existed, clamped at zero.
    pub fn remove_command(&mut self, command_id: CommandId, command_type: CommandType) {
        let key = CommandKey::new(command_id, command_type);
        if self.subscriptions.remove(&key).is_some() {
            info!(command_id, command_type = ?command_type, "Unsubscribed from command");
            metrics::command_removed();
        } else {
            debug!(command_id, command_type = ?command_type, "No subscription to remove");
        }
        self.decrement_unresponded_request_count(command_id);
    }

    /// Remove every subscription owned by `app`'s session.
    ///
    /// Matching is by session identity, not pointer identity: all stored
    /// items sharing the session id of `app`'s application are removed, and
    /// each removal decrements that entry's counter (clamped at zero).
    pub fn remove_item(&mut self, app: Option<&RegistryItem>) {
        let Some(app) = app else {
            error!("Trying to remove a missing registry item");
            metrics::registry_error(RegistryError::MissingApplication.error_code());
            return;
        };
        let Some(session_id) = app.session_id() else {
            error!("Trying to remove an item without an application");
            metrics::registry_error(RegistryError::MissingApplication.error_code());
            return;
        };

        // Collect first, erase second: the table must never be mutated while
        // it is being enumerated.
        let matching: Vec<CommandKey> = self
            .subscriptions
            .iter()
            .filter_map(|(key, stored)| {
                let item = stored.upgrade()?;
                (item.session_id() == Some(session_id)).then_some(*key)
            })
            .collect();

        info!(
            session_id,
            removed = matching.len(),
            "Removing all commands for session"
        );
        for key in matching {
            self.subscriptions.remove(&key);
            metrics::command_removed();
            self.decrement_unresponded_request_count(key.command_id);
        }
    }

    /// Every valid type currently subscribed for `command_id`, in ascending
    /// ordinal order. Recomputed on each call.
    pub fn types_for(&self, command_id: CommandId) -> Vec<CommandType> {
        CommandType::valid()
            .filter(|ty| {
                self.subscriptions
                    .contains_key(&CommandKey::new(command_id, *ty))
            })
            .collect()
    }

    /// The item subscribed to `(command_id, command_type)`, if it is still
    /// alive and has an application.
    ///
    /// A plain miss is a normal outcome. A present entry whose item has been
    /// destroyed, or whose item lost its application, is an inconsistency:
    /// it is reported and treated as not found.
    pub fn find_registry_item_assigned_to_command(
        &self,
        command_id: CommandId,
        command_type: CommandType,
    ) -> Option<Arc<RegistryItem>> {
        let key = CommandKey::new(command_id, command_type);
        let Some(stored) = self.subscriptions.get(&key) else {
            info!(command_id, command_type = ?command_type, "Command not found in subscriptions");
            metrics::lookup_miss();
            return None;
        };
        let Some(item) = stored.upgrade() else {
            error!(
                command_id,
                command_type = ?command_type,
                "Subscribed registry item no longer exists"
            );
            metrics::registry_error(RegistryError::DanglingItem.error_code());
            metrics::lookup_miss();
            return None;
        };
        let Some(application) = item.application() else {
            error!(
                command_id,
                command_type = ?command_type,
                "No application associated with the subscribed registry item"
            );
            metrics::registry_error(RegistryError::MissingApplication.error_code());
            metrics::lookup_miss();
            return None;
        };

        info!(
            command_id,
            app = %application.name(),
            "Application is subscribed to command"
        );
        metrics::lookup_hit();
        Some(item)
    }

    /// The stored unresponded-request count for `command_id`, or 0 if the id
    /// has no entry. Absence is not an error.
    pub fn unresponded_request_count(&self, command_id: CommandId) -> u32 {
        self.requests_per_command
            .get(&command_id)
            .copied()
            .unwrap_or(0)
    }

    /// Increment the counter for `command_id` and return the new value.
    ///
    /// A missing entry returns 0 and inserts nothing: counters only come
    /// into existence through [`CommandMapping::add_command`].
    pub fn increment_unresponded_request_count(&mut self, command_id: CommandId) -> u32 {
        match self.requests_per_command.get_mut(&command_id) {
            Some(count) => {
                *count += 1;
                debug!(command_id, count = *count, "Incremented unresponded requests");
                *count
            }
            None => {
                debug!(command_id, "No unresponded request entry to increment");
                0
            }
        }
    }

    /// Decrement the counter for `command_id` and return the new value.
    ///
    /// A missing entry returns 0 and inserts nothing. A decrement that would
    /// take an existing counter below zero is reported and clamped at 0,
    /// never wrapped.
    pub fn decrement_unresponded_request_count(&mut self, command_id: CommandId) -> u32 {
        match self.requests_per_command.get_mut(&command_id) {
            Some(count) if *count == 0 => {
                error!(
                    command_id,
                    "Unresponded request counter would underflow; clamping at zero"
                );
                metrics::counter_underflow();
                0
            }
            Some(count) => {
                *count -= 1;
                debug!(command_id, count = *count, "Decremented unresponded requests");
                *count
            }
            None => {
                debug!(command_id, "No unresponded request entry to decrement");
                0
            }
        }
    }

    /// Number of live subscriptions. Entries whose item has been destroyed
    /// still count until removed.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::application::{Application, SessionId};

    fn item(name: &str, session_id: SessionId) -> Arc<RegistryItem> {
        Arc::new(RegistryItem::new(Application::new(name, session_id)))
    }

    fn assigned_name(mapping: &CommandMapping, id: CommandId, ty: CommandType) -> Option<String> {
        mapping
            .find_registry_item_assigned_to_command(id, ty)
            .and_then(|i| i.application().map(|a| a.name().to_string()))
    }

    #[test]
    fn test_add_then_find_until_removed() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);

        mapping.add_command(7, CommandType::Ui, Some(&app));
        assert_eq!(assigned_name(&mapping, 7, CommandType::Ui).as_deref(), Some("media"));

        mapping.remove_command(7, CommandType::Ui);
        assert!(mapping.find_registry_item_assigned_to_command(7, CommandType::Ui).is_none());
    }

    #[test]
    fn test_double_subscribe_keeps_first_owner() {
        let mut mapping = CommandMapping::new();
        let first = item("first", 1);
        let second = item("second", 2);

        mapping.add_command(7, CommandType::Ui, Some(&first));
        mapping.add_command(7, CommandType::Ui, Some(&second));

        assert_eq!(assigned_name(&mapping, 7, CommandType::Ui).as_deref(), Some("first"));
        assert_eq!(mapping.subscription_count(), 1);
    }

    #[test]
    fn test_missing_app_is_a_no_op() {
        let mut mapping = CommandMapping::new();
        mapping.add_command(7, CommandType::Ui, None);

        assert!(mapping.find_registry_item_assigned_to_command(7, CommandType::Ui).is_none());
        assert_eq!(mapping.unresponded_request_count(7), 0);
        assert_eq!(mapping.subscription_count(), 0);
        // No counter entry was created either: increment still reports 0.
        assert_eq!(mapping.increment_unresponded_request_count(7), 0);
    }

    #[test]
    fn test_undefined_type_is_rejected() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);
        mapping.add_command(7, CommandType::Undefined, Some(&app));

        assert_eq!(mapping.subscription_count(), 0);
        assert_eq!(mapping.increment_unresponded_request_count(7), 0);
    }

    #[test]
    fn test_counter_exists_from_first_subscription() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);

        assert_eq!(mapping.increment_unresponded_request_count(42), 0);

        mapping.add_command(42, CommandType::Ui, Some(&app));
        assert_eq!(mapping.unresponded_request_count(42), 0);
        assert_eq!(mapping.increment_unresponded_request_count(42), 1);
        assert_eq!(mapping.increment_unresponded_request_count(42), 2);

        // Re-subscribing the same id never resets an existing counter.
        mapping.add_command(42, CommandType::Voice, Some(&app));
        assert_eq!(mapping.unresponded_request_count(42), 2);
    }

    #[test]
    fn test_counter_never_underflows() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);

        mapping.add_command(42, CommandType::Ui, Some(&app));
        assert_eq!(mapping.unresponded_request_count(42), 0);

        // remove_command decrements unconditionally; the clamp holds it at 0.
        mapping.remove_command(42, CommandType::Ui);
        assert_eq!(mapping.unresponded_request_count(42), 0);
        assert_eq!(mapping.decrement_unresponded_request_count(42), 0);
        assert_eq!(mapping.unresponded_request_count(42), 0);
    }

    #[test]
    fn test_remove_item_is_session_scoped() {
        let mut mapping = CommandMapping::new();
        let s1a = item("nav", 1);
        let s1b = item("nav-helper", 1);
        let s2 = item("media", 2);

        mapping.add_command(1, CommandType::Ui, Some(&s1a));
        mapping.add_command(2, CommandType::Voice, Some(&s1b));
        mapping.add_command(3, CommandType::Ui, Some(&s2));

        // Removal matches by session id, not by pointer: a fresh item with
        // the same session sweeps both session-1 entries.
        let probe = RegistryItem::new(Application::new("probe", 1));
        mapping.remove_item(Some(&probe));

        assert!(mapping.find_registry_item_assigned_to_command(1, CommandType::Ui).is_none());
        assert!(mapping.find_registry_item_assigned_to_command(2, CommandType::Voice).is_none());
        assert_eq!(assigned_name(&mapping, 3, CommandType::Ui).as_deref(), Some("media"));
    }

    #[test]
    fn test_remove_item_without_application_is_a_no_op() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);
        mapping.add_command(1, CommandType::Ui, Some(&app));

        let bare = RegistryItem::unassociated();
        mapping.remove_item(Some(&bare));
        mapping.remove_item(None);

        assert_eq!(mapping.subscription_count(), 1);
        assert_eq!(mapping.unresponded_request_count(1), 0);
    }

    #[test]
    fn test_types_for_is_ordered_and_exact() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);

        assert!(mapping.types_for(9).is_empty());

        mapping.add_command(9, CommandType::Voice, Some(&app));
        assert_eq!(mapping.types_for(9), vec![CommandType::Voice]);

        mapping.add_command(9, CommandType::Ui, Some(&app));
        assert_eq!(mapping.types_for(9), vec![CommandType::Ui, CommandType::Voice]);

        mapping.remove_command(9, CommandType::Ui);
        assert_eq!(mapping.types_for(9), vec![CommandType::Voice]);

        assert!(mapping.types_for(10).is_empty());
    }

    #[test]
    fn test_destroyed_item_is_reported_not_dangling() {
        let mut mapping = CommandMapping::new();
        let app = item("media", 1);
        mapping.add_command(5, CommandType::Ui, Some(&app));

        drop(app);
        assert!(mapping.find_registry_item_assigned_to_command(5, CommandType::Ui).is_none());
    }

    #[test]
    fn test_interleaved_scenario() {
        let mut mapping = CommandMapping::new();
        let x = item("x", 1);

        mapping.add_command(42, CommandType::Ui, Some(&x));
        mapping.add_command(42, CommandType::Voice, Some(&x));
        mapping.increment_unresponded_request_count(42);
        mapping.increment_unresponded_request_count(42);
        assert_eq!(mapping.unresponded_request_count(42), 2);

        mapping.remove_command(42, CommandType::Ui);
        assert_eq!(mapping.unresponded_request_count(42), 1);
        assert!(mapping.find_registry_item_assigned_to_command(42, CommandType::Ui).is_none());
        assert_eq!(assigned_name(&mapping, 42, CommandType::Voice).as_deref(), Some("x"));
    }
}
