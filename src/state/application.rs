//! Connected application entities.
//!
//! A [`RegistryItem`] represents one connected client application. Items are
//! owned by the [`ItemRegistry`](crate::state::ItemRegistry); the command
//! mapping only ever holds weak handles and reads through the accessors here.

use chrono::{DateTime, Utc};

/// Identifies one logical application connection. Several registry entries
/// can point back to the same session.
pub type SessionId = u64;

/// Identity of a connected application: its display name and the session it
/// arrived on.
#[derive(Debug, Clone)]
pub struct Application {
    name: String,
    session_id: SessionId,
    connected_at: DateTime<Utc>,
}

impl Application {
    pub fn new(name: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            name: name.into(),
            session_id,
            connected_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

/// One entry in the item registry.
///
/// The associated [`Application`] is optional: an item can exist briefly
/// before its application identity is known, and consumers must treat a
/// missing application as "not routable".
#[derive(Debug)]
pub struct RegistryItem {
    application: Option<Application>,
}

impl RegistryItem {
    pub fn new(application: Application) -> Self {
        Self {
            application: Some(application),
        }
    }

    /// An item with no application identity yet.
    pub fn unassociated() -> Self {
        Self { application: None }
    }

    pub fn application(&self) -> Option<&Application> {
        self.application.as_ref()
    }

    /// Session id of the associated application, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.application.as_ref().map(Application::session_id)
    }
}
