//! State management module.
//!
//! Contains the command subscription registry, the registry item owner, and
//! the entity types they share.

mod application;
mod command;
mod command_mapping;
mod items;

pub use application::{Application, RegistryItem, SessionId};
pub use command::{CommandId, CommandKey, CommandType};
pub use command_mapping::CommandMapping;
pub use items::ItemRegistry;
