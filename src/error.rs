//! Unified error handling for applinkd.
//!
//! The registry itself never propagates an error across its boundary: its
//! operations log the condition, bump a metric, and return a neutral value.
//! This module names those conditions so callers, metrics labels, and tests
//! agree on them.

use thiserror::Error;

// ============================================================================
// Registry Errors (subscription and counter state)
// ============================================================================

/// Conditions the command registry detects and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An operation was given no registry item, or an item that has no
    /// associated application.
    #[error("registry item has no associated application")]
    MissingApplication,

    /// A subscription was attempted with the `Undefined` command type.
    #[error("command type is undefined")]
    InvalidCommandType,

    /// A stored subscription points at an item that has been destroyed.
    #[error("subscribed registry item no longer exists")]
    DanglingItem,

    /// A decrement would have taken an unresponded-request counter below
    /// zero; the value was clamped at 0 instead.
    #[error("unresponded request counter underflow")]
    CounterUnderflow,
}

impl RegistryError {
    /// Static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingApplication => "missing_application",
            Self::InvalidCommandType => "invalid_command_type",
            Self::DanglingItem => "dangling_item",
            Self::CounterUnderflow => "counter_underflow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_codes() {
        assert_eq!(RegistryError::MissingApplication.error_code(), "missing_application");
        assert_eq!(RegistryError::DanglingItem.error_code(), "dangling_item");
        assert_eq!(RegistryError::CounterUnderflow.error_code(), "counter_underflow");
    }
}
