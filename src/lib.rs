//! applinkd - application-link manager daemon.
//!
//! Library surface for the daemon binary, integration tests, and benches.
//! The interesting parts are [`state::CommandMapping`] (the command
//! subscription registry) and [`manager::AppManager`] (the serialized
//! owner that the dispatcher talks to).

pub mod config;
pub mod error;
pub mod http;
pub mod manager;
pub mod metrics;
pub mod state;
pub mod transport;
