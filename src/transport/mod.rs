//! Device-link transport module.
//!
//! The registry treats the transport as an opaque service: a factory that
//! can initialise, open one connection per `(device, application)` pair,
//! and tear everything down. Socket handling stops at lifecycle; no
//! protocol parsing lives here.

mod connection;
mod factory;

pub use connection::SocketConnection;
pub use factory::{ConnectionFactory, SocketConnectionFactory};

use thiserror::Error;

/// Identifies a physical device a link can be opened to.
pub type DeviceId = String;

/// Opaque handle naming one application on a device.
pub type ApplicationHandle = u64;

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection factory is not initialised")]
    NotInitialised,

    #[error("device {0} already has a connection for this application")]
    AlreadyConnected(DeviceId),

    #[error("timed out establishing device link")]
    ConnectTimeout,

    #[error("device link i/o error: {0}")]
    Io(#[from] std::io::Error),
}
