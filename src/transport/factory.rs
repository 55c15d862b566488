//! Device-link connection factory.
//!
//! The factory contract mirrors the device-adapter lifecycle: `init` before
//! any connection, one connection per `(device, application)` pair, and
//! `terminate` to drain everything. A connection that fails to start is
//! released before the error is surfaced, so the failure path leaks nothing.

use crate::config::TransportConfig;
use crate::transport::{ApplicationHandle, DeviceId, SocketConnection, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Lifecycle contract for a device-link connection factory.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Prepare the factory. Must succeed before any `create_connection`.
    async fn init(&self) -> Result<(), TransportError>;

    /// Open a link for an application on a device.
    async fn create_connection(
        &self,
        device_id: DeviceId,
        app_handle: ApplicationHandle,
    ) -> Result<(), TransportError>;

    /// Stop every link and forget it.
    async fn terminate(&self);

    fn is_initialised(&self) -> bool;
}

/// TCP rendition of the device adapter.
pub struct SocketConnectionFactory {
    config: TransportConfig,
    initialised: AtomicBool,
    connections: DashMap<(DeviceId, ApplicationHandle), SocketConnection>,
}

impl SocketConnectionFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            initialised: AtomicBool::new(false),
            connections: DashMap::new(),
        }
    }

    /// Number of links currently tracked.
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }
}

#[async_trait]
impl ConnectionFactory for SocketConnectionFactory {
    async fn init(&self) -> Result<(), TransportError> {
        self.initialised.store(true, Ordering::SeqCst);
        info!(peer = %self.config.device_addr, "Connection factory initialised");
        Ok(())
    }

    async fn create_connection(
        &self,
        device_id: DeviceId,
        app_handle: ApplicationHandle,
    ) -> Result<(), TransportError> {
        if !self.is_initialised() {
            return Err(TransportError::NotInitialised);
        }
        let key = (device_id.clone(), app_handle);
        if self.connections.contains_key(&key) {
            return Err(TransportError::AlreadyConnected(device_id));
        }

        let mut connection = SocketConnection::new(
            device_id.clone(),
            app_handle,
            self.config.device_addr.clone(),
            Duration::from_millis(self.config.connect_timeout_ms),
        );
        if let Err(e) = connection.start().await {
            warn!(device = %device_id, app_handle, error = %e, "Device link start failed");
            // Release whatever was partially constructed before surfacing
            // the error.
            connection.stop().await;
            return Err(e);
        }

        self.connections.insert(key, connection);
        Ok(())
    }

    async fn terminate(&self) {
        // Collect keys first; stopping while iterating the map would hold
        // shard locks across an await.
        let keys: Vec<(DeviceId, ApplicationHandle)> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            if let Some((_, mut connection)) = self.connections.remove(&key) {
                connection.stop().await;
            }
        }
        self.initialised.store(false, Ordering::SeqCst);
        info!("Connection factory terminated");
    }

    fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::SeqCst)
    }
}
