//! A single device link.
//!
//! `SocketConnection` owns the TCP stream and the tokio task servicing one
//! `(device, application)` link. Only lifecycle is handled here: the task
//! drains the socket until the peer closes it or [`SocketConnection::stop`]
//! is called.

use crate::metrics;
use crate::transport::{ApplicationHandle, DeviceId, TransportError};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One device link and the task that services it.
pub struct SocketConnection {
    device_id: DeviceId,
    app_handle: ApplicationHandle,
    peer_addr: String,
    connect_timeout: Duration,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SocketConnection {
    pub fn new(
        device_id: DeviceId,
        app_handle: ApplicationHandle,
        peer_addr: String,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            device_id,
            app_handle,
            peer_addr,
            connect_timeout,
            task: None,
            shutdown_tx: None,
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn app_handle(&self) -> ApplicationHandle {
        self.app_handle
    }

    /// Connect the link and spawn its service task.
    ///
    /// On failure nothing is left behind: no task is spawned and no socket
    /// is held.
    pub async fn start(&mut self) -> Result<(), TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.peer_addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout)??;

        info!(
            device = %self.device_id,
            app_handle = self.app_handle,
            peer = %self.peer_addr,
            "Device link established"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let device_id = self.device_id.clone();
        let app_handle = self.app_handle;
        self.task = Some(tokio::spawn(service_link(
            stream,
            device_id,
            app_handle,
            shutdown_rx,
        )));
        self.shutdown_tx = Some(shutdown_tx);
        metrics::inc_active_links();
        Ok(())
    }

    /// Signal the service task to stop and wait for it to finish.
    ///
    /// Safe to call on a link that never started.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(device = %self.device_id, error = %e, "Device link task panicked");
            }
        }
    }

    /// Whether the service task has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

/// Drain the socket until shutdown or peer close. Payload bytes are opaque
/// at this layer and are discarded.
async fn service_link(
    mut stream: TcpStream,
    device_id: DeviceId,
    app_handle: ApplicationHandle,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(device = %device_id, app_handle, "Device link shutting down");
                break;
            }
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    info!(device = %device_id, app_handle, "Device link closed by peer");
                    break;
                }
                Ok(n) => debug!(device = %device_id, app_handle, bytes = n, "Device link traffic"),
                Err(e) => {
                    warn!(device = %device_id, app_handle, error = %e, "Device link read error");
                    break;
                }
            },
        }
    }
    metrics::dec_active_links();
}
