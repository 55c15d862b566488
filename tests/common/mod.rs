//! Integration test common infrastructure.
//!
//! Provides a fake device-adapter peer (a plain TCP accept loop) and config
//! builders for driving the daemon's library surface.

use applinkd::config::TransportConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A fake device-adapter endpoint that accepts links and holds them open.
pub struct FakeDevicePeer {
    addr: String,
    task: JoinHandle<()>,
}

impl FakeDevicePeer {
    /// Bind an ephemeral port and start accepting connections.
    pub async fn spawn() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();

        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        Ok(Self { addr, task })
    }

    /// Transport config pointing at this peer.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            device_addr: self.addr.clone(),
            connect_timeout_ms: 1000,
        }
    }
}

impl Drop for FakeDevicePeer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
