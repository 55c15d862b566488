//! applinkd - application-link manager daemon.
//!
//! Owns the registry of connected device applications and their command
//! subscriptions. Dispatch itself lives upstream; this process keeps the
//! routing state consistent and observable.

use applinkd::config::Config;
use applinkd::manager::AppManager;
use applinkd::transport::{ConnectionFactory, SocketConnectionFactory};
use applinkd::{http, metrics};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting applinkd");

    // Metrics registry, plus the scrape endpoint when configured
    metrics::init();
    if let Some(port) = config.server.metrics_port {
        tokio::spawn(http::run_http_server(port));
    }

    // Registry state
    let manager = Arc::new(AppManager::new());

    // Device-link transport
    let factory = Arc::new(SocketConnectionFactory::new(config.transport.clone()));
    factory.init().await?;

    info!("applinkd ready");

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!(
        connected = manager.connected_applications(),
        "Shutdown requested"
    );

    factory.terminate().await;
    info!("applinkd stopped");
    Ok(())
}
