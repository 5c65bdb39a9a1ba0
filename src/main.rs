//! udpircd - persistent UDP-to-IRC relay daemon.
//!
//! Maintains one authenticated IRC connection and a set of UDP
//! listeners, forwarding each datagram into its configured channels.

mod bridge;
mod config;
mod encoder;
mod error;
mod instance;
mod membership;
mod relay;
mod session;
mod supervisor;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::bridge::BridgeTable;
use crate::config::Config;
use crate::encoder::Encoder;
use crate::instance::InstanceGuard;
use crate::supervisor::ConnectionSupervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Argument handling: an optional config path, plus the introspection
    // mode that must not touch the network or the pidfile.
    let mut config_path = "udpircd.toml".to_string();
    for arg in std::env::args().skip(1) {
        if arg == "--list-encodings" {
            for encoder in Encoder::ALL {
                println!("{} - {}", encoder.name(), encoder.description());
            }
            return Ok(());
        }
        config_path = arg;
    }

    // Load configuration
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    // Validate the bridge spec before any socket opens.
    let bridges = BridgeTable::from_blocks(&config.bridges).map_err(|e| {
        error!(error = %e, "invalid bridge specification");
        e
    })?;

    info!(
        server = %config.server.host,
        port = config.server.port,
        tls = config.server.tls,
        nickname = %config.server.nickname,
        bridges = config.bridges.len(),
        "starting udpircd"
    );

    // Single-instance guard; the marker is removed when this guard
    // drops, on every exit path including fatal ones.
    let _guard = InstanceGuard::acquire(config.instance.pidfile_path()).map_err(|e| {
        error!(error = %e, "refusing to start");
        e
    })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut supervisor = ConnectionSupervisor::new(config.server, bridges, shutdown_rx);
    supervisor.run().await?;

    Ok(())
}
