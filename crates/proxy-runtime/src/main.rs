//! # Lightning Session Proxy
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `LP_CONFIG` file, `LP_*` variables)
//! 2. Install the tracing subscriber
//! 3. Refuse insecure or unavailable settings
//! 4. Open storage and wire the subsystems
//! 5. Run until Ctrl+C or a control-plane `stop_daemon`

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use proxy_runtime::adapters::DisconnectedForwarder;
use proxy_runtime::logging::init_tracing;
use proxy_runtime::{ProxyConfig, ProxyServices};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProxyConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.log_level.0)?;
    config.validate().context("Invalid configuration")?;

    let services = ProxyServices::open(config, Arc::new(DisconnectedForwarder))
        .context("Failed to start services")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %services.config.storage.data_dir.display(),
        "Proxy is running. Press Ctrl+C to stop."
    );

    let mut stop = services.control.shutdown_signal();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupt received");
        }
        _ = stop.changed() => {
            info!("Stop requested through the control plane");
        }
    }

    info!(sessions = services.registry.sessions().len(), "Shutdown complete");
    Ok(())
}
