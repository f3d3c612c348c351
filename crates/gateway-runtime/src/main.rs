//! # Clinical Document Gateway
//!
//! Entry point for the gateway process.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs, optional OTLP export, metrics)
//! 2. Load and validate configuration
//! 3. Wire adapters and subsystems
//! 4. Start the settlement watcher
//! 5. Run until Ctrl+C, then stop the watcher

use std::sync::Arc;

use anyhow::{Context, Result};
use gateway_runtime::{Gateway, GatewayConfig, GatewayContainer};
use gateway_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .await
        .context("failed to initialize telemetry")?;

    let config = GatewayConfig::from_env().context("invalid gateway environment")?;
    config.validate().context("invalid gateway configuration")?;

    info!("===========================================");
    info!("  Clinical Document Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        system_id = %config.system_id,
        compression = config.compression_enabled,
        external_timeout_secs = config.external_timeout_secs,
        "configuration loaded"
    );

    let poll = config.settlement_poll();
    let container = Arc::new(GatewayContainer::new(config));
    let gateway = Gateway::new(Arc::clone(&container));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let watcher = Arc::clone(&container.watcher).spawn(poll, shutdown_rx);

    info!("gateway is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("initiating graceful shutdown");
    if let Err(e) = shutdown_tx.send(true) {
        error!("failed to send shutdown signal: {e}");
    }
    if let Err(e) = watcher.await {
        error!("settlement watcher ended abnormally: {e}");
    }
    info!(
        tracked_requests = gateway.container().tracker.len(),
        "shutdown complete"
    );
    Ok(())
}
