//! # Gateway Telemetry
//!
//! Observability for the clinical document gateway.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, human or JSON lines
//! - **Traces**: OpenTelemetry OTLP export, enabled when an endpoint is set
//! - **Metrics**: Prometheus counters and histograms in one registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GW_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `GW_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP collector; no export when unset |
//! | `OTEL_SERVICE_NAME` | `clinical-gateway` | Service name on spans |
//!
//! Key material and plaintext never reach a log line or metric label; only
//! identifiers, sizes and error kinds do.

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, BATCHES_COMMITTED, COMMIT_FAILURES,
    CONTENT_BYTES_STORED, DOCUMENTS_DELETED, DOCUMENTS_READ, DOCUMENTS_SAVED, OPERATION_DURATION,
    PIPELINE_ERRORS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("invalid telemetry configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global subscriber.
///
/// The returned guard must be held for the lifetime of the process; dropping
/// it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let tracing = tracing_setup::init_tracing(&config).await?;
    Ok(TelemetryGuard {
        _tracing: tracing,
        _metrics: metrics,
    })
}

/// Keeps telemetry active. Drop to flush and shut down.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("shutting down telemetry");
    }
}
