//! Telemetry configuration from environment variables.

use std::env;

/// Logging and trace export settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name on exported spans.
    pub service_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error, or per-target).
    pub log_level: String,

    /// Write logs to stdout.
    pub console_output: bool,

    /// JSON formatted logs instead of human-readable lines.
    pub json_logs: bool,

    /// OTLP collector endpoint. Span export is off when unset.
    pub otlp_endpoint: Option<String>,

    /// Deployment environment tag (development, staging, production).
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "clinical-gateway".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            otlp_endpoint: None,
            environment: "development".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: clinical-gateway)
    /// - `GW_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `GW_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `GW_JSON_LOGS`: Enable JSON logs (default: false locally, true in containers)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: unset, no export)
    /// - `GW_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        let defaults = Self::default();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: env::var("GW_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: flag(env::var("GW_CONSOLE_OUTPUT").ok(), true),
            json_logs: flag(env::var("GW_JSON_LOGS").ok(), is_container),
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.is_empty()),
            environment: env::var("GW_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }
}

/// Boolean environment flag: `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`.
pub(crate) fn flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
