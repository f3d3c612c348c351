//! # Gateway Configuration
//!
//! Runtime parameters with sane defaults and environment overrides.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `GW_SYSTEM_ID` | `gateway.ehr.local` | EHR system id, authority of new version ids |
//! | `GW_COMPRESSION` | `true` | zstd-compress documents before encryption |
//! | `GW_COMPRESSION_LEVEL` | `3` | zstd level, 1..=22 |
//! | `GW_EXTERNAL_TIMEOUT_SECS` | `30` | Default deadline for content store and deal calls |
//! | `GW_SETTLEMENT_POLL_SECS` | `5` | Settlement watcher period |
//! | `GW_REQUEST_RETENTION_SECS` | `3600` | How long finished requests stay pollable |

use gw_01_content_storage::CompressionConfig;
use gw_04_document_service::DocumentServiceConfig;
use shared_types::ID_DELIMITER;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub system_id: String,
    pub compression_enabled: bool,
    pub compression_level: i32,
    pub external_timeout_secs: u64,
    pub settlement_poll_secs: u64,
    pub request_retention_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            system_id: "gateway.ehr.local".to_string(),
            compression_enabled: true,
            compression_level: 3,
            external_timeout_secs: 30,
            settlement_poll_secs: 5,
            request_retention_secs: 3600,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid value")]
    Unparsable { var: &'static str, value: String },

    #[error("system id must not be empty")]
    EmptySystemId,

    #[error("system id {0:?} must not contain the id delimiter")]
    SystemIdDelimiter(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("compression level {0} is outside 1..=22")]
    CompressionLevel(i32),
}

impl GatewayConfig {
    /// Defaults overridden by any `GW_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(system_id) = env::var("GW_SYSTEM_ID") {
            config.system_id = system_id;
        }
        if let Some(enabled) = parse_var("GW_COMPRESSION", parse_bool)? {
            config.compression_enabled = enabled;
        }
        if let Some(level) = parse_var("GW_COMPRESSION_LEVEL", |v| v.parse().ok())? {
            config.compression_level = level;
        }
        if let Some(secs) = parse_var("GW_EXTERNAL_TIMEOUT_SECS", |v| v.parse().ok())? {
            config.external_timeout_secs = secs;
        }
        if let Some(secs) = parse_var("GW_SETTLEMENT_POLL_SECS", |v| v.parse().ok())? {
            config.settlement_poll_secs = secs;
        }
        if let Some(secs) = parse_var("GW_REQUEST_RETENTION_SECS", |v| v.parse().ok())? {
            config.request_retention_secs = secs;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_id.is_empty() {
            return Err(ConfigError::EmptySystemId);
        }
        if self.system_id.contains(ID_DELIMITER) {
            return Err(ConfigError::SystemIdDelimiter(self.system_id.clone()));
        }
        if self.external_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("external timeout"));
        }
        if self.settlement_poll_secs == 0 {
            return Err(ConfigError::ZeroDuration("settlement poll period"));
        }
        if self.request_retention_secs == 0 {
            return Err(ConfigError::ZeroDuration("request retention"));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(ConfigError::CompressionLevel(self.compression_level));
        }
        Ok(())
    }

    pub fn settlement_poll(&self) -> Duration {
        Duration::from_secs(self.settlement_poll_secs)
    }

    pub fn request_retention(&self) -> Duration {
        Duration::from_secs(self.request_retention_secs)
    }

    /// The subset of settings the document pipeline reads.
    pub fn document_service(&self) -> DocumentServiceConfig {
        DocumentServiceConfig {
            system_id: self.system_id.clone(),
            compression: CompressionConfig {
                level: self.compression_level,
                enabled: self.compression_enabled,
            },
            external_timeout: Duration::from_secs(self.external_timeout_secs),
        }
    }
}

fn parse_var<T>(
    var: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => parse(value.trim())
            .map(Some)
            .ok_or(ConfigError::Unparsable { var, value }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
