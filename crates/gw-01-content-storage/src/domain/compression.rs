//! # Document Compression
//!
//! Zstd compression of serialized document bodies before encryption.
//!
//! ## Algorithm
//!
//! 1. **Write Path**: `zstd::encode_all(body, level)` then encrypt
//! 2. **Read Path**: decrypt then `zstd::decode_all(bytes)`
//!
//! Compression runs before encryption because ciphertext does not compress.
//! A disabled compressor passes bytes through unchanged in both directions,
//! so both sides of a deployment must agree on the setting.

use std::io;
use thiserror::Error;

// =============================================================================
// COMPRESSION CONFIGURATION
// =============================================================================

/// Configuration for document compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Compression level (1-22, default 3)
    pub level: i32,
    /// Enable compression
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: 3,
            enabled: true,
        }
    }
}

impl CompressionConfig {
    /// Passthrough configuration.
    pub fn disabled() -> Self {
        Self {
            level: 3,
            enabled: false,
        }
    }
}

// =============================================================================
// COMPRESSION ERROR
// =============================================================================

/// Errors during compression/decompression
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Compression failed: {0}")]
    CompressFailed(io::Error),
    #[error("Decompression failed: {0}")]
    DecompressFailed(io::Error),
}

impl From<CompressionError> for shared_types::GatewayError {
    fn from(err: CompressionError) -> Self {
        match err {
            CompressionError::CompressFailed(_) => Self::Internal(err.to_string()),
            CompressionError::DecompressFailed(_) => Self::Format(err.to_string()),
        }
    }
}

// =============================================================================
// COMPRESSOR TRAIT
// =============================================================================

/// Optional compression stage of the save and read pipelines.
pub trait Compressor: Send + Sync {
    /// Compress data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Decompress data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Check if compression is enabled
    fn is_enabled(&self) -> bool;
}

// =============================================================================
// ZSTD COMPRESSOR
// =============================================================================

/// Zstd-based compressor
#[derive(Debug, Clone, Default)]
pub struct ZstdCompressor {
    config: CompressionConfig,
}

impl ZstdCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if !self.config.enabled {
            return Ok(data.to_vec());
        }
        zstd::encode_all(data, self.config.level).map_err(CompressionError::CompressFailed)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if !self.config.enabled {
            return Ok(data.to_vec());
        }
        zstd::decode_all(data).map_err(CompressionError::DecompressFailed)
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

// =============================================================================
// NO-OP COMPRESSOR
// =============================================================================

/// Passthrough compressor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(data.to_vec())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> Vec<u8> {
        br#"{"name":"Vital signs","content":{"pulse":72,"bp":"120/80"}}"#.repeat(50)
    }

    #[test]
    fn test_zstd_roundtrip() {
        let compressor = ZstdCompressor::default();
        let body = sample_body();

        let compressed = compressor.compress(&body).unwrap();
        assert!(compressed.len() < body.len());
        assert_eq!(compressor.decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn test_disabled_is_passthrough() {
        let compressor = ZstdCompressor::new(CompressionConfig::disabled());
        let body = sample_body();

        assert!(!compressor.is_enabled());
        assert_eq!(compressor.compress(&body).unwrap(), body);
        assert_eq!(compressor.decompress(&body).unwrap(), body);
    }

    #[test]
    fn test_garbage_fails_to_decompress() {
        let compressor = ZstdCompressor::default();
        assert!(matches!(
            compressor.decompress(b"not a zstd frame"),
            Err(CompressionError::DecompressFailed(_))
        ));
    }

    #[test]
    fn test_noop() {
        assert_eq!(NoopCompressor.compress(b"abc").unwrap(), b"abc");
        assert!(!NoopCompressor.is_enabled());
    }
}
