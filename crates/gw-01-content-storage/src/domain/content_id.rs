//! # Content Identifiers
//!
//! A content identifier is `PREFIX || hex(BLAKE3(bytes))`. It is derived from
//! the stored ciphertext, so identical ciphertext always maps to the same id.

use shared_types::GatewayError;
use std::fmt;

/// Multibase-style prefix marking a raw BLAKE3 content identifier.
const PREFIX: &str = "bk3";

const DIGEST_HEX_LEN: usize = 64;

/// Address of a blob in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    /// Identifier of `bytes`.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self(format!("{PREFIX}{}", blake3::hash(bytes).to_hex()))
    }

    /// Parse the bytes stored in an index record.
    pub fn parse(raw: &[u8]) -> Result<Self, GatewayError> {
        let s = std::str::from_utf8(raw)
            .map_err(|_| GatewayError::Format("content id is not utf-8".into()))?;
        Self::parse_str(s)
    }

    pub fn parse_str(s: &str) -> Result<Self, GatewayError> {
        let digest = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| GatewayError::Format(format!("content id {s:?}: unknown prefix")))?;
        if digest.len() != DIGEST_HEX_LEN || hex::decode(digest).is_err() {
            return Err(GatewayError::Format(format!("content id {s:?}: bad digest")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encoding stored in index records.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// Whether `bytes` hash to this identifier.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        *self == Self::for_bytes(bytes)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
