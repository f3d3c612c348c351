//! # Versioned Identifiers
//!
//! `uid::authority::version`, e.g. `8849182c-82ad-4088-a07f-48ead4180515::SYS1::3`.
//!
//! ## Invariants
//!
//! - Rendering then re-parsing is lossless.
//! - `base_identity()` depends on the uid alone, never on authority or version.
//! - Versions start at 1 and only ever increase; a new value is produced on
//!   every increment, the receiver is never changed in place.

use crate::entities::Hash;
use crate::errors::GatewayError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Separator between the three identifier parts.
pub const ID_DELIMITER: &str = "::";

/// A version of a logical document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedId {
    uid: String,
    authority: String,
    version: u64,
}

impl VersionedId {
    /// Build an identifier from its parts.
    pub fn new(
        uid: impl Into<String>,
        authority: impl Into<String>,
        version: u64,
    ) -> Result<Self, GatewayError> {
        let uid = uid.into();
        let authority = authority.into();
        validate_part("uid", &uid)?;
        validate_part("authority", &authority)?;
        if version == 0 {
            return Err(GatewayError::Format(format!(
                "version of {uid} must be a positive integer"
            )));
        }
        Ok(Self {
            uid,
            authority,
            version,
        })
    }

    /// First version of a freshly generated logical document.
    pub fn generate(authority: &str) -> Result<Self, GatewayError> {
        Self::new(uuid::Uuid::new_v4().to_string(), authority, 1)
    }

    /// Parse `uid::authority::version`.
    ///
    /// An empty authority part is filled from `authority`; everything else
    /// must be present. Any other shape is a format error.
    pub fn parse(s: &str, authority: &str) -> Result<Self, GatewayError> {
        let parts: Vec<&str> = s.split(ID_DELIMITER).collect();
        let [uid, auth, version] = parts.as_slice() else {
            return Err(GatewayError::Format(format!(
                "{s:?}: expected 3 parts separated by {ID_DELIMITER}, got {}",
                parts.len()
            )));
        };

        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GatewayError::Format(format!(
                "{s:?}: version {version:?} is not a positive integer"
            )));
        }
        let version: u64 = version
            .parse()
            .map_err(|_| GatewayError::Format(format!("{s:?}: version out of range")))?;

        let auth: &str = if auth.is_empty() { authority } else { *auth };
        Self::new(*uid, auth, version)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// SHA3-256 of the uid. Lookup key for all versions of the document.
    pub fn base_identity(&self) -> Hash {
        base_identity_of(&self.uid)
    }

    /// 32-byte big-endian encoding of the version, used as index sub-key.
    pub fn version_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&self.version.to_be_bytes());
        out
    }

    /// Decode [`VersionedId::version_bytes`] output back to the counter.
    pub fn version_from_bytes(bytes: &[u8; 32]) -> Result<u64, GatewayError> {
        if bytes[..24].iter().any(|b| *b != 0) {
            return Err(GatewayError::Format("version bytes exceed u64".into()));
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&bytes[24..]);
        Ok(u64::from_be_bytes(tail))
    }

    /// The next version of the same document.
    pub fn increase_version(&self) -> Result<Self, GatewayError> {
        if self.version == 0 {
            return Err(GatewayError::Format(format!(
                "{}: cannot increase an invalid version",
                self
            )));
        }
        let version = self
            .version
            .checked_add(1)
            .ok_or_else(|| GatewayError::Format(format!("{}: version overflow", self)))?;
        Ok(Self {
            uid: self.uid.clone(),
            authority: self.authority.clone(),
            version,
        })
    }

    /// Same document at another version.
    pub fn with_version(&self, version: u64) -> Result<Self, GatewayError> {
        Self::new(self.uid.clone(), self.authority.clone(), version)
    }
}

impl fmt::Display for VersionedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{ID_DELIMITER}{}{ID_DELIMITER}{}",
            self.uid, self.authority, self.version
        )
    }
}

/// SHA3-256 of a bare uid (EHR ids, status uids).
pub fn base_identity_of(uid: &str) -> Hash {
    Sha3_256::digest(uid.as_bytes()).into()
}

fn validate_part(name: &str, value: &str) -> Result<(), GatewayError> {
    if value.is_empty() {
        return Err(GatewayError::Format(format!("{name} is empty")));
    }
    if value.contains(ID_DELIMITER) {
        return Err(GatewayError::Format(format!(
            "{name} {value:?} contains {ID_DELIMITER}"
        )));
    }
    Ok(())
}
