//! # Keystore Port
//!
//! Supplies each user's key pair. The same 32-byte secret is used as the
//! X25519 sealing key and as the secp256k1 ledger signing key.

use async_trait::async_trait;
use shared_types::GatewayError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UserKeys {
    /// X25519 public key that document keys are sealed to.
    pub public_key: [u8; 32],
    pub private_key: [u8; 32],
}

impl fmt::Debug for UserKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKeys")
            .field("public_key", &hex::encode(self.public_key))
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait Keystore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<UserKeys, GatewayError>;
}
