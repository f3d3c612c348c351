//! # Hashing
//!
//! - **SHA3-256**: identity hashes (base identities, subject and user keys)
//! - **Keccak-256**: ledger call digests and signer addresses
//! - **BLAKE3**: key derivation for sealing

use sha3::{Digest, Keccak256, Sha3_256};
use shared_types::Hash;

/// SHA3-256 (one-shot).
pub fn sha3_256(data: &[u8]) -> Hash {
    Sha3_256::digest(data).into()
}

/// SHA3-256 over the concatenation of several inputs.
pub fn sha3_256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha3_256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Keccak-256 as used by Ethereum-style ledgers.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive key from context and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}
