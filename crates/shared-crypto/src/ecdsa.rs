//! # ECDSA Signatures (secp256k1)
//!
//! Recoverable signatures over ledger call digests. The ledger identifies the
//! caller by the Ethereum-style address recovered from the signature.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2)
//! - Address = last 20 bytes of Keccak-256(uncompressed public key without prefix)

use crate::hashing::keccak256;
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

/// `r || s` plus recovery id `v` (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    /// R component.
    pub r: [u8; 32],
    /// S component (low-S).
    pub s: [u8; 32],
    /// Recovery id.
    pub v: u8,
}

/// secp256k1 signing identity of a user on the ledger.
pub struct LedgerSigner {
    signing_key: SigningKey,
}

impl LedgerSigner {
    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes(bytes.into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Ledger address of this signer.
    pub fn address(&self) -> Address {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest.
    pub fn sign_digest(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;

        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            v: recid.to_byte(),
        })
    }
}

/// Recover the signer's address from a digest and signature.
pub fn recover_signer(digest: &Hash, signature: &RecoverableSignature) -> Result<Address, CryptoError> {
    let recovery_id = RecoveryId::from_byte(signature.v).ok_or(CryptoError::InvalidSignature)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::InvalidSignature)?;

    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;
    Ok(address_from_verifying_key(&key))
}

fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 prefix
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_recover() {
        let signer = LedgerSigner::from_bytes(&[0xABu8; 32]).unwrap();
        let digest = keccak256(b"add document");

        let sig = signer.sign_digest(&digest).unwrap();
        assert_eq!(recover_signer(&digest, &sig).unwrap(), signer.address());
    }

    #[test]
    fn test_wrong_digest_recovers_other_address() {
        let signer = LedgerSigner::from_bytes(&[0xABu8; 32]).unwrap();
        let sig = signer.sign_digest(&keccak256(b"message1")).unwrap();

        let recovered = recover_signer(&keccak256(b"message2"), &sig);
        assert_ne!(recovered.ok(), Some(signer.address()));
    }

    #[test]
    fn test_deterministic_signatures() {
        let signer = LedgerSigner::from_bytes(&[0x11u8; 32]).unwrap();
        let digest = keccak256(b"deterministic test");
        assert_eq!(
            signer.sign_digest(&digest).unwrap(),
            signer.sign_digest(&digest).unwrap()
        );
    }

    #[test]
    fn test_known_address() {
        // Private key 1 maps to the well-known generator-point address.
        let mut key = [0u8; 32];
        key[31] = 1;
        let signer = LedgerSigner::from_bytes(&key).unwrap();
        assert_eq!(
            hex::encode(signer.address()),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_zero_key_rejected() {
        assert!(LedgerSigner::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_bad_recovery_id() {
        let signer = LedgerSigner::from_bytes(&[0xABu8; 32]).unwrap();
        let digest = keccak256(b"x");
        let mut sig = signer.sign_digest(&digest).unwrap();
        sig.v = 9;
        assert_eq!(recover_signer(&digest, &sig), Err(CryptoError::InvalidSignature));
    }
}
