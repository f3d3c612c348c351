//! Lookup keys for the auxiliary user → EHR and subject → EHR mappings.

use shared_crypto::sha3_256_many;
use shared_types::Hash;

/// Key of the user → EHR mapping. Users are scoped by EHR system.
pub fn user_key(user_id: &str, system_id: &str) -> Hash {
    sha3_256_many(&[user_id.as_bytes(), b"\0", system_id.as_bytes()])
}

/// Key of the subject → EHR mapping.
pub fn subject_key(subject_id: &str, namespace: &str) -> Hash {
    sha3_256_many(&[subject_id.as_bytes(), b"\0", namespace.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unambiguous() {
        assert_ne!(user_key("ab", "c"), user_key("a", "bc"));
        assert_ne!(subject_key("S1", "ns"), subject_key("S1", "other"));
        assert_eq!(subject_key("S1", "ns"), subject_key("S1", "ns"));
    }
}
