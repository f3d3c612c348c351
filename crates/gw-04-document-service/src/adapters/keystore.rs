//! In-memory keystore that provisions a key pair on first use.

use crate::ports::{Keystore, UserKeys};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::RngCore;
use shared_crypto::sealing_public_key;
use shared_types::GatewayError;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryKeystore {
    keys: RwLock<HashMap<String, UserKeys>>,
}

impl InMemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixed secret for `user_id`.
    pub fn insert(&self, user_id: &str, private_key: [u8; 32]) {
        let keys = UserKeys {
            public_key: sealing_public_key(&private_key),
            private_key,
        };
        self.keys.write().insert(user_id.to_string(), keys);
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl Keystore for InMemoryKeystore {
    async fn get(&self, user_id: &str) -> Result<UserKeys, GatewayError> {
        if user_id.is_empty() {
            return Err(GatewayError::FieldEmpty("user_id".into()));
        }
        if let Some(keys) = self.keys.read().get(user_id) {
            return Ok(keys.clone());
        }
        let mut private_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut private_key);
        let keys = UserKeys {
            public_key: sealing_public_key(&private_key),
            private_key,
        };
        Ok(self
            .keys
            .write()
            .entry(user_id.to_string())
            .or_insert(keys)
            .clone())
    }
}
