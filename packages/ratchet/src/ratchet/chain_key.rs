//! Symmetric ratchet: chain key → (message keys, next chain key)

use crate::consts::{CHAIN_KEY_SEED, MESSAGE_KEY_SEED};
use crate::crypto::kdf::hmac_sha256;
use crate::error::Result;
use crate::ratchet::message_keys::MessageKeys;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Chain key: 32-байтовый seed и индекс итерации
///
/// `next()` и `message_keys()` используют HMAC с разными метками, поэтому
/// ключ сообщения не раскрывает ни chain key, ни последующие ключи.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct ChainKey {
    key: [u8; 32],
    index: u32,
}

impl ChainKey {
    pub fn new(key: [u8; 32], index: u32) -> Self {
        Self { key, index }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// HMAC(key, 0x02), индекс + 1
    pub fn next(&self) -> Result<ChainKey> {
        Ok(ChainKey::new(
            hmac_sha256(&self.key, &[&[CHAIN_KEY_SEED]])?,
            self.index + 1,
        ))
    }

    /// Ключи сообщения для текущего индекса (seed = HMAC(key, 0x01))
    pub fn message_keys(&self) -> Result<MessageKeys> {
        let seed = hmac_sha256(&self.key, &[&[MESSAGE_KEY_SEED]])?;
        MessageKeys::derive(&seed, self.index)
    }
}

impl fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainKey")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
