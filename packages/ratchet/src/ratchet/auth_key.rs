use serde::{Deserialize, Serialize};
use std::fmt;

/// Auth key сессии: текущий ключ, ключ предыдущей эпохи и номер эпохи
///
/// Служит входом для fingerprint. Свежее состояние несёт пустые ключи.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthKey {
    #[serde(with = "serde_bytes")]
    key: Vec<u8>,
    #[serde(with = "serde_bytes")]
    last_key: Vec<u8>,
    index: u32,
}

impl AuthKey {
    pub fn new(key: Vec<u8>, last_key: Vec<u8>, index: u32) -> Self {
        Self {
            key,
            last_key,
            index,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn last_key(&self) -> &[u8] {
        &self.last_key
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Следующая эпоха: текущий ключ уходит в `last_key`
    pub fn advance(&self, next_key: &[u8]) -> AuthKey {
        AuthKey::new(next_key.to_vec(), self.key.clone(), self.index + 1)
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKey")
            .field("index", &self.index)
            .field("key_len", &self.key.len())
            .finish()
    }
}
