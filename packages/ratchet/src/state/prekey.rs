//! Prekey-записи и публикуемый bundle

use crate::crypto::curve::{KeyPair, PublicKey};
use crate::crypto::identity::IdentityKey;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub type PreKeyId = u32;
pub type SignedPreKeyId = u32;

/// Одноразовый prekey (хранится локально до первого использования)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreKeyRecord {
    id: PreKeyId,
    key_pair: KeyPair,
}

impl PreKeyRecord {
    pub fn new(id: PreKeyId, key_pair: KeyPair) -> Self {
        Self { id, key_pair }
    }

    pub fn id(&self) -> PreKeyId {
        self.id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key_pair.public_key
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Signed prekey: среднесрочный ключ с XEdDSA-подписью identity-ключа
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedPreKeyRecord {
    id: SignedPreKeyId,
    timestamp: u64,
    key_pair: KeyPair,
    #[serde(with = "serde_bytes")]
    signature: Vec<u8>,
}

impl SignedPreKeyRecord {
    pub fn new(id: SignedPreKeyId, timestamp: u64, key_pair: KeyPair, signature: Vec<u8>) -> Self {
        Self {
            id,
            timestamp,
            key_pair,
            signature,
        }
    }

    pub fn id(&self) -> SignedPreKeyId {
        self.id
    }

    /// Время создания (миллисекунды Unix)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key_pair.public_key
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Публичный bundle получателя, который инициатор забирает с сервера
///
/// `signed_pre_key` обязателен для установки сессии; `None` приводит к `InvalidKey`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreKeyBundle {
    pub registration_id: u32,
    pub device_id: u32,
    pub pre_key_id: Option<PreKeyId>,
    pub pre_key_public: Option<PublicKey>,
    pub signed_pre_key_id: SignedPreKeyId,
    pub signed_pre_key_public: Option<PublicKey>,
    #[serde(with = "serde_bytes")]
    pub signed_pre_key_signature: Vec<u8>,
    pub identity_key: IdentityKey,
}
