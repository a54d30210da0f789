//! Identity-ключи устройства

use crate::crypto::curve::{KeyPair, PrivateKey, PublicKey, PUBLIC_KEY_SIZE};
use crate::error::{RatchetError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Долгосрочный публичный ключ устройства
///
/// Сравнивается по сериализованным байтам, что даёт канонический порядок
/// при агрегации identity нескольких устройств.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    public_key: PublicKey,
}

impl IdentityKey {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn serialize(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(PublicKey::deserialize(bytes)?))
    }
}

impl From<PublicKey> for IdentityKey {
    fn from(public_key: PublicKey) -> Self {
        Self::new(public_key)
    }
}

impl Ord for IdentityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serialize().cmp(&other.serialize())
    }
}

impl PartialOrd for IdentityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Identity-ключ вместе с приватной частью (только локально)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityKeyPair {
    identity_key: IdentityKey,
    private_key: PrivateKey,
}

impl IdentityKeyPair {
    pub fn new(identity_key: IdentityKey, private_key: PrivateKey) -> Self {
        Self {
            identity_key,
            private_key,
        }
    }

    pub fn generate() -> Self {
        KeyPair::generate().into()
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn public_key(&self) -> &PublicKey {
        self.identity_key.public_key()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let pair: Self = bincode::deserialize(bytes)?;
        if pair.private_key.public_key() != *pair.public_key() {
            return Err(RatchetError::InvalidKey(
                "Identity private key does not match public key".to_string(),
            ));
        }
        Ok(pair)
    }
}

impl From<KeyPair> for IdentityKeyPair {
    fn from(pair: KeyPair) -> Self {
        Self::new(IdentityKey::new(pair.public_key), pair.private_key)
    }
}
