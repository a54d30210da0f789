//! Curve25519: ключевые пары, DH-агремент, XEdDSA-подписи
//!
//! Публичный ключ сериализуется в 33 байта: байт типа (`0x05`) и 32 байта
//! координаты. Порядок на публичных ключах задаётся сериализованными байтами,
//! он детерминированно распределяет роли в handshake.

use crate::consts::DJB_TYPE;
use crate::crypto::xeddsa;
use crate::error::{RatchetError, Result};
use rand::rngs::OsRng;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Размер X25519 ключа (в байтах)
pub const KEY_SIZE: usize = 32;

/// Размер сериализованного публичного ключа (тип + ключ)
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Публичный ключ X25519
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Разобрать 33-байтовую сериализацию
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(RatchetError::InvalidKey(format!(
                "Bad public key length: {}",
                bytes.len()
            )));
        }
        if bytes[0] != DJB_TYPE {
            return Err(RatchetError::InvalidKey(format!(
                "Bad key type: {:#04x}",
                bytes[0]
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes[1..]);
        Ok(Self(key))
    }

    pub fn serialize(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        out[0] = DJB_TYPE;
        out[1..].copy_from_slice(&self.0);
        out
    }

    /// Сырые 32 байта без байта типа
    pub fn public_key_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Проверить XEdDSA-подпись этим ключом
    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> bool {
        xeddsa::xeddsa_verify(message, self, signature)
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serialize().cmp(&other.serialize())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<Vec<u8>> for PublicKey {
    type Error = RatchetError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::deserialize(&bytes)
    }
}

impl From<PublicKey> for Vec<u8> {
    fn from(key: PublicKey) -> Self {
        key.serialize().to_vec()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Приватный ключ X25519 (затирается при drop)
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PrivateKey([u8; KEY_SIZE]);

impl PrivateKey {
    /// Сгенерировать новый ключ (с clamping по RFC 7748)
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        bytes[0] &= 248;
        bytes[31] &= 127;
        bytes[31] |= 64;
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| RatchetError::InvalidKey(format!("Bad private key length: {}", bytes.len())))?;
        Ok(Self(key))
    }

    pub fn serialize(&self) -> [u8; KEY_SIZE] {
        self.0
    }

    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(DalekPublicKey::from(&secret).to_bytes())
    }

    /// DH(self, their_public)
    ///
    /// Неконтрибутивный результат (точка малого порядка) отвергается как `InvalidKey`.
    pub fn calculate_agreement(&self, their_public: &PublicKey) -> Result<[u8; KEY_SIZE]> {
        let secret = StaticSecret::from(self.0);
        let shared = secret.diffie_hellman(&DalekPublicKey::from(their_public.0));
        if !shared.was_contributory() {
            return Err(RatchetError::InvalidKey(
                "Non-contributory key agreement".to_string(),
            ));
        }
        Ok(shared.to_bytes())
    }

    /// XEdDSA-подпись сообщения
    pub fn calculate_signature(&self, message: &[u8]) -> [u8; xeddsa::SIGNATURE_SIZE] {
        xeddsa::xeddsa_sign(message, self)
    }
}

impl TryFrom<Vec<u8>> for PrivateKey {
    type Error = RatchetError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::deserialize(&bytes)
    }
}

impl From<PrivateKey> for Vec<u8> {
    fn from(key: PrivateKey) -> Self {
        key.serialize().to_vec()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Пара ключей X25519
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_private(PrivateKey::generate())
    }

    pub fn from_private(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            public_key,
            private_key,
        }
    }

    pub fn calculate_agreement(&self, their_public: &PublicKey) -> Result<[u8; KEY_SIZE]> {
        self.private_key.calculate_agreement(their_public)
    }

    pub fn calculate_signature(&self, message: &[u8]) -> [u8; xeddsa::SIGNATURE_SIZE] {
        self.private_key.calculate_signature(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_is_symmetric() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let ab = alice.calculate_agreement(&bob.public_key).unwrap();
        let ba = bob.calculate_agreement(&alice.public_key).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_public_key_serialization() {
        let pair = KeyPair::generate();
        let serialized = pair.public_key.serialize();

        assert_eq!(serialized.len(), PUBLIC_KEY_SIZE);
        assert_eq!(serialized[0], DJB_TYPE);
        assert_eq!(PublicKey::deserialize(&serialized).unwrap(), pair.public_key);
    }

    #[test]
    fn test_deserialize_rejects_bad_type_and_length() {
        let pair = KeyPair::generate();
        let mut serialized = pair.public_key.serialize();

        assert!(matches!(
            PublicKey::deserialize(&serialized[1..]),
            Err(RatchetError::InvalidKey(_))
        ));

        serialized[0] = 0x04;
        assert!(matches!(
            PublicKey::deserialize(&serialized),
            Err(RatchetError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_ordering_follows_serialized_bytes() {
        let low = PublicKey::from_bytes([0x01; KEY_SIZE]);
        let high = PublicKey::from_bytes([0xF0; KEY_SIZE]);

        assert!(low < high);
        assert_eq!(low.cmp(&low), Ordering::Equal);
    }

    #[test]
    fn test_low_order_point_rejected() {
        let pair = KeyPair::generate();
        let zero = PublicKey::from_bytes([0u8; KEY_SIZE]);

        assert!(matches!(
            pair.calculate_agreement(&zero),
            Err(RatchetError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_key_pair_bincode_roundtrip() {
        let pair = KeyPair::generate();
        let bytes = bincode::serialize(&pair).unwrap();
        let restored: KeyPair = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored.public_key, pair.public_key);
        assert_eq!(restored.private_key.serialize(), pair.private_key.serialize());
    }
}
