//! Root key и DH ratchet step

use crate::consts::RATCHET_INFO;
use crate::crypto::curve::{KeyPair, PublicKey};
use crate::crypto::kdf::derive_secrets;
use crate::error::Result;
use crate::ratchet::auth_key::AuthKey;
use crate::ratchet::chain_key::ChainKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Результат HKDF на 96 байт: root(32) ‖ chain(32) ‖ auth(32)
pub(crate) struct DerivedSecrets {
    pub root_key: [u8; 32],
    pub chain_key: [u8; 32],
    pub auth_key: [u8; 32],
}

impl DerivedSecrets {
    pub(crate) fn split(okm: &[u8]) -> Self {
        let mut root_key = [0u8; 32];
        let mut chain_key = [0u8; 32];
        let mut auth_key = [0u8; 32];
        root_key.copy_from_slice(&okm[..32]);
        chain_key.copy_from_slice(&okm[32..64]);
        auth_key.copy_from_slice(&okm[64..96]);
        Self {
            root_key,
            chain_key,
            auth_key,
        }
    }
}

impl Drop for DerivedSecrets {
    fn drop(&mut self) {
        self.root_key.zeroize();
        self.chain_key.zeroize();
        self.auth_key.zeroize();
    }
}

/// Root key: неизменяем, каждый ratchet step даёт новое значение
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct RootKey {
    key: [u8; 32],
}

impl RootKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// DH ratchet step
    ///
    /// HKDF(DH(our, their), salt = root key, "WhisperRatchet") →
    /// новый root key, chain key с индексом 0 и auth key новой эпохи.
    pub fn create_chain(
        &self,
        their_ratchet_key: &PublicKey,
        our_ratchet_key: &KeyPair,
    ) -> Result<(RootKey, ChainKey, AuthKey)> {
        let shared_secret = our_ratchet_key.calculate_agreement(their_ratchet_key)?;
        let okm = derive_secrets(&shared_secret, Some(&self.key), RATCHET_INFO, 96)?;
        let secrets = DerivedSecrets::split(&okm);

        trace!(
            target: "crypto::ratchet",
            their_ratchet_key = %their_ratchet_key,
            "Root key step"
        );

        Ok((
            RootKey::new(secrets.root_key),
            ChainKey::new(secrets.chain_key, 0),
            AuthKey::new(secrets.auth_key.to_vec(), secrets.auth_key.to_vec(), 0),
        ))
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootKey(..)")
    }
}
