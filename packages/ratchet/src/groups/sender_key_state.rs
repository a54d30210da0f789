//! Состояние одной sender-key цепочки

use crate::config::Config;
use crate::crypto::curve::{PrivateKey, PublicKey};
use crate::error::{RatchetError, Result};
use crate::groups::sender_chain_key::SenderChainKey;
use crate::groups::sender_message_key::SenderMessageKey;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sender key: id, chain key, ключ подписи и кэш пропущенных ключей
///
/// Приватная часть ключа подписи есть только на устройстве-отправителе.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SenderKeyState {
    key_id: u32,
    chain_key: SenderChainKey,
    signing_key_public: PublicKey,
    signing_key_private: Option<PrivateKey>,
    /// Старые в начале
    message_keys: VecDeque<SenderMessageKey>,
}

impl SenderKeyState {
    pub fn new(
        key_id: u32,
        iteration: u32,
        chain_key: [u8; 32],
        signing_key_public: PublicKey,
        signing_key_private: Option<PrivateKey>,
    ) -> Self {
        Self {
            key_id,
            chain_key: SenderChainKey::new(iteration, chain_key),
            signing_key_public,
            signing_key_private,
            message_keys: VecDeque::new(),
        }
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn sender_chain_key(&self) -> &SenderChainKey {
        &self.chain_key
    }

    pub fn set_sender_chain_key(&mut self, chain_key: SenderChainKey) {
        self.chain_key = chain_key;
    }

    pub fn signing_key_public(&self) -> &PublicKey {
        &self.signing_key_public
    }

    pub fn signing_key_private(&self) -> Result<&PrivateKey> {
        self.signing_key_private.as_ref().ok_or_else(|| {
            RatchetError::InvalidKey(format!("No signing key for sender key {}", self.key_id))
        })
    }

    pub fn has_sender_message_key(&self, iteration: u32) -> bool {
        self.message_keys.iter().any(|key| key.iteration() == iteration)
    }

    /// Положить ключ в кэш; сверх лимита вытесняется самый старый
    pub fn add_sender_message_key(&mut self, key: SenderMessageKey) {
        self.message_keys.push_back(key);

        let max_keys = Config::global().max_message_keys;
        while self.message_keys.len() > max_keys {
            self.message_keys.pop_front();
        }
    }

    pub fn remove_sender_message_key(&mut self, iteration: u32) -> Option<SenderMessageKey> {
        let position = self
            .message_keys
            .iter()
            .position(|key| key.iteration() == iteration)?;
        self.message_keys.remove(position)
    }

    pub fn message_keys_count(&self) -> usize {
        self.message_keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::KeyPair;

    fn state() -> SenderKeyState {
        let signing = KeyPair::generate();
        SenderKeyState::new(1, 0, [3u8; 32], signing.public_key, None)
    }

    #[test]
    fn test_message_keys_fifo_bound() {
        let mut state = state();
        let max_keys = Config::global().max_message_keys;

        let mut chain = state.sender_chain_key().clone();
        for _ in 0..max_keys + 5 {
            state.add_sender_message_key(chain.sender_message_key().unwrap());
            chain = chain.next().unwrap();
        }

        assert_eq!(state.message_keys_count(), max_keys);
        for iteration in 0..5 {
            assert!(!state.has_sender_message_key(iteration));
        }
        assert!(state.has_sender_message_key(5));
        assert!(state.has_sender_message_key((max_keys + 4) as u32));
    }

    #[test]
    fn test_remove_is_one_shot() {
        let mut state = state();
        let key = state.sender_chain_key().sender_message_key().unwrap();
        state.add_sender_message_key(key.clone());

        assert_eq!(state.remove_sender_message_key(0), Some(key));
        assert!(state.remove_sender_message_key(0).is_none());
    }

    #[test]
    fn test_receiver_state_has_no_private_signing_key() {
        assert!(matches!(
            state().signing_key_private(),
            Err(RatchetError::InvalidKey(_))
        ));
    }
}
