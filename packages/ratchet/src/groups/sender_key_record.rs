//! Несколько sender-key состояний одного отправителя, новые первыми

use crate::config::Config;
use crate::crypto::curve::{KeyPair, PublicKey};
use crate::error::{RatchetError, Result};
use crate::groups::sender_key_state::SenderKeyState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SenderKeyRecord {
    states: VecDeque<SenderKeyState>,
}

impl SenderKeyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Самое новое состояние
    pub fn sender_key_state(&self) -> Result<&SenderKeyState> {
        self.states
            .front()
            .ok_or_else(|| RatchetError::NoSession("empty sender key record".to_string()))
    }

    pub fn sender_key_state_mut(&mut self) -> Result<&mut SenderKeyState> {
        self.states
            .front_mut()
            .ok_or_else(|| RatchetError::NoSession("empty sender key record".to_string()))
    }

    pub fn sender_key_state_by_id_mut(&mut self, key_id: u32) -> Result<&mut SenderKeyState> {
        self.states
            .iter_mut()
            .find(|state| state.key_id() == key_id)
            .ok_or_else(|| RatchetError::NoSession(format!("no sender key state for key id {}", key_id)))
    }

    /// Добавить состояние из distribution message (только публичный ключ подписи)
    pub fn add_sender_key_state(
        &mut self,
        key_id: u32,
        iteration: u32,
        chain_key: [u8; 32],
        signing_key: PublicKey,
    ) {
        self.states
            .push_front(SenderKeyState::new(key_id, iteration, chain_key, signing_key, None));

        let max_states = Config::global().max_sender_key_states;
        self.states.truncate(max_states);
    }

    /// Заменить всё собственным состоянием (с приватным ключом подписи)
    pub fn set_sender_key_state(&mut self, key_id: u32, iteration: u32, chain_key: [u8; 32], signing_key: KeyPair) {
        self.states.clear();
        self.states.push_front(SenderKeyState::new(
            key_id,
            iteration,
            chain_key,
            signing_key.public_key,
            Some(signing_key.private_key),
        ));
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_bounded_newest_first() {
        let mut record = SenderKeyRecord::new();
        let max_states = Config::global().max_sender_key_states;

        for key_id in 0..(max_states as u32 + 2) {
            record.add_sender_key_state(key_id, 0, [key_id as u8; 32], KeyPair::generate().public_key);
        }

        assert_eq!(record.state_count(), max_states);
        assert_eq!(record.sender_key_state().unwrap().key_id(), max_states as u32 + 1);
        assert!(record.sender_key_state_by_id_mut(0).is_err());
        assert!(record.sender_key_state_by_id_mut(2).is_ok());
    }

    #[test]
    fn test_empty_record_has_no_state() {
        let record = SenderKeyRecord::new();
        assert!(record.is_empty());
        assert!(matches!(record.sender_key_state(), Err(RatchetError::NoSession(_))));
    }

    #[test]
    fn test_record_serialization_keeps_private_key() {
        let mut record = SenderKeyRecord::new();
        record.set_sender_key_state(9, 3, [1u8; 32], KeyPair::generate());

        let restored = SenderKeyRecord::deserialize(&record.serialize().unwrap()).unwrap();
        let state = restored.sender_key_state().unwrap();
        assert_eq!(state.key_id(), 9);
        assert_eq!(state.sender_chain_key().iteration(), 3);
        assert!(state.signing_key_private().is_ok());
    }
}
