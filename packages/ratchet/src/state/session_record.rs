//! Текущее состояние сессии плюс ограниченный архив предыдущих версий
//!
//! Архив нужен, когда обе стороны одновременно начали сессию или собеседник
//! переустановил сессию: сообщения, зашифрованные в старой версии, ещё могут
//! прийти.

use crate::config::Config;
use crate::crypto::curve::PublicKey;
use crate::error::Result;
use crate::state::session_state::SessionState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    current_session: SessionState,
    /// Новые в начале
    previous_sessions: VecDeque<SessionState>,
}

impl SessionRecord {
    /// Пустая (fresh) запись
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: SessionState) -> Self {
        Self {
            current_session: state,
            previous_sessions: VecDeque::new(),
        }
    }

    /// Запись fresh, пока текущее состояние не инициализировано
    pub fn is_fresh(&self) -> bool {
        !self.current_session.is_initialized()
    }

    /// Есть ли среди текущего и архивных состояние с этой версией и base key
    pub fn has_session_state(&self, version: u8, alice_base_key: &PublicKey) -> bool {
        std::iter::once(&self.current_session)
            .chain(self.previous_sessions.iter())
            .any(|state| {
                state.session_version() == version
                    && state.alice_base_key() == Some(alice_base_key)
            })
    }

    pub fn session_state(&self) -> &SessionState {
        &self.current_session
    }

    pub fn session_state_mut(&mut self) -> &mut SessionState {
        &mut self.current_session
    }

    pub fn previous_session_states(&self) -> impl Iterator<Item = &SessionState> {
        self.previous_sessions.iter()
    }

    pub fn previous_session_count(&self) -> usize {
        self.previous_sessions.len()
    }

    /// Убрать текущее состояние в архив, начав с чистого
    pub fn archive_current_state(&mut self) {
        self.promote_state(SessionState::new());
    }

    /// Сделать `state` текущим; прежнее текущее уходит в начало архива
    pub fn promote_state(&mut self, state: SessionState) {
        let previous = std::mem::replace(&mut self.current_session, state);
        self.previous_sessions.push_front(previous);

        let max_archived = Config::global().archived_states_max_length;
        self.previous_sessions.truncate(max_archived);
    }

    /// Заменить архивное состояние `index` обновлённой копией и сделать её текущей
    pub fn promote_archived_state(&mut self, index: usize, updated: SessionState) {
        self.previous_sessions.remove(index);
        self.promote_state(updated);
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.current_session = state;
    }

    pub fn remove_previous_session_states(&mut self) {
        self.previous_sessions.clear();
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
    use crate::crypto::curve::KeyPair;
    use crate::ratchet::root_key::RootKey;

    fn initialized_state(version: u8, base_key: PublicKey) -> SessionState {
        let mut state = SessionState::new();
        state.set_session_version(version);
        state.set_root_key(RootKey::new([7; 32]));
        state.set_alice_base_key(base_key);
        state
    }

    #[test]
    fn test_new_record_is_fresh() {
        let record = SessionRecord::new();
        assert!(record.is_fresh());
        assert_eq!(record.previous_session_count(), 0);
    }

    #[test]
    fn test_archive_keeps_state_searchable() {
        let base_key = KeyPair::generate().public_key;
        let mut record = SessionRecord::from_state(initialized_state(3, base_key));
        assert!(!record.is_fresh());

        record.archive_current_state();

        assert!(record.is_fresh());
        assert_eq!(record.previous_session_count(), 1);
        assert!(record.has_session_state(3, &base_key));
        assert!(!record.has_session_state(2, &base_key));
    }

    #[test]
    fn test_archive_is_bounded() {
        let mut record = SessionRecord::new();
        let first_base = KeyPair::generate().public_key;
        record.set_state(initialized_state(3, first_base));

        let max_archived = Config::global().archived_states_max_length;
        for _ in 0..max_archived {
            record.promote_state(initialized_state(3, KeyPair::generate().public_key));
        }

        assert_eq!(record.previous_session_count(), max_archived);
        // самое старое состояние вытеснено последним
        assert!(record.has_session_state(3, &first_base));
        record.archive_current_state();
        assert!(!record.has_session_state(3, &first_base));
    }

    #[test]
    fn test_promote_archived_state() {
        let old_base = KeyPair::generate().public_key;
        let new_base = KeyPair::generate().public_key;
        let mut record = SessionRecord::from_state(initialized_state(3, old_base));
        record.promote_state(initialized_state(3, new_base));

        let archived = record.previous_session_states().next().cloned().unwrap();
        record.promote_archived_state(0, archived);

        assert_eq!(record.session_state().alice_base_key(), Some(&old_base));
        assert_eq!(record.previous_session_count(), 1);
        assert_eq!(
            record.previous_session_states().next().unwrap().alice_base_key(),
            Some(&new_base)
        );
    }

    #[test]
    fn test_record_serialization_roundtrip() {
        let base_key = KeyPair::generate().public_key;
        let mut record = SessionRecord::from_state(initialized_state(3, base_key));
        record.archive_current_state();

        let restored = SessionRecord::deserialize(&record.serialize().unwrap()).unwrap();
        assert!(restored.has_session_state(3, &base_key));
        assert!(restored.is_fresh());
    }
}
