// In-memory хранилище для тестов и встраивания без персистентности
// Записи хранятся сериализованными, как их хранил бы настоящий backend

use crate::crypto::identity::{IdentityKey, IdentityKeyPair};
use crate::error::Result;
use crate::groups::sender_key_record::SenderKeyRecord;
use crate::state::address::{ProtocolAddress, SenderKeyName};
use crate::state::prekey::{PreKeyId, PreKeyRecord, SignedPreKeyId, SignedPreKeyRecord};
use crate::state::session_record::SessionRecord;
use crate::state::store::{
    Direction, IdentityKeyStore, PreKeyStore, SenderKeyStore, SessionStore, SignedPreKeyStore,
};
use std::collections::HashMap;

/// In-memory хранилище
pub struct InMemoryProtocolStore {
    identity_key_pair: IdentityKeyPair,
    local_registration_id: u32,
    trusted_keys: HashMap<ProtocolAddress, IdentityKey>,
    pre_keys: HashMap<PreKeyId, Vec<u8>>,
    signed_pre_keys: HashMap<SignedPreKeyId, Vec<u8>>,
    sessions: HashMap<ProtocolAddress, Vec<u8>>,
    sender_keys: HashMap<SenderKeyName, Vec<u8>>,
}

impl InMemoryProtocolStore {
    pub fn new(identity_key_pair: IdentityKeyPair, local_registration_id: u32) -> Self {
        Self {
            identity_key_pair,
            local_registration_id,
            trusted_keys: HashMap::new(),
            pre_keys: HashMap::new(),
            signed_pre_keys: HashMap::new(),
            sessions: HashMap::new(),
            sender_keys: HashMap::new(),
        }
    }

    // === Утилиты ===

    pub fn clear_sessions(&mut self) {
        self.sessions.clear();
        self.sender_keys.clear();
    }
}

impl IdentityKeyStore for InMemoryProtocolStore {
    fn identity_key_pair(&self) -> Result<IdentityKeyPair> {
        Ok(self.identity_key_pair.clone())
    }

    fn local_registration_id(&self) -> Result<u32> {
        Ok(self.local_registration_id)
    }

    fn save_identity(&mut self, address: &ProtocolAddress, identity: &IdentityKey) -> Result<bool> {
        let replaced = self
            .trusted_keys
            .insert(address.clone(), *identity)
            .map(|previous| previous != *identity)
            .unwrap_or(false);
        Ok(replaced)
    }

    /// Доверяем при первом контакте (TOFU) и пока ключ не меняется
    fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
        _direction: Direction,
    ) -> Result<bool> {
        Ok(self
            .trusted_keys
            .get(address)
            .map(|trusted| trusted == identity)
            .unwrap_or(true))
    }

    fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>> {
        Ok(self.trusted_keys.get(address).copied())
    }
}

impl PreKeyStore for InMemoryProtocolStore {
    fn load_pre_key(&self, id: PreKeyId) -> Result<Option<PreKeyRecord>> {
        self.pre_keys
            .get(&id)
            .map(|bytes| PreKeyRecord::deserialize(bytes))
            .transpose()
    }

    fn store_pre_key(&mut self, id: PreKeyId, record: &PreKeyRecord) -> Result<()> {
        self.pre_keys.insert(id, record.serialize()?);
        Ok(())
    }

    fn contains_pre_key(&self, id: PreKeyId) -> Result<bool> {
        Ok(self.pre_keys.contains_key(&id))
    }

    fn remove_pre_key(&mut self, id: PreKeyId) -> Result<()> {
        self.pre_keys.remove(&id);
        Ok(())
    }
}

impl SignedPreKeyStore for InMemoryProtocolStore {
    fn load_signed_pre_key(&self, id: SignedPreKeyId) -> Result<Option<SignedPreKeyRecord>> {
        self.signed_pre_keys
            .get(&id)
            .map(|bytes| SignedPreKeyRecord::deserialize(bytes))
            .transpose()
    }

    fn load_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>> {
        self.signed_pre_keys
            .values()
            .map(|bytes| SignedPreKeyRecord::deserialize(bytes))
            .collect()
    }

    fn store_signed_pre_key(&mut self, id: SignedPreKeyId, record: &SignedPreKeyRecord) -> Result<()> {
        self.signed_pre_keys.insert(id, record.serialize()?);
        Ok(())
    }

    fn contains_signed_pre_key(&self, id: SignedPreKeyId) -> Result<bool> {
        Ok(self.signed_pre_keys.contains_key(&id))
    }

    fn remove_signed_pre_key(&mut self, id: SignedPreKeyId) -> Result<()> {
        self.signed_pre_keys.remove(&id);
        Ok(())
    }
}

impl SessionStore for InMemoryProtocolStore {
    fn load_session(&self, address: &ProtocolAddress) -> Result<SessionRecord> {
        match self.sessions.get(address) {
            Some(bytes) => SessionRecord::deserialize(bytes),
            None => Ok(SessionRecord::new()),
        }
    }

    fn sub_device_sessions(&self, name: &str) -> Result<Vec<u32>> {
        let mut devices: Vec<u32> = self
            .sessions
            .keys()
            .filter(|address| address.name() == name && address.device_id() != 1)
            .map(|address| address.device_id())
            .collect();
        devices.sort_unstable();
        Ok(devices)
    }

    fn store_session(&mut self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()> {
        self.sessions.insert(address.clone(), record.serialize()?);
        Ok(())
    }

    fn contains_session(&self, address: &ProtocolAddress) -> Result<bool> {
        Ok(self.sessions.contains_key(address))
    }

    fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()> {
        self.sessions.remove(address);
        Ok(())
    }

    fn delete_all_sessions(&mut self, name: &str) -> Result<()> {
        self.sessions.retain(|address, _| address.name() != name);
        Ok(())
    }
}

impl SenderKeyStore for InMemoryProtocolStore {
    fn store_sender_key(&mut self, name: &SenderKeyName, record: &SenderKeyRecord) -> Result<()> {
        self.sender_keys.insert(name.clone(), record.serialize()?);
        Ok(())
    }

    fn load_sender_key(&self, name: &SenderKeyName) -> Result<SenderKeyRecord> {
        match self.sender_keys.get(name) {
            Some(bytes) => SenderKeyRecord::deserialize(bytes),
            None => Ok(SenderKeyRecord::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys;

    fn store() -> InMemoryProtocolStore {
        InMemoryProtocolStore::new(IdentityKeyPair::generate(), 7)
    }

    #[test]
    fn test_identity_trust_on_first_use() {
        let mut store = store();
        let address = ProtocolAddress::new("+14159999999", 1);
        let identity = *IdentityKeyPair::generate().identity_key();
        let other = *IdentityKeyPair::generate().identity_key();

        assert!(store
            .is_trusted_identity(&address, &identity, Direction::Sending)
            .unwrap());
        assert!(!store.save_identity(&address, &identity).unwrap());

        assert!(store
            .is_trusted_identity(&address, &identity, Direction::Receiving)
            .unwrap());
        assert!(!store
            .is_trusted_identity(&address, &other, Direction::Receiving)
            .unwrap());
        assert!(store.save_identity(&address, &other).unwrap());
        assert_eq!(store.get_identity(&address).unwrap(), Some(other));
    }

    #[test]
    fn test_pre_keys_roundtrip_and_remove() {
        let mut store = store();
        let pre_key = keys::generate_pre_keys(5, 1).remove(0);

        store.store_pre_key(5, &pre_key).unwrap();
        let loaded = store.load_pre_key(5).unwrap().unwrap();
        assert_eq!(loaded.public_key(), pre_key.public_key());

        store.remove_pre_key(5).unwrap();
        assert!(!store.contains_pre_key(5).unwrap());
        assert!(store.load_pre_key(5).unwrap().is_none());
    }

    #[test]
    fn test_unknown_session_is_fresh() {
        let store = store();
        let record = store.load_session(&ProtocolAddress::new("nobody", 1)).unwrap();
        assert!(record.is_fresh());
    }

    #[test]
    fn test_sub_device_sessions() {
        let mut store = store();
        for device_id in [1, 3, 2] {
            store
                .store_session(&ProtocolAddress::new("alice", device_id), &SessionRecord::new())
                .unwrap();
        }
        store
            .store_session(&ProtocolAddress::new("bob", 5), &SessionRecord::new())
            .unwrap();

        assert_eq!(store.sub_device_sessions("alice").unwrap(), vec![2, 3]);

        store.delete_all_sessions("alice").unwrap();
        assert!(!store.contains_session(&ProtocolAddress::new("alice", 2)).unwrap());
        assert!(store.contains_session(&ProtocolAddress::new("bob", 5)).unwrap());
    }
}
