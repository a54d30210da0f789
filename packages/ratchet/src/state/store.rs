//! Интерфейсы хранилищ, которыми пользуется ratchet-ядро
//!
//! Ядро само ничего не сохраняет: builder и cipher работают с хранилищем
//! через эти трейты под одной блокировкой на весь read-modify-write.

use crate::crypto::identity::{IdentityKey, IdentityKeyPair};
use crate::error::Result;
use crate::groups::sender_key_record::SenderKeyRecord;
use crate::state::address::{ProtocolAddress, SenderKeyName};
use crate::state::prekey::{PreKeyId, PreKeyRecord, SignedPreKeyId, SignedPreKeyRecord};
use crate::state::session_record::SessionRecord;

/// Направление, в котором используется identity-ключ собеседника
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sending,
    Receiving,
}

pub trait IdentityKeyStore {
    fn identity_key_pair(&self) -> Result<IdentityKeyPair>;

    fn local_registration_id(&self) -> Result<u32>;

    /// Сохранить identity собеседника; `true`, если он заменил другой ключ
    fn save_identity(&mut self, address: &ProtocolAddress, identity: &IdentityKey) -> Result<bool>;

    fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
        direction: Direction,
    ) -> Result<bool>;

    fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>>;
}

pub trait PreKeyStore {
    fn load_pre_key(&self, id: PreKeyId) -> Result<Option<PreKeyRecord>>;

    fn store_pre_key(&mut self, id: PreKeyId, record: &PreKeyRecord) -> Result<()>;

    fn contains_pre_key(&self, id: PreKeyId) -> Result<bool>;

    fn remove_pre_key(&mut self, id: PreKeyId) -> Result<()>;
}

pub trait SignedPreKeyStore {
    fn load_signed_pre_key(&self, id: SignedPreKeyId) -> Result<Option<SignedPreKeyRecord>>;

    fn load_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>>;

    fn store_signed_pre_key(&mut self, id: SignedPreKeyId, record: &SignedPreKeyRecord) -> Result<()>;

    fn contains_signed_pre_key(&self, id: SignedPreKeyId) -> Result<bool>;

    fn remove_signed_pre_key(&mut self, id: SignedPreKeyId) -> Result<()>;
}

pub trait SessionStore {
    /// Запись сессии; для неизвестного адреса возвращается fresh запись
    fn load_session(&self, address: &ProtocolAddress) -> Result<SessionRecord>;

    fn sub_device_sessions(&self, name: &str) -> Result<Vec<u32>>;

    fn store_session(&mut self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()>;

    fn contains_session(&self, address: &ProtocolAddress) -> Result<bool>;

    fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()>;

    fn delete_all_sessions(&mut self, name: &str) -> Result<()>;
}

pub trait SenderKeyStore {
    fn store_sender_key(&mut self, name: &SenderKeyName, record: &SenderKeyRecord) -> Result<()>;

    /// Запись sender key; для неизвестного имени возвращается пустая запись
    fn load_sender_key(&self, name: &SenderKeyName) -> Result<SenderKeyRecord>;
}

/// Всё, что нужно для попарных сессий
pub trait ProtocolStore: IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore {}

impl<T> ProtocolStore for T where T: IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore {}
