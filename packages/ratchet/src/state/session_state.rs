//! Состояние одной версии сессии
//!
//! Держит всё, что нужно ratchet'у между сообщениями: root key, sender chain,
//! ограниченный список receiver chains со своими кэшами пропущенных ключей,
//! auth key и цепочку fingerprint-хэшей.

use crate::config::Config;
use crate::crypto::curve::{KeyPair, PublicKey};
use crate::crypto::identity::IdentityKey;
use crate::error::{RatchetError, Result};
use crate::ratchet::auth_key::AuthKey;
use crate::ratchet::chain_key::ChainKey;
use crate::ratchet::message_keys::MessageKeys;
use crate::ratchet::root_key::RootKey;
use crate::state::prekey::{PreKeyId, SignedPreKeyId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Наша отправляющая цепочка: текущая ratchet-пара и chain key
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SenderChain {
    ratchet_key: KeyPair,
    chain_key: ChainKey,
}

/// Принимающая цепочка для одного удалённого ratchet-ключа
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiverChain {
    ratchet_key: PublicKey,
    chain_key: ChainKey,
    /// Ключи пропущенных сообщений, старые в начале
    message_keys: VecDeque<MessageKeys>,
}

impl ReceiverChain {
    fn new(ratchet_key: PublicKey, chain_key: ChainKey) -> Self {
        Self {
            ratchet_key,
            chain_key,
            message_keys: VecDeque::new(),
        }
    }

    pub fn ratchet_key(&self) -> &PublicKey {
        &self.ratchet_key
    }

    pub fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    pub fn message_keys_count(&self) -> usize {
        self.message_keys.len()
    }
}

/// Prekey-сообщение, которое собеседник ещё не подтвердил ответом
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPreKey {
    pub pre_key_id: Option<PreKeyId>,
    pub signed_pre_key_id: SignedPreKeyId,
    pub base_key: PublicKey,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionState {
    session_version: u8,
    local_identity_key: Option<IdentityKey>,
    remote_identity_key: Option<IdentityKey>,

    root_key: Option<RootKey>,
    previous_counter: u32,
    sender_chain: Option<SenderChain>,
    receiver_chains: Vec<ReceiverChain>,

    pending_pre_key: Option<PendingPreKey>,
    remote_registration_id: u32,
    local_registration_id: u32,
    alice_base_key: Option<PublicKey>,

    auth_key: AuthKey,
    #[serde(with = "serde_bytes")]
    fprint_hash: Vec<u8>,
    #[serde(with = "serde_bytes")]
    last_fprint_hash: Vec<u8>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Состояние прошло инициализацию (есть root key)
    pub fn is_initialized(&self) -> bool {
        self.root_key.is_some()
    }

    // === Версия и identity ===

    pub fn session_version(&self) -> u8 {
        self.session_version
    }

    pub fn set_session_version(&mut self, version: u8) {
        self.session_version = version;
    }

    pub fn local_identity_key(&self) -> Option<&IdentityKey> {
        self.local_identity_key.as_ref()
    }

    pub fn set_local_identity_key(&mut self, key: IdentityKey) {
        self.local_identity_key = Some(key);
    }

    pub fn remote_identity_key(&self) -> Option<&IdentityKey> {
        self.remote_identity_key.as_ref()
    }

    pub fn set_remote_identity_key(&mut self, key: IdentityKey) {
        self.remote_identity_key = Some(key);
    }

    // === Root key ===

    pub fn root_key(&self) -> Result<&RootKey> {
        self.root_key
            .as_ref()
            .ok_or_else(|| RatchetError::NoSession("root key not set".to_string()))
    }

    pub fn set_root_key(&mut self, root_key: RootKey) {
        self.root_key = Some(root_key);
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn set_previous_counter(&mut self, counter: u32) {
        self.previous_counter = counter;
    }

    // === Sender chain ===

    pub fn has_sender_chain(&self) -> bool {
        self.sender_chain.is_some()
    }

    fn sender_chain(&self) -> Result<&SenderChain> {
        self.sender_chain
            .as_ref()
            .ok_or_else(|| RatchetError::NoSession("sender chain not set".to_string()))
    }

    pub fn sender_ratchet_key(&self) -> Result<&PublicKey> {
        Ok(&self.sender_chain()?.ratchet_key.public_key)
    }

    pub fn sender_ratchet_key_pair(&self) -> Result<&KeyPair> {
        Ok(&self.sender_chain()?.ratchet_key)
    }

    pub fn sender_chain_key(&self) -> Result<&ChainKey> {
        Ok(&self.sender_chain()?.chain_key)
    }

    pub fn set_sender_chain(&mut self, ratchet_key: KeyPair, chain_key: ChainKey) {
        self.sender_chain = Some(SenderChain {
            ratchet_key,
            chain_key,
        });
    }

    pub fn set_sender_chain_key(&mut self, chain_key: ChainKey) -> Result<()> {
        let chain = self
            .sender_chain
            .as_mut()
            .ok_or_else(|| RatchetError::NoSession("sender chain not set".to_string()))?;
        chain.chain_key = chain_key;
        Ok(())
    }

    // === Receiver chains ===

    pub fn receiver_chains(&self) -> &[ReceiverChain] {
        &self.receiver_chains
    }

    fn receiver_chain_mut(&mut self, sender: &PublicKey) -> Option<&mut ReceiverChain> {
        self.receiver_chains
            .iter_mut()
            .find(|chain| chain.ratchet_key == *sender)
    }

    pub fn has_receiver_chain(&self, sender: &PublicKey) -> bool {
        self.receiver_chain_key(sender).is_some()
    }

    pub fn receiver_chain_key(&self, sender: &PublicKey) -> Option<&ChainKey> {
        self.receiver_chains
            .iter()
            .find(|chain| chain.ratchet_key == *sender)
            .map(|chain| &chain.chain_key)
    }

    /// Добавить receiver chain; самые старые вытесняются сверх лимита
    pub fn add_receiver_chain(&mut self, sender: PublicKey, chain_key: ChainKey) {
        self.receiver_chains.push(ReceiverChain::new(sender, chain_key));

        let max_chains = Config::global().max_receiver_chains;
        if self.receiver_chains.len() > max_chains {
            let excess = self.receiver_chains.len() - max_chains;
            self.receiver_chains.drain(..excess);
            trace!(target: "crypto::ratchet", dropped = excess, "Trimmed receiver chains");
        }
    }

    pub fn set_receiver_chain_key(&mut self, sender: &PublicKey, chain_key: ChainKey) -> Result<()> {
        let chain = self
            .receiver_chain_mut(sender)
            .ok_or_else(|| RatchetError::InvalidMessage("no receiver chain for key".to_string()))?;
        chain.chain_key = chain_key;
        Ok(())
    }

    // === Кэш пропущенных ключей ===

    pub fn has_message_keys(&self, sender: &PublicKey, counter: u32) -> bool {
        self.receiver_chains
            .iter()
            .find(|chain| chain.ratchet_key == *sender)
            .map(|chain| chain.message_keys.iter().any(|keys| keys.counter() == counter))
            .unwrap_or(false)
    }

    /// Извлечь ключи сообщения из кэша (одноразово)
    pub fn remove_message_keys(&mut self, sender: &PublicKey, counter: u32) -> Option<MessageKeys> {
        let chain = self.receiver_chain_mut(sender)?;
        let position = chain
            .message_keys
            .iter()
            .position(|keys| keys.counter() == counter)?;
        chain.message_keys.remove(position)
    }

    /// Положить ключи в кэш; при переполнении вытесняется самый старый
    pub fn set_message_keys(&mut self, sender: &PublicKey, keys: MessageKeys) -> Result<()> {
        let max_keys = Config::global().max_message_keys;
        let chain = self
            .receiver_chain_mut(sender)
            .ok_or_else(|| RatchetError::InvalidMessage("no receiver chain for key".to_string()))?;

        chain.message_keys.push_back(keys);
        while chain.message_keys.len() > max_keys {
            chain.message_keys.pop_front();
        }
        Ok(())
    }

    // === Prekey bookkeeping ===

    pub fn set_unacknowledged_pre_key_message(
        &mut self,
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: SignedPreKeyId,
        base_key: PublicKey,
    ) {
        self.pending_pre_key = Some(PendingPreKey {
            pre_key_id,
            signed_pre_key_id,
            base_key,
        });
    }

    pub fn unacknowledged_pre_key_message(&self) -> Option<&PendingPreKey> {
        self.pending_pre_key.as_ref()
    }

    pub fn clear_unacknowledged_pre_key_message(&mut self) {
        self.pending_pre_key = None;
    }

    pub fn remote_registration_id(&self) -> u32 {
        self.remote_registration_id
    }

    pub fn set_remote_registration_id(&mut self, id: u32) {
        self.remote_registration_id = id;
    }

    pub fn local_registration_id(&self) -> u32 {
        self.local_registration_id
    }

    pub fn set_local_registration_id(&mut self, id: u32) {
        self.local_registration_id = id;
    }

    pub fn alice_base_key(&self) -> Option<&PublicKey> {
        self.alice_base_key.as_ref()
    }

    pub fn set_alice_base_key(&mut self, key: PublicKey) {
        self.alice_base_key = Some(key);
    }

    // === Auth key и fingerprint-хэши ===

    pub fn auth_key(&self) -> &AuthKey {
        &self.auth_key
    }

    pub fn set_auth_key(&mut self, auth_key: AuthKey) {
        self.auth_key = auth_key;
    }

    pub fn fprint_hash(&self) -> &[u8] {
        &self.fprint_hash
    }

    pub fn set_fprint_hash(&mut self, hash: Vec<u8>) {
        self.fprint_hash = hash;
    }

    pub fn last_fprint_hash(&self) -> &[u8] {
        &self.last_fprint_hash
    }

    pub fn set_last_fprint_hash(&mut self, hash: Vec<u8>) {
        self.last_fprint_hash = hash;
    }
}
