//! Шифрование и расшифровка попарных сообщений
//!
//! ## Key Responsibilities
//!
//! - Symmetric ratchet: ключи сообщения из sender/receiver chain
//! - DH ratchet: два root step при новом ratchet-ключе собеседника
//! - Skipped keys: кэш для out-of-order сообщений, повтор → `DuplicateMessage`
//! - Archived states: сообщение пробуется на текущем и на архивных состояниях
//!
//! Все операции держат блокировку хранилища на весь read-modify-write,
//! состояние сохраняется только после успешной расшифровки.

use crate::config::Config;
use crate::crypto::aead;
use crate::crypto::curve::{KeyPair, PublicKey};
use crate::crypto::identity::IdentityKey;
use crate::error::{RatchetError, Result};
use crate::protocol::messages::{CiphertextMessage, PreKeySignalMessage, SignalMessage};
use crate::ratchet::{chain_hash, ChainKey, MessageKeys};
use crate::session::builder;
use crate::state::address::ProtocolAddress;
use crate::state::session_record::SessionRecord;
use crate::state::session_state::SessionState;
use crate::state::store::{Direction, ProtocolStore};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

pub struct SessionCipher<S: ProtocolStore> {
    store: Arc<Mutex<S>>,
    remote_address: ProtocolAddress,
}

impl<S: ProtocolStore> SessionCipher<S> {
    pub fn new(store: Arc<Mutex<S>>, remote_address: ProtocolAddress) -> Self {
        Self {
            store,
            remote_address,
        }
    }

    pub fn remote_address(&self) -> &ProtocolAddress {
        &self.remote_address
    }

    /// Зашифровать сообщение текущей sender chain
    ///
    /// Пока собеседник не ответил, результатом будет `PreKeySignalMessage`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<CiphertextMessage> {
        let mut store = self.store.lock()?;
        let mut record = store.load_session(&self.remote_address)?;
        if record.is_fresh() {
            return Err(RatchetError::NoSession(self.remote_address.to_string()));
        }

        let state = record.session_state_mut();
        let (local_identity_key, remote_identity_key) = identity_keys(state)?;

        if !store.is_trusted_identity(&self.remote_address, &remote_identity_key, Direction::Sending)? {
            return Err(RatchetError::UntrustedIdentity(self.remote_address.to_string()));
        }

        let chain_key = state.sender_chain_key()?.clone();
        let message_keys = chain_key.message_keys()?;
        let sender_ratchet_key = *state.sender_ratchet_key()?;
        let session_version = state.session_version();

        let ciphertext = aead::encrypt(
            message_keys.cipher_key(),
            message_keys.iv(),
            plaintext,
            &SignalMessage::associated_data(session_version, &sender_ratchet_key, chain_key.index()),
        )?;

        let signal_message = SignalMessage::new(
            session_version,
            message_keys.mac_key(),
            sender_ratchet_key,
            chain_key.index(),
            state.previous_counter(),
            ciphertext,
            &local_identity_key,
            &remote_identity_key,
        )?;

        let message = match state.unacknowledged_pre_key_message().cloned() {
            Some(pending) => CiphertextMessage::PreKey(PreKeySignalMessage::new(
                session_version,
                state.local_registration_id(),
                pending.pre_key_id,
                pending.signed_pre_key_id,
                pending.base_key,
                local_identity_key,
                signal_message,
            )?),
            None => CiphertextMessage::Signal(signal_message),
        };

        state.set_sender_chain_key(chain_key.next()?)?;
        store.store_session(&self.remote_address, &record)?;

        trace!(
            target: "crypto::session_cipher",
            remote = %self.remote_address,
            counter = chain_key.index(),
            message_type = ?message.message_type(),
            "Encrypted message"
        );
        Ok(message)
    }

    /// Расшифровать первое сообщение сессии, построив её при необходимости
    pub fn decrypt_pre_key_message(&self, message: &PreKeySignalMessage) -> Result<Vec<u8>> {
        self.decrypt_pre_key_message_with_callback(message, |_| Ok(()))
    }

    /// `callback` получает plaintext до сохранения состояния; ошибка callback'а
    /// отменяет всю операцию
    pub fn decrypt_pre_key_message_with_callback<F>(
        &self,
        message: &PreKeySignalMessage,
        callback: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let mut store = self.store.lock()?;
        let mut record = store.load_session(&self.remote_address)?;

        let unsigned_pre_key_id =
            builder::process_pre_key_message(&mut *store, &self.remote_address, &mut record, message)?;
        let plaintext = decrypt_from_record(&mut record, message.message())?;

        callback(&plaintext)?;
        store.store_session(&self.remote_address, &record)?;

        if let Some(pre_key_id) = unsigned_pre_key_id {
            store.remove_pre_key(pre_key_id)?;
            debug!(
                target: "crypto::session_cipher",
                pre_key_id = pre_key_id,
                "Removed used one-time prekey"
            );
        }

        Ok(plaintext)
    }

    /// Расшифровать обычное сообщение существующей сессии
    pub fn decrypt_message(&self, message: &SignalMessage) -> Result<Vec<u8>> {
        self.decrypt_message_with_callback(message, |_| Ok(()))
    }

    pub fn decrypt_message_with_callback<F>(&self, message: &SignalMessage, callback: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let mut store = self.store.lock()?;
        let mut record = store.load_session(&self.remote_address)?;
        if record.is_fresh() {
            return Err(RatchetError::NoSession(self.remote_address.to_string()));
        }

        let plaintext = decrypt_from_record(&mut record, message)?;

        callback(&plaintext)?;
        store.store_session(&self.remote_address, &record)?;

        Ok(plaintext)
    }

    pub fn remote_registration_id(&self) -> Result<u32> {
        let record = self.load_existing_record()?;
        Ok(record.session_state().remote_registration_id())
    }

    pub fn session_version(&self) -> Result<u8> {
        let record = self.load_existing_record()?;
        Ok(record.session_state().session_version())
    }

    fn load_existing_record(&self) -> Result<SessionRecord> {
        let store = self.store.lock()?;
        let record = store.load_session(&self.remote_address)?;
        if record.is_fresh() {
            return Err(RatchetError::NoSession(self.remote_address.to_string()));
        }
        Ok(record)
    }
}

/// Попробовать текущее состояние, затем архивные; успешное становится текущим
fn decrypt_from_record(record: &mut SessionRecord, message: &SignalMessage) -> Result<Vec<u8>> {
    let mut current = record.session_state().clone();
    match decrypt_from_state(&mut current, message) {
        Ok(plaintext) => {
            record.set_state(current);
            return Ok(plaintext);
        }
        Err(e @ RatchetError::DuplicateMessage { .. }) => return Err(e),
        Err(e) => {
            trace!(target: "crypto::session_cipher", error = %e, "Current state failed");
        }
    }

    let mut promoted = None;
    for (index, previous) in record.previous_session_states().enumerate() {
        let mut candidate = previous.clone();
        match decrypt_from_state(&mut candidate, message) {
            Ok(plaintext) => {
                promoted = Some((index, candidate, plaintext));
                break;
            }
            Err(e @ RatchetError::DuplicateMessage { .. }) => return Err(e),
            Err(e) => {
                trace!(target: "crypto::session_cipher", index = index, error = %e, "Archived state failed");
            }
        }
    }

    match promoted {
        Some((index, state, plaintext)) => {
            debug!(
                target: "crypto::session_cipher",
                index = index,
                "Decrypted with archived state, promoting"
            );
            record.promote_archived_state(index, state);
            Ok(plaintext)
        }
        None => Err(RatchetError::InvalidMessage("No valid sessions".to_string())),
    }
}

fn decrypt_from_state(state: &mut SessionState, message: &SignalMessage) -> Result<Vec<u8>> {
    if !state.has_sender_chain() {
        return Err(RatchetError::InvalidMessage("Uninitialized session".to_string()));
    }
    if message.message_version() != state.session_version() {
        return Err(RatchetError::InvalidMessage(format!(
            "Message version {}, but session version {}",
            message.message_version(),
            state.session_version()
        )));
    }

    let their_ratchet_key = message.sender_ratchet_key();
    let counter = message.counter();
    let chain_key = receiver_chain_key(state, their_ratchet_key)?;
    let message_keys = message_keys(state, their_ratchet_key, &chain_key, counter)?;

    let (local_identity_key, remote_identity_key) = identity_keys(state)?;
    if !message.verify_mac(&remote_identity_key, &local_identity_key, message_keys.mac_key())? {
        return Err(RatchetError::InvalidMessage("Bad MAC".to_string()));
    }

    let plaintext = aead::decrypt(
        message_keys.cipher_key(),
        message_keys.iv(),
        message.body(),
        &SignalMessage::associated_data(message.message_version(), their_ratchet_key, counter),
    )?;

    state.clear_unacknowledged_pre_key_message();
    Ok(plaintext)
}

/// Receiver chain для ratchet-ключа собеседника; новый ключ вызывает DH ratchet
fn receiver_chain_key(state: &mut SessionState, their_ratchet_key: &PublicKey) -> Result<ChainKey> {
    if let Some(chain_key) = state.receiver_chain_key(their_ratchet_key) {
        return Ok(chain_key.clone());
    }

    let root_key = state.root_key()?.clone();
    let our_ratchet_key = state.sender_ratchet_key_pair()?.clone();

    let (receiver_root_key, receiver_chain_key, receiver_auth_key) =
        root_key.create_chain(their_ratchet_key, &our_ratchet_key)?;
    let our_new_ratchet_key = KeyPair::generate();
    let (sender_root_key, sender_chain_key, sender_auth_key) =
        receiver_root_key.create_chain(their_ratchet_key, &our_new_ratchet_key)?;

    let previous_counter = state.sender_chain_key()?.index().saturating_sub(1);
    let receiving_hash = chain_hash(state.fprint_hash(), their_ratchet_key);
    let sending_hash = chain_hash(&receiving_hash, &our_new_ratchet_key.public_key);
    let auth_key = state
        .auth_key()
        .advance(receiver_auth_key.key())
        .advance(sender_auth_key.key());

    debug!(
        target: "crypto::ratchet",
        their_ratchet_key = %their_ratchet_key,
        our_ratchet_key = %our_new_ratchet_key.public_key,
        epoch = auth_key.index(),
        "DH ratchet step"
    );

    state.set_root_key(sender_root_key);
    state.add_receiver_chain(*their_ratchet_key, receiver_chain_key.clone());
    state.set_previous_counter(previous_counter);
    state.set_sender_chain(our_new_ratchet_key, sender_chain_key);
    state.set_last_fprint_hash(receiving_hash);
    state.set_fprint_hash(sending_hash);
    state.set_auth_key(auth_key);

    Ok(receiver_chain_key)
}

/// Ключи сообщения `counter`: из кэша пропущенных или сдвигом цепочки
fn message_keys(
    state: &mut SessionState,
    their_ratchet_key: &PublicKey,
    chain_key: &ChainKey,
    counter: u32,
) -> Result<MessageKeys> {
    if chain_key.index() > counter {
        return state
            .remove_message_keys(their_ratchet_key, counter)
            .ok_or(RatchetError::DuplicateMessage {
                chain_index: chain_key.index(),
                counter,
            });
    }

    let max_forward_jumps = Config::global().max_forward_jumps;
    if counter - chain_key.index() > max_forward_jumps {
        return Err(RatchetError::InvalidMessage(format!(
            "Over {} messages into the future",
            max_forward_jumps
        )));
    }

    let mut chain_key = chain_key.clone();
    while chain_key.index() < counter {
        state.set_message_keys(their_ratchet_key, chain_key.message_keys()?)?;
        chain_key = chain_key.next()?;
    }

    state.set_receiver_chain_key(their_ratchet_key, chain_key.next()?)?;
    chain_key.message_keys()
}

fn identity_keys(state: &SessionState) -> Result<(IdentityKey, IdentityKey)> {
    let local = state
        .local_identity_key()
        .copied()
        .ok_or_else(|| RatchetError::NoSession("local identity key not set".to_string()))?;
    let remote = state
        .remote_identity_key()
        .copied()
        .ok_or_else(|| RatchetError::NoSession("remote identity key not set".to_string()))?;
    Ok((local, remote))
}
