//! Шифрование групповых сообщений sender key'ем
//!
//! Отправитель шифрует один раз своим chain key и подписывает сообщение;
//! получатели держат копию цепочки и сдвигают её при расшифровке.

use crate::config::Config;
use crate::consts::CURRENT_VERSION;
use crate::crypto::aead;
use crate::error::{RatchetError, Result};
use crate::groups::sender_key_state::SenderKeyState;
use crate::groups::sender_message_key::SenderMessageKey;
use crate::protocol::messages::SenderKeyMessage;
use crate::state::address::SenderKeyName;
use crate::state::store::SenderKeyStore;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

pub struct GroupCipher<S: SenderKeyStore> {
    store: Arc<Mutex<S>>,
    sender_key_name: SenderKeyName,
}

impl<S: SenderKeyStore> GroupCipher<S> {
    pub fn new(store: Arc<Mutex<S>>, sender_key_name: SenderKeyName) -> Self {
        Self {
            store,
            sender_key_name,
        }
    }

    /// Зашифровать и подписать сообщение для группы
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut store = self.store.lock()?;
        let mut record = store.load_sender_key(&self.sender_key_name)?;
        let state = record.sender_key_state_mut().map_err(|_| {
            RatchetError::NoSession(format!("no sender key for {}", self.sender_key_name))
        })?;

        let chain_key = state.sender_chain_key().clone();
        let message_key = chain_key.sender_message_key()?;
        let ciphertext = aead::encrypt(
            message_key.cipher_key(),
            message_key.iv(),
            plaintext,
            &associated_data(state.key_id(), message_key.iteration()),
        )?;

        let message = SenderKeyMessage::new(
            CURRENT_VERSION,
            state.key_id(),
            message_key.iteration(),
            ciphertext,
            state.signing_key_private()?,
        )?;

        state.set_sender_chain_key(chain_key.next()?);
        store.store_sender_key(&self.sender_key_name, &record)?;

        trace!(
            target: "crypto::group_cipher",
            iteration = message_key.iteration(),
            "Encrypted group message"
        );
        Ok(message.serialize().to_vec())
    }

    /// Проверить подпись и расшифровать групповое сообщение
    pub fn decrypt(&self, sender_key_message_bytes: &[u8]) -> Result<Vec<u8>> {
        self.decrypt_with_callback(sender_key_message_bytes, |_| Ok(()))
    }

    /// То же, что `decrypt`, но `callback` получает plaintext до сохранения состояния
    pub fn decrypt_with_callback<F>(&self, sender_key_message_bytes: &[u8], callback: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let mut store = self.store.lock()?;
        let mut record = store.load_sender_key(&self.sender_key_name)?;
        if record.is_empty() {
            return Err(RatchetError::NoSession(format!(
                "no sender key for {}",
                self.sender_key_name
            )));
        }

        let message = SenderKeyMessage::deserialize(sender_key_message_bytes)?;
        let state = record.sender_key_state_by_id_mut(message.key_id())?;

        if !message.verify_signature(state.signing_key_public()) {
            debug!(
                target: "crypto::group_cipher",
                sender = %self.sender_key_name,
                "Sender key signature verification failed"
            );
            return Err(RatchetError::InvalidMessage("Bad sender key signature".to_string()));
        }

        let message_key = sender_message_key(state, message.iteration())?;
        let plaintext = aead::decrypt(
            message_key.cipher_key(),
            message_key.iv(),
            message.ciphertext(),
            &associated_data(message.key_id(), message.iteration()),
        )?;

        callback(&plaintext)?;
        store.store_sender_key(&self.sender_key_name, &record)?;

        trace!(
            target: "crypto::group_cipher",
            iteration = message.iteration(),
            "Decrypted group message"
        );
        Ok(plaintext)
    }
}

/// Ключ для итерации `iteration`: из кэша, либо сдвигом цепочки вперёд
fn sender_message_key(state: &mut SenderKeyState, iteration: u32) -> Result<SenderMessageKey> {
    let mut chain_key = state.sender_chain_key().clone();

    if chain_key.iteration() > iteration {
        return state.remove_sender_message_key(iteration).ok_or(
            RatchetError::DuplicateMessage {
                chain_index: chain_key.iteration(),
                counter: iteration,
            },
        );
    }

    if iteration - chain_key.iteration() > Config::global().max_forward_jumps {
        return Err(RatchetError::InvalidMessage(format!(
            "Over {} messages into the future",
            Config::global().max_forward_jumps
        )));
    }

    while chain_key.iteration() < iteration {
        state.add_sender_message_key(chain_key.sender_message_key()?);
        chain_key = chain_key.next()?;
    }

    state.set_sender_chain_key(chain_key.next()?);
    chain_key.sender_message_key()
}

fn associated_data(key_id: u32, iteration: u32) -> [u8; 8] {
    let mut aad = [0u8; 8];
    aad[..4].copy_from_slice(&key_id.to_be_bytes());
    aad[4..].copy_from_slice(&iteration.to_be_bytes());
    aad
}
