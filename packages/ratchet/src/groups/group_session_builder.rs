//! Установка групповых сессий через sender key distribution messages

use crate::consts::CURRENT_VERSION;
use crate::crypto::keys;
use crate::error::{RatchetError, Result};
use crate::protocol::messages::SenderKeyDistributionMessage;
use crate::state::address::SenderKeyName;
use crate::state::store::SenderKeyStore;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct GroupSessionBuilder<S: SenderKeyStore> {
    store: Arc<Mutex<S>>,
}

impl<S: SenderKeyStore> GroupSessionBuilder<S> {
    pub fn new(store: Arc<Mutex<S>>) -> Self {
        Self { store }
    }

    /// Принять sender key другого участника группы
    pub fn process(
        &self,
        sender_key_name: &SenderKeyName,
        message: &SenderKeyDistributionMessage,
    ) -> Result<()> {
        let mut store = self.store.lock()?;
        let mut record = store.load_sender_key(sender_key_name)?;

        let chain_key = <[u8; 32]>::try_from(message.chain_key()).map_err(|_| {
            RatchetError::InvalidMessage(format!(
                "Bad sender chain key length: {}",
                message.chain_key().len()
            ))
        })?;
        record.add_sender_key_state(message.id(), message.iteration(), chain_key, *message.signing_key());
        store.store_sender_key(sender_key_name, &record)?;

        debug!(
            target: "crypto::group_cipher",
            sender = %sender_key_name,
            key_id = message.id(),
            iteration = message.iteration(),
            "Processed sender key distribution"
        );
        Ok(())
    }

    /// Получить (при необходимости создать) свой sender key для рассылки группе
    pub fn create(&self, sender_key_name: &SenderKeyName) -> Result<SenderKeyDistributionMessage> {
        let mut store = self.store.lock()?;
        let mut record = store.load_sender_key(sender_key_name)?;

        if record.is_empty() {
            let key_id = keys::generate_sender_key_id();
            record.set_sender_key_state(
                key_id,
                0,
                keys::generate_sender_key(),
                keys::generate_sender_signing_key(),
            );
            store.store_sender_key(sender_key_name, &record)?;

            debug!(
                target: "crypto::group_cipher",
                sender = %sender_key_name,
                key_id = key_id,
                "Created new sender key"
            );
        }

        let state = record.sender_key_state()?;
        SenderKeyDistributionMessage::new(
            CURRENT_VERSION,
            state.key_id(),
            state.sender_chain_key().iteration(),
            state.sender_chain_key().seed().to_vec(),
            *state.signing_key_public(),
        )
    }
}
