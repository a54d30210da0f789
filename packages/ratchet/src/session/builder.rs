//! Установка попарных сессий
//!
//! Инициатор строит сессию из `PreKeyBundle`, полученного с сервера;
//! получатель строит её из первого `PreKeySignalMessage`. В обоих случаях
//! прежнее состояние не теряется, а уходит в архив записи.

use crate::crypto::curve::KeyPair;
use crate::error::{RatchetError, Result};
use crate::protocol::messages::PreKeySignalMessage;
use crate::ratchet::{initialize_alice_session, initialize_bob_session, AliceParameters, BobParameters};
use crate::state::address::ProtocolAddress;
use crate::state::prekey::{PreKeyBundle, PreKeyId};
use crate::state::session_record::SessionRecord;
use crate::state::store::{Direction, ProtocolStore};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub struct SessionBuilder<S: ProtocolStore> {
    store: Arc<Mutex<S>>,
    remote_address: ProtocolAddress,
}

impl<S: ProtocolStore> SessionBuilder<S> {
    pub fn new(store: Arc<Mutex<S>>, remote_address: ProtocolAddress) -> Self {
        Self {
            store,
            remote_address,
        }
    }

    pub fn remote_address(&self) -> &ProtocolAddress {
        &self.remote_address
    }

    /// Построить сессию из bundle собеседника (мы Alice)
    pub fn process_bundle(&self, bundle: &PreKeyBundle) -> Result<()> {
        let mut store = self.store.lock()?;
        process_bundle(&mut *store, &self.remote_address, bundle)
    }

    /// Построить сессию из входящего prekey-сообщения (мы Bob)
    ///
    /// Запись загружается, обновляется и сохраняется под одной блокировкой
    /// хранилища. Возвращает id использованного одноразового prekey, который
    /// вызывающий удаляет после успешной расшифровки.
    pub fn process_pre_key_message(&self, message: &PreKeySignalMessage) -> Result<Option<PreKeyId>> {
        let mut store = self.store.lock()?;
        let mut record = store.load_session(&self.remote_address)?;
        let used_pre_key_id =
            process_pre_key_message(&mut *store, &self.remote_address, &mut record, message)?;
        store.store_session(&self.remote_address, &record)?;
        Ok(used_pre_key_id)
    }
}

pub(crate) fn process_pre_key_message<S: ProtocolStore>(
    store: &mut S,
    remote_address: &ProtocolAddress,
    record: &mut SessionRecord,
    message: &PreKeySignalMessage,
) -> Result<Option<PreKeyId>> {
    let their_identity_key = message.identity_key();

    if !store.is_trusted_identity(remote_address, their_identity_key, Direction::Receiving)? {
        return Err(RatchetError::UntrustedIdentity(remote_address.to_string()));
    }

    let used_pre_key_id = if record.has_session_state(message.message_version(), message.base_key()) {
        warn!(
            target: "crypto::session_builder",
            remote = %remote_address,
            "Session for this base key already exists, letting bundled message fall through"
        );
        None
    } else {
        initialize_from_pre_key_message(store, record, message)?
    };

    store.save_identity(remote_address, their_identity_key)?;
    Ok(used_pre_key_id)
}

fn initialize_from_pre_key_message<S: ProtocolStore>(
    store: &mut S,
    record: &mut SessionRecord,
    message: &PreKeySignalMessage,
) -> Result<Option<PreKeyId>> {
    let signed_pre_key = store
        .load_signed_pre_key(message.signed_pre_key_id())?
        .ok_or(RatchetError::InvalidKeyId(message.signed_pre_key_id()))?;

    let (our_one_time_pre_key, used_pre_key_id) = match message.pre_key_id() {
        Some(pre_key_id) => match store.load_pre_key(pre_key_id)? {
            Some(pre_key) => (Some(pre_key.key_pair().clone()), Some(pre_key_id)),
            None => {
                warn!(
                    target: "crypto::session_builder",
                    pre_key_id = pre_key_id,
                    "One-time prekey not found, using a fresh ephemeral key"
                );
                (Some(KeyPair::generate()), None)
            }
        },
        None => (None, None),
    };

    let parameters = BobParameters {
        our_identity_key: store.identity_key_pair()?,
        our_signed_pre_key: signed_pre_key.key_pair().clone(),
        our_one_time_pre_key,
        our_ratchet_key: signed_pre_key.key_pair().clone(),
        their_identity_key: *message.identity_key(),
        their_base_key: *message.base_key(),
    };

    if !record.is_fresh() {
        record.archive_current_state();
    }

    let state = record.session_state_mut();
    initialize_bob_session(state, &parameters)?;
    state.set_local_registration_id(store.local_registration_id()?);
    state.set_remote_registration_id(message.registration_id());
    state.set_alice_base_key(*message.base_key());

    debug!(
        target: "crypto::session_builder",
        signed_pre_key_id = message.signed_pre_key_id(),
        one_time_pre_key_id = ?used_pre_key_id,
        "Session initialized from prekey message"
    );
    Ok(used_pre_key_id)
}

pub(crate) fn process_bundle<S: ProtocolStore>(
    store: &mut S,
    remote_address: &ProtocolAddress,
    bundle: &PreKeyBundle,
) -> Result<()> {
    if !store.is_trusted_identity(remote_address, &bundle.identity_key, Direction::Sending)? {
        return Err(RatchetError::UntrustedIdentity(remote_address.to_string()));
    }

    let their_signed_pre_key = bundle
        .signed_pre_key_public
        .ok_or_else(|| RatchetError::InvalidKey("No signed prekey".to_string()))?;

    if !bundle
        .identity_key
        .public_key()
        .verify_signature(&their_signed_pre_key.serialize(), &bundle.signed_pre_key_signature)
    {
        debug!(
            target: "crypto::session_builder",
            remote = %remote_address,
            "Signed prekey signature verification failed"
        );
        return Err(RatchetError::InvalidKey(
            "Invalid signature on signed prekey".to_string(),
        ));
    }

    let mut record = store.load_session(remote_address)?;
    let our_base_key = KeyPair::generate();
    let their_one_time_pre_key_id = bundle.pre_key_public.and(bundle.pre_key_id);

    let parameters = AliceParameters {
        our_identity_key: store.identity_key_pair()?,
        our_base_key: our_base_key.clone(),
        their_identity_key: bundle.identity_key,
        their_signed_pre_key,
        their_one_time_pre_key: bundle.pre_key_public,
        their_ratchet_key: their_signed_pre_key,
    };

    if !record.is_fresh() {
        record.archive_current_state();
    }

    let state = record.session_state_mut();
    initialize_alice_session(state, &parameters)?;
    state.set_unacknowledged_pre_key_message(
        their_one_time_pre_key_id,
        bundle.signed_pre_key_id,
        our_base_key.public_key,
    );
    state.set_local_registration_id(store.local_registration_id()?);
    state.set_remote_registration_id(bundle.registration_id);
    state.set_alice_base_key(our_base_key.public_key);

    store.save_identity(remote_address, &bundle.identity_key)?;
    store.store_session(remote_address, &record)?;

    debug!(
        target: "crypto::session_builder",
        remote = %remote_address,
        base_key = %our_base_key.public_key,
        one_time_pre_key_id = ?their_one_time_pre_key_id,
        "Session initialized from prekey bundle"
    );
    Ok(())
}
