//! Инициализация ratchet-сессии
//!
//! ## Архитектура
//!
//! Из identity-, base- и prekey-ключей обеих сторон собирается общий секрет
//! `0xFF×32 ‖ DH1 ‖ DH2 ‖ DH3 [‖ DH4]`, который HKDF превращает в
//! root key, первый chain key и auth key.
//!
//! ```text
//! Alice                                   Bob
//! -----                                   ---
//! DH(IK_a, SPK_b)                         DH(SPK_b, IK_a)
//! DH(EK_a, IK_b)                          DH(IK_b, EK_a)
//! DH(EK_a, SPK_b)                         DH(SPK_b, EK_a)
//! DH(EK_a, OPK_b)  (опционально)          DH(OPK_b, EK_a)
//!   ↓                                       ↓
//! HKDF("WhisperText") → root ‖ chain ‖ auth (одинаковые)
//!   ↓                                       ↓
//! receiver chain для RK_b                 sender chain (RK_b, chain)
//! новый RK_a + root step → sender chain
//! ```
//!
//! Параллельно строится цепочка fingerprint-хэшей: сразу после
//! инициализации `alice.last_fprint_hash == bob.fprint_hash`.

pub mod auth_key;
pub mod chain_key;
pub mod message_keys;
pub mod parameters;
pub mod root_key;

pub use auth_key::AuthKey;
pub use chain_key::ChainKey;
pub use message_keys::MessageKeys;
pub use parameters::{AliceParameters, BobParameters, SymmetricParameters};
pub use root_key::RootKey;

use crate::consts::{CURRENT_VERSION, DISCONTINUITY_BYTES, INITIAL_SECRET_INFO};
use crate::crypto::curve::{KeyPair, PublicKey};
use crate::crypto::kdf::{derive_secrets, sha512};
use crate::error::Result;
use crate::state::session_state::SessionState;
use root_key::DerivedSecrets;
use tracing::debug;
use zeroize::Zeroizing;

/// Инициализация по симметричным параметрам: роль выбирается по base-ключам
pub fn initialize_session(state: &mut SessionState, parameters: SymmetricParameters) -> Result<()> {
    if parameters.is_alice() {
        initialize_alice_session(state, &parameters.into_alice())
    } else {
        initialize_bob_session(state, &parameters.into_bob())
    }
}

/// Инициализация на стороне инициатора
pub fn initialize_alice_session(state: &mut SessionState, parameters: &AliceParameters) -> Result<()> {
    debug!(
        target: "crypto::ratchet",
        their_ratchet_key = %parameters.their_ratchet_key,
        one_time_pre_key = parameters.their_one_time_pre_key.is_some(),
        "Initializing session as Alice"
    );

    let secret = calculate_alice_secret(parameters)?;
    let (root_key, chain_key, auth_key) = derive_keys(&secret, state)?;

    let sending_ratchet_key = KeyPair::generate();
    let (sending_root_key, sending_chain_key, _) =
        root_key.create_chain(&parameters.their_ratchet_key, &sending_ratchet_key)?;

    let initial_hash = {
        let spk = parameters.their_signed_pre_key.serialize();
        let otpk = parameters.their_one_time_pre_key.map(|key| key.serialize());
        let ours = parameters.our_identity_key.identity_key().serialize();
        let theirs = parameters.their_identity_key.serialize();

        let mut parts: Vec<&[u8]> = vec![spk.as_slice()];
        if let Some(otpk) = &otpk {
            parts.push(otpk.as_slice());
        }
        parts.push(ours.as_slice());
        parts.push(theirs.as_slice());
        sha512(&parts)
    };
    let last_hash = chain_hash(&initial_hash, &parameters.their_ratchet_key);
    let current_hash = chain_hash(&last_hash, &sending_ratchet_key.public_key);

    state.set_session_version(CURRENT_VERSION);
    state.set_remote_identity_key(parameters.their_identity_key);
    state.set_local_identity_key(*parameters.our_identity_key.identity_key());
    state.add_receiver_chain(parameters.their_ratchet_key, chain_key);
    state.set_sender_chain(sending_ratchet_key, sending_chain_key);
    state.set_root_key(sending_root_key);
    state.set_auth_key(auth_key);
    state.set_last_fprint_hash(last_hash);
    state.set_fprint_hash(current_hash);

    Ok(())
}

/// Инициализация на стороне ответчика
pub fn initialize_bob_session(state: &mut SessionState, parameters: &BobParameters) -> Result<()> {
    debug!(
        target: "crypto::ratchet",
        their_base_key = %parameters.their_base_key,
        one_time_pre_key = parameters.our_one_time_pre_key.is_some(),
        "Initializing session as Bob"
    );

    let secret = calculate_bob_secret(parameters)?;
    let (root_key, chain_key, auth_key) = derive_keys(&secret, state)?;

    let initial_hash = {
        let spk = parameters.our_signed_pre_key.public_key.serialize();
        let otpk = parameters
            .our_one_time_pre_key
            .as_ref()
            .map(|pair| pair.public_key.serialize());
        let theirs = parameters.their_identity_key.serialize();
        let ours = parameters.our_identity_key.identity_key().serialize();

        let mut parts: Vec<&[u8]> = vec![spk.as_slice()];
        if let Some(otpk) = &otpk {
            parts.push(otpk.as_slice());
        }
        parts.push(theirs.as_slice());
        parts.push(ours.as_slice());
        sha512(&parts).to_vec()
    };
    let current_hash = chain_hash(&initial_hash, &parameters.our_ratchet_key.public_key);

    state.set_session_version(CURRENT_VERSION);
    state.set_remote_identity_key(parameters.their_identity_key);
    state.set_local_identity_key(*parameters.our_identity_key.identity_key());
    state.set_sender_chain(parameters.our_ratchet_key.clone(), chain_key);
    state.set_root_key(root_key);
    state.set_auth_key(auth_key);
    state.set_last_fprint_hash(initial_hash);
    state.set_fprint_hash(current_hash);

    Ok(())
}

/// Общий секрет инициатора: 0xFF×32 ‖ DH1 ‖ DH2 ‖ DH3 [‖ DH4]
pub fn calculate_alice_secret(parameters: &AliceParameters) -> Result<Zeroizing<Vec<u8>>> {
    let mut secret = Zeroizing::new(DISCONTINUITY_BYTES.to_vec());

    secret.extend_from_slice(
        &parameters
            .our_identity_key
            .private_key()
            .calculate_agreement(&parameters.their_signed_pre_key)?,
    );
    secret.extend_from_slice(
        &parameters
            .our_base_key
            .calculate_agreement(parameters.their_identity_key.public_key())?,
    );
    secret.extend_from_slice(
        &parameters
            .our_base_key
            .calculate_agreement(&parameters.their_signed_pre_key)?,
    );
    if let Some(one_time_pre_key) = &parameters.their_one_time_pre_key {
        secret.extend_from_slice(&parameters.our_base_key.calculate_agreement(one_time_pre_key)?);
    }

    Ok(secret)
}

/// Общий секрет ответчика (зеркально инициатору)
pub fn calculate_bob_secret(parameters: &BobParameters) -> Result<Zeroizing<Vec<u8>>> {
    let mut secret = Zeroizing::new(DISCONTINUITY_BYTES.to_vec());

    secret.extend_from_slice(
        &parameters
            .our_signed_pre_key
            .calculate_agreement(parameters.their_identity_key.public_key())?,
    );
    secret.extend_from_slice(
        &parameters
            .our_identity_key
            .private_key()
            .calculate_agreement(&parameters.their_base_key)?,
    );
    secret.extend_from_slice(
        &parameters
            .our_signed_pre_key
            .calculate_agreement(&parameters.their_base_key)?,
    );
    if let Some(one_time_pre_key) = &parameters.our_one_time_pre_key {
        secret.extend_from_slice(&one_time_pre_key.calculate_agreement(&parameters.their_base_key)?);
    }

    Ok(secret)
}

/// HKDF(secret, "WhisperText") → root, chain (индекс 0), auth (эпоха 0)
///
/// `last` у auth key: предыдущий auth key состояния (пустой у свежего).
fn derive_keys(secret: &[u8], state: &SessionState) -> Result<(RootKey, ChainKey, AuthKey)> {
    let okm = Zeroizing::new(derive_secrets(secret, None, INITIAL_SECRET_INFO, 96)?);
    let secrets = DerivedSecrets::split(&okm);

    Ok((
        RootKey::new(secrets.root_key),
        ChainKey::new(secrets.chain_key, 0),
        AuthKey::new(
            secrets.auth_key.to_vec(),
            state.auth_key().key().to_vec(),
            0,
        ),
    ))
}

/// Следующее звено цепочки fingerprint-хэшей: SHA512(hash ‖ key)
pub(crate) fn chain_hash(hash: &[u8], key: &PublicKey) -> Vec<u8> {
    sha512(&[hash, &key.serialize()]).to_vec()
}
