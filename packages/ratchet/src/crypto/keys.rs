// Генерация ключевого материала устройства
// Identity, registration id, одноразовые и signed prekeys, sender keys

use crate::crypto::curve::KeyPair;
use crate::crypto::identity::IdentityKeyPair;
use crate::state::prekey::{PreKeyId, PreKeyRecord, SignedPreKeyId, SignedPreKeyRecord};
use rand::rngs::OsRng;
use rand::Rng;
use rand_core::RngCore;
use tracing::debug;

/// Максимальный registration id (14 бит)
pub const MAX_REGISTRATION_ID: u32 = 16380;

/// Prekey id живут в диапазоне [1, PRE_KEY_MEDIUM_MAX_VALUE)
pub const PRE_KEY_MEDIUM_MAX_VALUE: u32 = 0xFF_FFFF;

/// Сгенерировать долговременную identity-пару (один раз при установке)
pub fn generate_identity_key_pair() -> IdentityKeyPair {
    debug!(target: "crypto::keys", "Generating identity key pair");
    IdentityKeyPair::generate()
}

/// Сгенерировать registration id в диапазоне [1, MAX_REGISTRATION_ID]
pub fn generate_registration_id() -> u32 {
    OsRng.gen_range(1..=MAX_REGISTRATION_ID)
}

/// Сгенерировать `count` одноразовых prekeys начиная с `start`
///
/// Id переходят через ноль по модулю `PRE_KEY_MEDIUM_MAX_VALUE - 1` и никогда не равны 0.
pub fn generate_pre_keys(start: PreKeyId, count: u32) -> Vec<PreKeyRecord> {
    debug!(target: "crypto::keys", start = start, count = count, "Generating one-time prekeys");

    let start = start.saturating_sub(1);
    (0..count)
        .map(|i| {
            let id = (start.wrapping_add(i) % (PRE_KEY_MEDIUM_MAX_VALUE - 1)) + 1;
            PreKeyRecord::new(id, KeyPair::generate())
        })
        .collect()
}

/// Сгенерировать signed prekey, подписанный identity-ключом (XEdDSA)
pub fn generate_signed_pre_key(
    identity_key_pair: &IdentityKeyPair,
    signed_pre_key_id: SignedPreKeyId,
) -> SignedPreKeyRecord {
    let key_pair = KeyPair::generate();
    let signature = identity_key_pair
        .private_key()
        .calculate_signature(&key_pair.public_key.serialize());

    debug!(
        target: "crypto::keys",
        signed_pre_key_id = signed_pre_key_id,
        public_key = %key_pair.public_key,
        "Generated signed prekey"
    );

    SignedPreKeyRecord::new(signed_pre_key_id, current_timestamp_millis(), key_pair, signature.to_vec())
}

/// Id sender key в диапазоне [0, i32::MAX)
pub fn generate_sender_key_id() -> u32 {
    OsRng.gen_range(0..i32::MAX as u32)
}

/// Случайный seed sender chain key
pub fn generate_sender_key() -> [u8; 32] {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    seed
}

/// Пара ключей подписи sender key
pub fn generate_sender_signing_key() -> KeyPair {
    KeyPair::generate()
}

fn current_timestamp_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
