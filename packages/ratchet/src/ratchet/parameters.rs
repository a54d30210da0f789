//! Входные данные для инициализации сессии

use crate::crypto::curve::{KeyPair, PublicKey};
use crate::crypto::identity::{IdentityKey, IdentityKeyPair};

/// Параметры инициатора (Alice)
#[derive(Clone, Debug)]
pub struct AliceParameters {
    pub our_identity_key: IdentityKeyPair,
    pub our_base_key: KeyPair,
    pub their_identity_key: IdentityKey,
    pub their_signed_pre_key: PublicKey,
    pub their_one_time_pre_key: Option<PublicKey>,
    pub their_ratchet_key: PublicKey,
}

/// Параметры ответчика (Bob)
#[derive(Clone, Debug)]
pub struct BobParameters {
    pub our_identity_key: IdentityKeyPair,
    pub our_signed_pre_key: KeyPair,
    pub our_one_time_pre_key: Option<KeyPair>,
    pub our_ratchet_key: KeyPair,
    pub their_identity_key: IdentityKey,
    pub their_base_key: PublicKey,
}

/// Параметры симметричной инициализации
///
/// Обе стороны обменялись base/ratchet ключами; роль определяется
/// сравнением base-ключей.
#[derive(Clone, Debug)]
pub struct SymmetricParameters {
    pub our_identity_key: IdentityKeyPair,
    pub our_base_key: KeyPair,
    pub our_ratchet_key: KeyPair,
    pub their_identity_key: IdentityKey,
    pub their_base_key: PublicKey,
    pub their_ratchet_key: PublicKey,
}

impl SymmetricParameters {
    /// Мы Alice, если наш base key меньше по сериализованным байтам
    pub fn is_alice(&self) -> bool {
        self.our_base_key.public_key < self.their_base_key
    }

    pub fn into_alice(self) -> AliceParameters {
        AliceParameters {
            our_identity_key: self.our_identity_key,
            our_base_key: self.our_base_key,
            their_identity_key: self.their_identity_key,
            their_signed_pre_key: self.their_base_key,
            their_one_time_pre_key: None,
            their_ratchet_key: self.their_ratchet_key,
        }
    }

    pub fn into_bob(self) -> BobParameters {
        BobParameters {
            our_identity_key: self.our_identity_key,
            our_signed_pre_key: self.our_base_key,
            our_one_time_pre_key: None,
            our_ratchet_key: self.our_ratchet_key,
            their_identity_key: self.their_identity_key,
            their_base_key: self.their_base_key,
        }
    }
}
