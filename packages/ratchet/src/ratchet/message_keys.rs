use crate::consts::MESSAGE_KEYS_INFO;
use crate::crypto::kdf::derive_secrets;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const CIPHER_KEY_LENGTH: usize = 32;
pub const MAC_KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;

/// Ключи одного сообщения: cipher key, MAC key, IV и счётчик, который их породил
///
/// Используются не более одного раза.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct MessageKeys {
    cipher_key: [u8; CIPHER_KEY_LENGTH],
    mac_key: [u8; MAC_KEY_LENGTH],
    iv: [u8; IV_LENGTH],
    counter: u32,
}

impl MessageKeys {
    pub fn new(
        cipher_key: [u8; CIPHER_KEY_LENGTH],
        mac_key: [u8; MAC_KEY_LENGTH],
        iv: [u8; IV_LENGTH],
        counter: u32,
    ) -> Self {
        Self {
            cipher_key,
            mac_key,
            iv,
            counter,
        }
    }

    /// HKDF(seed, "WhisperMessageKeys") → cipher(32) ‖ mac(32) ‖ iv(16)
    pub fn derive(seed: &[u8], counter: u32) -> Result<Self> {
        let okm = derive_secrets(
            seed,
            None,
            MESSAGE_KEYS_INFO,
            CIPHER_KEY_LENGTH + MAC_KEY_LENGTH + IV_LENGTH,
        )?;

        let mut cipher_key = [0u8; CIPHER_KEY_LENGTH];
        let mut mac_key = [0u8; MAC_KEY_LENGTH];
        let mut iv = [0u8; IV_LENGTH];
        cipher_key.copy_from_slice(&okm[..CIPHER_KEY_LENGTH]);
        mac_key.copy_from_slice(&okm[CIPHER_KEY_LENGTH..CIPHER_KEY_LENGTH + MAC_KEY_LENGTH]);
        iv.copy_from_slice(&okm[CIPHER_KEY_LENGTH + MAC_KEY_LENGTH..]);

        Ok(Self::new(cipher_key, mac_key, iv, counter))
    }

    pub fn cipher_key(&self) -> &[u8; CIPHER_KEY_LENGTH] {
        &self.cipher_key
    }

    pub fn mac_key(&self) -> &[u8; MAC_KEY_LENGTH] {
        &self.mac_key
    }

    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }
}

impl fmt::Debug for MessageKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageKeys")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}
