use crate::consts::SENDER_KEY_INFO;
use crate::crypto::kdf::derive_secrets;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Ключ одного группового сообщения
///
/// HKDF(seed, "WhisperGroup") → iv(16) ‖ cipher key(32).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct SenderMessageKey {
    #[zeroize(skip)]
    iteration: u32,
    iv: [u8; 16],
    cipher_key: [u8; 32],
    seed: [u8; 32],
}

impl SenderMessageKey {
    pub fn derive(iteration: u32, seed: &[u8; 32]) -> Result<Self> {
        let okm = derive_secrets(seed, None, SENDER_KEY_INFO, 48)?;

        let mut iv = [0u8; 16];
        let mut cipher_key = [0u8; 32];
        iv.copy_from_slice(&okm[..16]);
        cipher_key.copy_from_slice(&okm[16..48]);

        Ok(Self {
            iteration,
            iv,
            cipher_key,
            seed: *seed,
        })
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }
}

impl fmt::Debug for SenderMessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderMessageKey")
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}
