use crate::consts::{CHAIN_KEY_SEED, MESSAGE_KEY_SEED};
use crate::crypto::kdf::hmac_sha256;
use crate::error::Result;
use crate::groups::sender_message_key::SenderMessageKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Chain key отправителя в группе: итерация и seed
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct SenderChainKey {
    #[zeroize(skip)]
    iteration: u32,
    seed: [u8; 32],
}

impl SenderChainKey {
    pub fn new(iteration: u32, seed: [u8; 32]) -> Self {
        Self { iteration, seed }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Ключ сообщения для текущей итерации (seed = HMAC(seed, 0x01))
    pub fn sender_message_key(&self) -> Result<SenderMessageKey> {
        SenderMessageKey::derive(self.iteration, &hmac_sha256(&self.seed, &[&[MESSAGE_KEY_SEED]])?)
    }

    /// HMAC(seed, 0x02), итерация + 1
    pub fn next(&self) -> Result<SenderChainKey> {
        Ok(SenderChainKey::new(
            self.iteration + 1,
            hmac_sha256(&self.seed, &[&[CHAIN_KEY_SEED]])?,
        ))
    }
}

impl fmt::Debug for SenderChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderChainKey")
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}
