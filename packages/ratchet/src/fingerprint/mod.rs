//! Fingerprints для out-of-band проверки собеседника
//!
//! Fingerprint строится из auth key обеих сторон и chained hash сессии.
//! Обе стороны получают одинаковый displayable (60 цифр) и зеркальные
//! scannable payload'ы: local одной стороны равен remote другой.

pub mod displayable;
pub mod generator;
pub mod scannable;

pub use displayable::DisplayableFingerprint;
pub use generator::NumericFingerprintGenerator;
pub use scannable::ScannableFingerprint;

use crate::error::{RatchetError, Result};
use crate::ratchet::AuthKey;

/// Пара (displayable, scannable); неизменяема после создания
#[derive(Debug, Clone)]
pub struct Fingerprint {
    displayable: DisplayableFingerprint,
    scannable: ScannableFingerprint,
}

impl Fingerprint {
    pub fn new(displayable: DisplayableFingerprint, scannable: ScannableFingerprint) -> Self {
        Self {
            displayable,
            scannable,
        }
    }

    pub fn displayable(&self) -> &DisplayableFingerprint {
        &self.displayable
    }

    pub fn scannable(&self) -> &ScannableFingerprint {
        &self.scannable
    }
}

pub trait FingerprintGenerator {
    /// Fingerprint для одной пары auth key
    ///
    /// `use_last_epoch` берёт `last_key` вместо текущего ключа с обеих сторон.
    fn create_for(
        &self,
        version: u32,
        local_auth_key: &AuthKey,
        remote_auth_key: &AuthKey,
        chained_hash: &[u8],
        use_last_epoch: bool,
    ) -> Result<Fingerprint>;

    /// Fingerprint для логических identity с несколькими устройствами
    ///
    /// Каждый список сводится к одному ключу (максимальному по байтам ключа),
    /// дальше работает одиночный вариант.
    fn create_for_list(
        &self,
        version: u32,
        local_auth_keys: &[AuthKey],
        remote_auth_keys: &[AuthKey],
        chained_hash: &[u8],
        use_last_epoch: bool,
    ) -> Result<Fingerprint> {
        let local = canonical_auth_key(local_auth_keys)?;
        let remote = canonical_auth_key(remote_auth_keys)?;
        self.create_for(version, local, remote, chained_hash, use_last_epoch)
    }
}

fn canonical_auth_key(auth_keys: &[AuthKey]) -> Result<&AuthKey> {
    auth_keys
        .iter()
        .max_by(|a, b| a.key().cmp(b.key()))
        .ok_or_else(|| RatchetError::InvalidKey("empty auth key list".to_string()))
}
