use super::{DisplayableFingerprint, Fingerprint, FingerprintGenerator, ScannableFingerprint};
use crate::config::Config;
use crate::consts::FINGERPRINT_VERSION;
use crate::crypto::kdf::{hmac_sha256, sha512};
use crate::error::Result;
use crate::ratchet::AuthKey;
use tracing::trace;

/// Генератор 60-значных числовых fingerprint'ов
///
/// Число итераций должно совпадать у всех клиентов сети:
/// - 1024 ~ 109.7 бит
/// - 1400 > 110 бит
/// - 5200 > 112 бит
#[derive(Debug, Clone, Copy)]
pub struct NumericFingerprintGenerator {
    iterations: u32,
}

impl NumericFingerprintGenerator {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Генератор с числом итераций из глобальной `Config`
    pub fn from_config() -> Self {
        Self::new(Config::global().fingerprint_iterations)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// `create_for` с версией scannable-формата из `Config`
    pub fn create_default(
        &self,
        local_auth_key: &AuthKey,
        remote_auth_key: &AuthKey,
        chained_hash: &[u8],
        use_last_epoch: bool,
    ) -> Result<Fingerprint> {
        self.create_for(
            Config::global().fingerprint_version,
            local_auth_key,
            remote_auth_key,
            chained_hash,
            use_last_epoch,
        )
    }

    /// Digest одной стороны
    ///
    /// `h = auth ‖ chained_hash ‖ version`, затем `iterations` раз
    /// `h = SHA512(h ‖ auth)`, в конце HMAC-SHA256 под auth key.
    fn fingerprint_digest(&self, auth_key: &[u8], chained_hash: &[u8]) -> Result<[u8; 32]> {
        let version = FINGERPRINT_VERSION.to_be_bytes();
        let mut hash = [auth_key, chained_hash, version.as_slice()].concat();

        for _ in 0..self.iterations {
            hash = sha512(&[hash.as_slice(), auth_key]).to_vec();
        }

        hmac_sha256(auth_key, &[&hash])
    }
}

impl FingerprintGenerator for NumericFingerprintGenerator {
    fn create_for(
        &self,
        version: u32,
        local_auth_key: &AuthKey,
        remote_auth_key: &AuthKey,
        chained_hash: &[u8],
        use_last_epoch: bool,
    ) -> Result<Fingerprint> {
        let (local_key, remote_key) = if use_last_epoch {
            (local_auth_key.last_key(), remote_auth_key.last_key())
        } else {
            (local_auth_key.key(), remote_auth_key.key())
        };

        let local_fingerprint = self.fingerprint_digest(local_key, chained_hash)?;
        let remote_fingerprint = self.fingerprint_digest(remote_key, chained_hash)?;

        trace!(
            target: "crypto::fingerprint",
            version = version,
            iterations = self.iterations,
            use_last_epoch = use_last_epoch,
            "Created fingerprint"
        );

        Ok(Fingerprint::new(
            DisplayableFingerprint::new(&local_fingerprint, &remote_fingerprint),
            ScannableFingerprint::new(version, &local_fingerprint, &remote_fingerprint),
        ))
    }
}
