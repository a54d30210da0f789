// Scannable fingerprint: protobuf payload для QR-кода
// Схема: proto/fingerprint.proto

use crate::error::{RatchetError, Result};
use prost::Message;
use subtle::ConstantTimeEq;

/// Длина digest'а одной стороны в payload'е
const FINGERPRINT_CONTENT_LENGTH: usize = 32;

#[derive(Clone, PartialEq, Message)]
pub struct LogicalFingerprint {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub content: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CombinedFingerprints {
    #[prost(uint32, optional, tag = "1")]
    pub version: Option<u32>,
    #[prost(message, optional, tag = "2")]
    pub local_fingerprint: Option<LogicalFingerprint>,
    #[prost(message, optional, tag = "3")]
    pub remote_fingerprint: Option<LogicalFingerprint>,
}

/// Однострочная форма старых клиентов: одна identity, один digest
#[derive(Clone, PartialEq, Message)]
pub struct LegacyFingerprint {
    #[prost(uint32, optional, tag = "1")]
    pub version: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub digest: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ScannableFingerprint {
    version: u32,
    local_fingerprint: Vec<u8>,
    remote_fingerprint: Vec<u8>,
}

impl ScannableFingerprint {
    pub(crate) fn new(version: u32, local_fingerprint: &[u8], remote_fingerprint: &[u8]) -> Self {
        Self {
            version,
            local_fingerprint: truncate(local_fingerprint),
            remote_fingerprint: truncate(remote_fingerprint),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn serialize(&self) -> Vec<u8> {
        CombinedFingerprints {
            version: Some(self.version),
            local_fingerprint: Some(LogicalFingerprint {
                content: Some(self.local_fingerprint.clone()),
            }),
            remote_fingerprint: Some(LogicalFingerprint {
                content: Some(self.remote_fingerprint.clone()),
            }),
        }
        .encode_to_vec()
    }

    /// Только наш digest в legacy-форме
    pub fn serialize_legacy(&self) -> Vec<u8> {
        LegacyFingerprint {
            version: Some(self.version),
            digest: Some(self.local_fingerprint.clone()),
        }
        .encode_to_vec()
    }

    /// Сравнить со сканированным payload'ом собеседника
    ///
    /// Совпадение: наш local == их remote и наш remote == их local.
    /// Другая версия или пустой local → `FingerprintVersionMismatch`.
    pub fn compare_to(&self, scanned: &[u8]) -> Result<bool> {
        let scanned = CombinedFingerprints::decode(scanned)?;

        let their_local = match (scanned.version, &scanned.local_fingerprint) {
            (Some(version), Some(local)) if version == self.version => local,
            _ => {
                return Err(RatchetError::FingerprintVersionMismatch {
                    theirs: scanned.version.unwrap_or(0),
                    ours: self.version,
                })
            }
        };
        let their_remote = scanned
            .remote_fingerprint
            .as_ref()
            .and_then(|remote| remote.content.as_deref())
            .unwrap_or_default();
        let their_local = their_local.content.as_deref().unwrap_or_default();

        let local_matches = self.local_fingerprint.ct_eq(their_remote);
        let remote_matches = self.remote_fingerprint.ct_eq(their_local);
        Ok(bool::from(local_matches & remote_matches))
    }
}

fn truncate(fingerprint: &[u8]) -> Vec<u8> {
    fingerprint[..fingerprint.len().min(FINGERPRINT_CONTENT_LENGTH)].to_vec()
}
