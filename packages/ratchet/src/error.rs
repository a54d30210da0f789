use thiserror::Error;

/// Ошибки ratchet-ядра
///
/// `DuplicateMessage` означает повтор или уже использованный счётчик;
/// состояние сессии при этом не меняется.
#[derive(Error, Debug)]
pub enum RatchetError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("No local key with id {0}")]
    InvalidKeyId(u32),

    #[error("Untrusted identity key for {0}")]
    UntrustedIdentity(String),

    #[error("Duplicate message: chain index {chain_index}, counter {counter}")]
    DuplicateMessage { chain_index: u32, counter: u32 },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Legacy message version: {0}")]
    LegacyMessage(u8),

    #[error("Unsupported message version: {0}")]
    InvalidVersion(u8),

    #[error("No session for {0}")]
    NoSession(String),

    #[error("Fingerprint version mismatch: theirs {theirs}, ours {ours}")]
    FingerprintVersionMismatch { theirs: u32, ours: u32 },

    #[error("Fingerprint parsing error: {0}")]
    FingerprintParsing(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl From<bincode::Error> for RatchetError {
    fn from(err: bincode::Error) -> Self {
        RatchetError::Serialization(err.to_string())
    }
}

impl From<prost::DecodeError> for RatchetError {
    fn from(err: prost::DecodeError) -> Self {
        RatchetError::FingerprintParsing(err.to_string())
    }
}

impl From<chacha20poly1305::Error> for RatchetError {
    fn from(err: chacha20poly1305::Error) -> Self {
        RatchetError::InvalidMessage(format!("AEAD failure: {}", err))
    }
}

impl<T> From<std::sync::PoisonError<T>> for RatchetError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        RatchetError::LockPoisoned
    }
}

pub type Result<T> = std::result::Result<T, RatchetError>;
