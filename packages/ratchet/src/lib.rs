// Construct Messenger Ratchet
// Session ratchet core: X3DH bootstrap, Double Ratchet, sender keys, fingerprints

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

// Модули
pub mod config;
pub mod consts;
pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod groups;
pub mod protocol;
pub mod ratchet;
pub mod session;
pub mod state;

// Re-exports для удобства
pub use crypto::curve::{KeyPair, PrivateKey, PublicKey};
pub use crypto::identity::{IdentityKey, IdentityKeyPair};
pub use error::{RatchetError, Result};
pub use fingerprint::{Fingerprint, FingerprintGenerator, NumericFingerprintGenerator};
pub use groups::{GroupCipher, GroupSessionBuilder, SenderKeyRecord};
pub use protocol::{
    CiphertextMessage, CiphertextMessageType, PreKeySignalMessage, SenderKeyDistributionMessage,
    SenderKeyMessage, SignalMessage,
};
pub use session::{SessionBuilder, SessionCipher};
pub use state::{
    Direction, InMemoryProtocolStore, PreKeyBundle, PreKeyRecord, ProtocolAddress, ProtocolStore,
    SenderKeyName, SessionRecord, SessionState, SignedPreKeyRecord,
};
