//! Протокольные сообщения и их wire format

pub mod messages;
pub mod wire;

pub use messages::{
    CiphertextMessage, CiphertextMessageType, PreKeySignalMessage, SenderKeyDistributionMessage,
    SenderKeyMessage, SignalMessage,
};
