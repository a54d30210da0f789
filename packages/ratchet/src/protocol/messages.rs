// Сообщения ratchet-протокола
// SignalMessage, PreKeySignalMessage, SenderKeyMessage, SenderKeyDistributionMessage

use crate::config::Config;
use crate::crypto::curve::{PrivateKey, PublicKey};
use crate::crypto::identity::IdentityKey;
use crate::crypto::kdf::hmac_sha256;
use crate::crypto::xeddsa::SIGNATURE_SIZE;
use crate::error::{RatchetError, Result};
use crate::protocol::wire::{pack_body, split_message, unpack_body, version_byte};
use crate::state::prekey::{PreKeyId, SignedPreKeyId};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Тип шифротекста для транспорта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiphertextMessageType {
    Whisper = 2,
    PreKey = 3,
    SenderKey = 4,
    SenderKeyDistribution = 5,
}

/// Результат `SessionCipher::encrypt`
#[derive(Debug, Clone)]
pub enum CiphertextMessage {
    Signal(SignalMessage),
    PreKey(PreKeySignalMessage),
}

impl CiphertextMessage {
    pub fn message_type(&self) -> CiphertextMessageType {
        match self {
            CiphertextMessage::Signal(_) => CiphertextMessageType::Whisper,
            CiphertextMessage::PreKey(_) => CiphertextMessageType::PreKey,
        }
    }

    pub fn serialize(&self) -> &[u8] {
        match self {
            CiphertextMessage::Signal(message) => message.serialize(),
            CiphertextMessage::PreKey(message) => message.serialize(),
        }
    }
}

// ============================================================================
// SignalMessage
// ============================================================================

#[derive(Serialize, Deserialize)]
struct SignalMessageBody {
    ratchet_key: PublicKey,
    counter: u32,
    previous_counter: u32,
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
}

/// Обычное ratchet-сообщение
///
/// `[версия][тело][MAC]`, где MAC = HMAC-SHA256(mac_key,
/// identity отправителя ‖ identity получателя ‖ версия ‖ тело), усечённый.
#[derive(Debug, Clone)]
pub struct SignalMessage {
    message_version: u8,
    sender_ratchet_key: PublicKey,
    counter: u32,
    previous_counter: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SignalMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message_version: u8,
        mac_key: &[u8],
        sender_ratchet_key: PublicKey,
        counter: u32,
        previous_counter: u32,
        ciphertext: Vec<u8>,
        sender_identity_key: &IdentityKey,
        receiver_identity_key: &IdentityKey,
    ) -> Result<Self> {
        let body = SignalMessageBody {
            ratchet_key: sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext,
        };
        let mut serialized = pack_body(message_version, &body)?;
        let mac = Self::compute_mac(sender_identity_key, receiver_identity_key, mac_key, &serialized)?;
        serialized.extend_from_slice(&mac);

        Ok(Self {
            message_version,
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext: body.ciphertext,
            serialized,
        })
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (message_version, body, _) = split_message(data, Config::global().mac_length)?;
        let body: SignalMessageBody = unpack_body(body)?;

        Ok(Self {
            message_version,
            sender_ratchet_key: body.ratchet_key,
            counter: body.counter,
            previous_counter: body.previous_counter,
            ciphertext: body.ciphertext,
            serialized: data.to_vec(),
        })
    }

    /// AAD для AEAD: байт версии ‖ ratchet key ‖ counter (big-endian)
    pub fn associated_data(message_version: u8, sender_ratchet_key: &PublicKey, counter: u32) -> Vec<u8> {
        let mut aad = vec![version_byte(message_version)];
        aad.extend_from_slice(&sender_ratchet_key.serialize());
        aad.extend_from_slice(&counter.to_be_bytes());
        aad
    }

    /// Проверить MAC (сравнение за постоянное время)
    pub fn verify_mac(
        &self,
        sender_identity_key: &IdentityKey,
        receiver_identity_key: &IdentityKey,
        mac_key: &[u8],
    ) -> Result<bool> {
        let mac_length = Config::global().mac_length;
        let split = self.serialized.len() - mac_length;
        let our_mac = Self::compute_mac(
            sender_identity_key,
            receiver_identity_key,
            mac_key,
            &self.serialized[..split],
        )?;
        Ok(bool::from(our_mac.ct_eq(&self.serialized[split..])))
    }

    fn compute_mac(
        sender_identity_key: &IdentityKey,
        receiver_identity_key: &IdentityKey,
        mac_key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>> {
        let full = hmac_sha256(
            mac_key,
            &[
                &sender_identity_key.serialize(),
                &receiver_identity_key.serialize(),
                message,
            ],
        )?;
        let mac_length = Config::global().mac_length.min(full.len());
        Ok(full[..mac_length].to_vec())
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn sender_ratchet_key(&self) -> &PublicKey {
        &self.sender_ratchet_key
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn body(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }
}

// ============================================================================
// PreKeySignalMessage
// ============================================================================

#[derive(Serialize, Deserialize)]
struct PreKeySignalMessageBody {
    registration_id: u32,
    pre_key_id: Option<PreKeyId>,
    signed_pre_key_id: SignedPreKeyId,
    base_key: PublicKey,
    identity_key: IdentityKey,
    #[serde(with = "serde_bytes")]
    message: Vec<u8>,
}

/// Первое сообщение сессии: SignalMessage плюс всё, что нужно Bob'у для init
#[derive(Debug, Clone)]
pub struct PreKeySignalMessage {
    message_version: u8,
    registration_id: u32,
    pre_key_id: Option<PreKeyId>,
    signed_pre_key_id: SignedPreKeyId,
    base_key: PublicKey,
    identity_key: IdentityKey,
    message: SignalMessage,
    serialized: Vec<u8>,
}

impl PreKeySignalMessage {
    pub fn new(
        message_version: u8,
        registration_id: u32,
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: SignedPreKeyId,
        base_key: PublicKey,
        identity_key: IdentityKey,
        message: SignalMessage,
    ) -> Result<Self> {
        let body = PreKeySignalMessageBody {
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message: message.serialize().to_vec(),
        };
        let serialized = pack_body(message_version, &body)?;

        Ok(Self {
            message_version,
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message,
            serialized,
        })
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (message_version, body, _) = split_message(data, 0)?;
        let body: PreKeySignalMessageBody = unpack_body(body)?;
        let message = SignalMessage::deserialize(&body.message)?;

        Ok(Self {
            message_version,
            registration_id: body.registration_id,
            pre_key_id: body.pre_key_id,
            signed_pre_key_id: body.signed_pre_key_id,
            base_key: body.base_key,
            identity_key: body.identity_key,
            message,
            serialized: data.to_vec(),
        })
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    pub fn signed_pre_key_id(&self) -> SignedPreKeyId {
        self.signed_pre_key_id
    }

    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn message(&self) -> &SignalMessage {
        &self.message
    }

    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }
}

// ============================================================================
// SenderKeyMessage
// ============================================================================

#[derive(Serialize, Deserialize)]
struct SenderKeyMessageBody {
    key_id: u32,
    iteration: u32,
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
}

/// Групповое сообщение: `[версия][тело][XEdDSA подпись]`
#[derive(Debug, Clone)]
pub struct SenderKeyMessage {
    message_version: u8,
    key_id: u32,
    iteration: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SenderKeyMessage {
    pub fn new(
        message_version: u8,
        key_id: u32,
        iteration: u32,
        ciphertext: Vec<u8>,
        signature_key: &PrivateKey,
    ) -> Result<Self> {
        let body = SenderKeyMessageBody {
            key_id,
            iteration,
            ciphertext,
        };
        let mut serialized = pack_body(message_version, &body)?;
        let signature = signature_key.calculate_signature(&serialized);
        serialized.extend_from_slice(&signature);

        Ok(Self {
            message_version,
            key_id,
            iteration,
            ciphertext: body.ciphertext,
            serialized,
        })
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (message_version, body, _) = split_message(data, SIGNATURE_SIZE)?;
        let body: SenderKeyMessageBody = unpack_body(body)?;

        Ok(Self {
            message_version,
            key_id: body.key_id,
            iteration: body.iteration,
            ciphertext: body.ciphertext,
            serialized: data.to_vec(),
        })
    }

    pub fn verify_signature(&self, signature_key: &PublicKey) -> bool {
        let split = self.serialized.len() - SIGNATURE_SIZE;
        signature_key.verify_signature(&self.serialized[..split], &self.serialized[split..])
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }
}

// ============================================================================
// SenderKeyDistributionMessage
// ============================================================================

#[derive(Serialize, Deserialize)]
struct SenderKeyDistributionMessageBody {
    id: u32,
    iteration: u32,
    #[serde(with = "serde_bytes")]
    chain_key: Vec<u8>,
    signing_key: PublicKey,
}

/// Рассылка sender key участникам группы (через попарные сессии)
#[derive(Debug, Clone)]
pub struct SenderKeyDistributionMessage {
    message_version: u8,
    id: u32,
    iteration: u32,
    chain_key: Vec<u8>,
    signing_key: PublicKey,
    serialized: Vec<u8>,
}

impl SenderKeyDistributionMessage {
    pub fn new(
        message_version: u8,
        id: u32,
        iteration: u32,
        chain_key: Vec<u8>,
        signing_key: PublicKey,
    ) -> Result<Self> {
        check_sender_chain_key(&chain_key)?;
        let body = SenderKeyDistributionMessageBody {
            id,
            iteration,
            chain_key,
            signing_key,
        };
        let serialized = pack_body(message_version, &body)?;

        Ok(Self {
            message_version,
            id,
            iteration,
            chain_key: body.chain_key,
            signing_key,
            serialized,
        })
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (message_version, body, _) = split_message(data, 0)?;
        let body: SenderKeyDistributionMessageBody = unpack_body(body)?;
        check_sender_chain_key(&body.chain_key)?;

        Ok(Self {
            message_version,
            id: body.id,
            iteration: body.iteration,
            chain_key: body.chain_key,
            signing_key: body.signing_key,
            serialized: data.to_vec(),
        })
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn chain_key(&self) -> &[u8] {
        &self.chain_key
    }

    pub fn signing_key(&self) -> &PublicKey {
        &self.signing_key
    }

    pub fn serialize(&self) -> &[u8] {
        &self.serialized
    }
}

fn check_sender_chain_key(chain_key: &[u8]) -> Result<()> {
    if chain_key.len() != 32 {
        return Err(RatchetError::InvalidMessage(format!(
            "Bad sender chain key length: {}",
            chain_key.len()
        )));
    }
    Ok(())
}
