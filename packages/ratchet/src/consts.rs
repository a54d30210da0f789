//! Протокольные константы
//!
//! Метки KDF, маркер разрыва и лимиты кэшей. Значения лимитов служат
//! дефолтами для [`crate::config::Config`].

/// Текущая версия сессии (и байт версии в сообщениях)
pub const CURRENT_VERSION: u8 = 3;

/// Тип ключа Curve25519 в сериализованном публичном ключе
pub const DJB_TYPE: u8 = 0x05;

/// 32 байта `0xFF`, которые предшествуют DH-агрементам в X3DH
pub const DISCONTINUITY_BYTES: [u8; 32] = [0xFF; 32];

pub const INITIAL_SECRET_INFO: &[u8] = b"WhisperText";
pub const RATCHET_INFO: &[u8] = b"WhisperRatchet";
pub const MESSAGE_KEYS_INFO: &[u8] = b"WhisperMessageKeys";
pub const SENDER_KEY_INFO: &[u8] = b"WhisperGroup";

pub const MESSAGE_KEY_SEED: u8 = 0x01;
pub const CHAIN_KEY_SEED: u8 = 0x02;

/// Максимум пропущенных ключей в одной receiver chain / sender key state
pub const MAX_MESSAGE_KEYS: usize = 2000;

/// Максимальный прыжок счётчика вперёд в одном сообщении
pub const MAX_FORWARD_JUMPS: u32 = 2000;

pub const MAX_RECEIVER_CHAINS: usize = 5;

pub const ARCHIVED_STATES_MAX_LENGTH: usize = 40;

pub const MAX_SENDER_KEY_STATES: usize = 5;

/// Длина усечённого HMAC в `SignalMessage`
pub const MAC_LENGTH: usize = 8;

/// Маркер версии, подмешиваемый в итерированный хэш отпечатка
pub const FINGERPRINT_VERSION: u16 = 0;

pub const DEFAULT_FINGERPRINT_ITERATIONS: u32 = 5200;
