// Wire format сообщений ratchet-ядра
// [версия][bincode тело][трейлер: MAC или подпись]

use crate::consts::CURRENT_VERSION;
use crate::error::{RatchetError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Байт версии: старший полубайт: версия сообщения, младший: текущая версия
pub fn version_byte(message_version: u8) -> u8 {
    (message_version << 4) | CURRENT_VERSION
}

/// Проверить байт версии и вернуть версию сообщения
pub fn check_version(byte: u8) -> Result<u8> {
    let message_version = byte >> 4;
    if message_version < CURRENT_VERSION {
        return Err(RatchetError::LegacyMessage(message_version));
    }
    if message_version > CURRENT_VERSION {
        return Err(RatchetError::InvalidVersion(message_version));
    }
    Ok(message_version)
}

/// Упаковать тело: байт версии + bincode
pub fn pack_body<T: Serialize>(message_version: u8, body: &T) -> Result<Vec<u8>> {
    let mut buffer = vec![version_byte(message_version)];
    buffer.extend_from_slice(&bincode::serialize(body)?);
    Ok(buffer)
}

/// Разобрать сообщение на (версия, тело, трейлер)
///
/// Трейлер фиксированной длины `trailer_len` идёт последним.
pub fn split_message(data: &[u8], trailer_len: usize) -> Result<(u8, &[u8], &[u8])> {
    if data.len() <= trailer_len {
        return Err(RatchetError::InvalidMessage(format!(
            "Message too short: {} bytes",
            data.len()
        )));
    }
    let message_version = check_version(data[0])?;
    let (body, trailer) = data[1..].split_at(data.len() - 1 - trailer_len);
    Ok((message_version, body, trailer))
}

/// Распаковать bincode тело; любой сбой разбора даёт `InvalidMessage`
pub fn unpack_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    bincode::deserialize(body)
        .map_err(|e| RatchetError::InvalidMessage(format!("Malformed message body: {}", e)))
}
