//! ChaCha20-Poly1305 поверх ключей сообщений
//!
//! Nonce берётся из первых `chacha_nonce_length` байт IV, выведенного KDF.

use crate::config::Config;
use crate::error::{RatchetError, Result};
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key, KeyInit, Nonce,
};

/// Длина nonce, которую принимает ChaCha20Poly1305
const NONCE_SIZE: usize = 12;

fn nonce_from_iv(iv: &[u8], len: usize) -> Result<&Nonce> {
    if len != NONCE_SIZE {
        return Err(RatchetError::InvalidKey(format!(
            "Unsupported nonce length: {} (expected {})",
            len, NONCE_SIZE
        )));
    }
    if iv.len() < len {
        return Err(RatchetError::InvalidKey(format!("IV too short: {}", iv.len())));
    }
    Ok(Nonce::from_slice(&iv[..len]))
}

pub fn encrypt(key: &[u8; 32], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher.encrypt(
        nonce_from_iv(iv, Config::global().chacha_nonce_length)?,
        Payload {
            msg: plaintext,
            aad,
        },
    )?;
    Ok(ciphertext)
}

pub fn decrypt(key: &[u8; 32], iv: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let plaintext = cipher.decrypt(
        nonce_from_iv(iv, Config::global().chacha_nonce_length)?,
        Payload {
            msg: ciphertext,
            aad,
        },
    )?;
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aead_encrypt_decrypt() {
        let key = [7u8; 32];
        let iv = [1u8; 16];

        let ciphertext = encrypt(&key, &iv, b"Hello, Construct!", b"header").unwrap();
        let plaintext = decrypt(&key, &iv, &ciphertext, b"header").unwrap();
        assert_eq!(plaintext, b"Hello, Construct!");
    }

    #[test]
    fn test_aead_rejects_wrong_aad() {
        let key = [7u8; 32];
        let iv = [1u8; 16];

        let ciphertext = encrypt(&key, &iv, b"payload", b"header").unwrap();
        assert!(matches!(
            decrypt(&key, &iv, &ciphertext, b"other"),
            Err(RatchetError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_unsupported_nonce_length() {
        let iv = [1u8; 16];

        assert!(nonce_from_iv(&iv, 12).is_ok());
        for len in [8, 16] {
            assert!(matches!(
                nonce_from_iv(&iv, len),
                Err(RatchetError::InvalidKey(_))
            ));
        }
        assert!(matches!(
            nonce_from_iv(&iv[..10], 12),
            Err(RatchetError::InvalidKey(_))
        ));
    }
}
