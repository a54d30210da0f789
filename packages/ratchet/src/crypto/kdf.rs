//! Примитивы деривации: HKDF-SHA256, HMAC-SHA256, SHA-512

use crate::error::{RatchetError, Result};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;

pub const SHA512_DIGEST_SIZE: usize = 64;

/// Развернуть секрет в `len` байт с меткой `info`
///
/// `salt == None` эквивалентен нулевой соли длиной в хэш (RFC 5869).
pub fn derive_secrets(ikm: &[u8], salt: Option<&[u8]>, info: &[u8], len: usize) -> Result<Vec<u8>> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = vec![0u8; len];
    hkdf.expand(info, &mut okm)
        .map_err(|e| RatchetError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// HMAC-SHA256 от конкатенации `messages`
pub fn hmac_sha256(key: &[u8], messages: &[&[u8]]) -> Result<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| RatchetError::KeyDerivation(e.to_string()))?;
    for message in messages {
        mac.update(message);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// SHA-512 от конкатенации `messages`
pub fn sha512(messages: &[&[u8]]) -> [u8; SHA512_DIGEST_SIZE] {
    let mut hasher = Sha512::new();
    for message in messages {
        hasher.update(message);
    }
    let mut out = [0u8; SHA512_DIGEST_SIZE];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 5869, test case 1
    #[test]
    fn test_hkdf_rfc5869_case1() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let okm = derive_secrets(&ikm, Some(&salt), &info, 42).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_hkdf_none_salt_equals_zero_salt() {
        let a = derive_secrets(b"secret", None, b"info", 96).unwrap();
        let b = derive_secrets(b"secret", Some(&[0u8; 32]), b"info", 96).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hmac_concatenates_parts() {
        let whole = hmac_sha256(b"key", &[b"hello world"]).unwrap();
        let parts = hmac_sha256(b"key", &[b"hello", b" ", b"world"]).unwrap();
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_sha512_empty() {
        assert_eq!(
            hex::encode(sha512(&[])),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }
}
