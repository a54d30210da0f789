//! XEdDSA: подписи Ed25519 на X25519-ключах
//!
//! Позволяет identity-ключу Curve25519 подписывать signed prekeys и
//! sender-key сообщения без отдельной пары Ed25519.
//!
//! <https://signal.org/docs/specifications/xeddsa/>

use crate::crypto::curve::{PrivateKey, PublicKey};
use crate::crypto::kdf::sha512;
use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::{EdwardsPoint, MontgomeryPoint, Scalar};
use rand::rngs::OsRng;
use rand_core::RngCore;
use subtle::ConstantTimeEq;

/// Размер подписи (R || s)
pub const SIGNATURE_SIZE: usize = 64;

/// hash1: первый байт 0xFE, остальные 0xFF
const HASH_1_PREFIX: [u8; 32] = [
    0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Подписать `message` приватным ключом Montgomery
pub fn xeddsa_sign(message: &[u8], private_key: &PrivateKey) -> [u8; SIGNATURE_SIZE] {
    // Z = 64 байта случайности
    let mut cap_z = [0u8; SIGNATURE_SIZE];
    OsRng.fill_bytes(&mut cap_z);

    // A, a = calculate_key_pair(k)
    let (cap_a, a) = {
        let mut k_bytes = private_key.serialize();
        k_bytes[0] &= 248;
        k_bytes[31] &= 127;
        k_bytes[31] |= 64;
        let k = Scalar::from_bytes_mod_order(k_bytes);

        let cap_e = &k * ED25519_BASEPOINT_TABLE;
        let mut cap_a = cap_e.compress();
        let sign_bit = cap_a.0[31] >> 7;
        cap_a.0[31] &= 0b0111_1111_u8;

        let a = if sign_bit == 1 { -k } else { k };
        (cap_a, a)
    };

    // r = hash1(a || M || Z) (mod q)
    let r = Scalar::from_bytes_mod_order_wide(&sha512(&[&HASH_1_PREFIX, a.as_bytes(), message, &cap_z]));

    // R = rB
    let cap_r = (&r * ED25519_BASEPOINT_TABLE).compress();

    // h = hash(R || A || M) (mod q)
    let h = Scalar::from_bytes_mod_order_wide(&sha512(&[cap_r.as_bytes(), cap_a.as_bytes(), message]));

    // s = r + ha (mod q)
    let s = r + (h * a);

    let mut signature = [0u8; SIGNATURE_SIZE];
    signature[..32].copy_from_slice(cap_r.as_bytes());
    signature[32..].copy_from_slice(s.as_bytes());
    signature
}

/// Проверить XEdDSA-подпись публичным ключом Montgomery
pub fn xeddsa_verify(message: &[u8], public_key: &PublicKey, signature: &[u8]) -> bool {
    if signature.len() != SIGNATURE_SIZE {
        return false;
    }

    let mut cap_r = [0u8; 32];
    cap_r.copy_from_slice(&signature[..32]);
    let mut s = [0u8; 32];
    s.copy_from_slice(&signature[32..]);
    s[31] &= 0b0111_1111_u8;

    // s с лишними старшими битами не канонический
    if (s[31] & 0b1110_0000_u8) != 0 {
        return false;
    }

    // convert_mont(u)
    let mut u = *public_key.public_key_bytes();
    u[31] &= 0b0111_1111_u8;
    let a = match MontgomeryPoint(u).to_edwards(0) {
        Some(point) => point,
        None => return false,
    };
    let cap_a = a.compress();

    // h = hash(R || A || M) (mod q)
    let h = Scalar::from_bytes_mod_order_wide(&sha512(&[&cap_r, cap_a.as_bytes(), message]));

    // Rcheck = sB - hA
    let cap_r_check = EdwardsPoint::vartime_double_scalar_mul_basepoint(
        &h,
        &(-a),
        &Scalar::from_bytes_mod_order(s),
    )
    .compress();

    bool::from(cap_r_check.as_bytes().ct_eq(&cap_r))
}
