//! Криптографические примитивы
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          session / groups / fingerprint (протокол)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ratchet (root / chain / auth)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   curve / identity        │  │   kdf / aead             │
//! │  - X25519 agreement       │  │  - HKDF-SHA256, HMAC     │
//! │  - XEdDSA signatures      │  │  - SHA-512 hash chain    │
//! │  - 33-byte public keys    │  │  - ChaCha20-Poly1305     │
//! └───────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! ## Модули
//!
//! - [`curve`]: `PublicKey`, `PrivateKey`, `KeyPair`
//! - [`identity`]: долговременные identity-ключи
//! - [`xeddsa`]: подписи XEdDSA поверх X25519-ключей
//! - [`kdf`]: HKDF, HMAC и SHA-512 обёртки
//! - [`aead`]: шифрование тела сообщений
//! - [`keys`]: генерация identity, prekeys и sender keys

pub mod aead;
pub mod curve;
pub mod identity;
pub mod kdf;
pub mod keys;
pub mod xeddsa;
