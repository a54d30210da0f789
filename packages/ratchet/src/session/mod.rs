//! Попарные сессии: установка (`SessionBuilder`) и шифрование (`SessionCipher`)

pub mod builder;
pub mod cipher;

pub use builder::SessionBuilder;
pub use cipher::SessionCipher;
