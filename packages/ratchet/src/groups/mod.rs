//! Групповые сообщения на sender keys
//!
//! Каждый участник держит свою симметричную цепочку и рассылает её начало
//! остальным через попарные сессии (`SenderKeyDistributionMessage`).
//! Сообщение шифруется один раз и подписывается XEdDSA-ключом отправителя.

pub mod group_cipher;
pub mod group_session_builder;
pub mod sender_chain_key;
pub mod sender_key_record;
pub mod sender_key_state;
pub mod sender_message_key;

pub use group_cipher::GroupCipher;
pub use group_session_builder::GroupSessionBuilder;
pub use sender_key_record::SenderKeyRecord;
