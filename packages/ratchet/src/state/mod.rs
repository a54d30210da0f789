//! Состояние сессий, prekey-записи и интерфейсы хранилищ

pub mod address;
pub mod memory;
pub mod prekey;
pub mod session_record;
pub mod session_state;
pub mod store;

pub use address::{ProtocolAddress, SenderKeyName};
pub use memory::InMemoryProtocolStore;
pub use prekey::{PreKeyBundle, PreKeyRecord, SignedPreKeyRecord};
pub use session_record::SessionRecord;
pub use session_state::SessionState;
pub use store::{
    Direction, IdentityKeyStore, PreKeyStore, ProtocolStore, SenderKeyStore, SessionStore,
    SignedPreKeyStore,
};
