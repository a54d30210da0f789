//! Integration tests for pairwise sessions
//!
//! This test suite covers:
//! - Session establishment from a prekey bundle and a prekey message
//! - Fingerprint hash chain offset between the two sides
//! - Out-of-order delivery, duplicates and the skipped-key window
//! - Archived session states and their promotion
//! - Trust and bundle validation errors

use construct_ratchet::crypto::keys;
use construct_ratchet::state::{IdentityKeyStore, PreKeyStore, SessionStore, SignedPreKeyStore};
use construct_ratchet::{
    CiphertextMessage, CiphertextMessageType, IdentityKeyPair, InMemoryProtocolStore,
    PreKeyBundle, PreKeySignalMessage, ProtocolAddress, RatchetError, SessionBuilder,
    SessionCipher, SessionState, SignalMessage,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

struct Party {
    store: Arc<Mutex<InMemoryProtocolStore>>,
    address: ProtocolAddress,
}

impl Party {
    fn new(name: &str) -> Self {
        let store = InMemoryProtocolStore::new(
            keys::generate_identity_key_pair(),
            keys::generate_registration_id(),
        );
        Self {
            store: Arc::new(Mutex::new(store)),
            address: ProtocolAddress::new(name, 1),
        }
    }

    /// Publish a fresh signed prekey and one-time prekey, return the bundle
    fn bundle(&self, pre_key_id: u32, signed_pre_key_id: u32) -> PreKeyBundle {
        let mut store = self.store.lock().unwrap();
        let identity = store.identity_key_pair().unwrap();

        let pre_key = keys::generate_pre_keys(pre_key_id, 1).remove(0);
        let signed_pre_key = keys::generate_signed_pre_key(&identity, signed_pre_key_id);
        store.store_pre_key(pre_key.id(), &pre_key).unwrap();
        store
            .store_signed_pre_key(signed_pre_key.id(), &signed_pre_key)
            .unwrap();

        PreKeyBundle {
            registration_id: store.local_registration_id().unwrap(),
            device_id: self.address.device_id(),
            pre_key_id: Some(pre_key.id()),
            pre_key_public: Some(*pre_key.public_key()),
            signed_pre_key_id: signed_pre_key.id(),
            signed_pre_key_public: Some(*signed_pre_key.public_key()),
            signed_pre_key_signature: signed_pre_key.signature().to_vec(),
            identity_key: *identity.identity_key(),
        }
    }

    fn builder_for(&self, remote: &Party) -> SessionBuilder<InMemoryProtocolStore> {
        SessionBuilder::new(self.store.clone(), remote.address.clone())
    }

    fn cipher_for(&self, remote: &Party) -> SessionCipher<InMemoryProtocolStore> {
        SessionCipher::new(self.store.clone(), remote.address.clone())
    }

    fn state_for(&self, remote: &Party) -> SessionState {
        let store = self.store.lock().unwrap();
        store
            .load_session(&remote.address)
            .unwrap()
            .session_state()
            .clone()
    }
}

/// Decrypt whatever kind of message came off the wire
fn decrypt(
    cipher: &SessionCipher<InMemoryProtocolStore>,
    message: &CiphertextMessage,
) -> construct_ratchet::Result<Vec<u8>> {
    match message.message_type() {
        CiphertextMessageType::PreKey => {
            cipher.decrypt_pre_key_message(&PreKeySignalMessage::deserialize(message.serialize())?)
        }
        _ => cipher.decrypt_message(&SignalMessage::deserialize(message.serialize())?),
    }
}

/// Alice builds from Bob's bundle, sends one message, Bob answers
fn establish(alice: &Party, bob: &Party) {
    alice.builder_for(bob).process_bundle(&bob.bundle(31337, 22)).unwrap();

    let hello = alice.cipher_for(bob).encrypt(b"hello bob").unwrap();
    assert_eq!(decrypt(&bob.cipher_for(alice), &hello).unwrap(), b"hello bob");

    let reply = bob.cipher_for(alice).encrypt(b"hello alice").unwrap();
    assert_eq!(decrypt(&alice.cipher_for(bob), &reply).unwrap(), b"hello alice");
}

/// Test the basic prekey handshake and first exchange
#[test]
fn test_basic_session_establishment() {
    let alice = Party::new("+14151111111");
    let bob = Party::new("+14152222222");

    alice.builder_for(&bob).process_bundle(&bob.bundle(31337, 22)).unwrap();

    let alice_cipher = alice.cipher_for(&bob);
    let bob_cipher = bob.cipher_for(&alice);

    // До ответа Bob'а Alice шлёт prekey-сообщения
    let first = alice_cipher.encrypt(b"first").unwrap();
    assert_eq!(first.message_type(), CiphertextMessageType::PreKey);
    assert_eq!(decrypt(&bob_cipher, &first).unwrap(), b"first");

    // Использованный одноразовый prekey удалён
    assert!(!bob.store.lock().unwrap().contains_pre_key(31337).unwrap());

    let reply = bob_cipher.encrypt(b"reply").unwrap();
    assert_eq!(reply.message_type(), CiphertextMessageType::Whisper);
    assert_eq!(decrypt(&alice_cipher, &reply).unwrap(), b"reply");

    // После ответа prekey-метаданные больше не нужны
    let second = alice_cipher.encrypt(b"second").unwrap();
    assert_eq!(second.message_type(), CiphertextMessageType::Whisper);
    assert_eq!(decrypt(&bob_cipher, &second).unwrap(), b"second");

    let bob_registration_id = bob.store.lock().unwrap().local_registration_id().unwrap();
    assert_eq!(alice_cipher.remote_registration_id().unwrap(), bob_registration_id);
    assert_eq!(alice_cipher.session_version().unwrap(), 3);
}

/// Test that the fingerprint hash chains stay one step apart
#[test]
fn test_fingerprint_hash_chain_offset() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    alice.builder_for(&bob).process_bundle(&bob.bundle(1, 1)).unwrap();
    let alice_initial = alice.state_for(&bob);

    let hello = alice.cipher_for(&bob).encrypt(b"hello").unwrap();
    decrypt(&bob.cipher_for(&alice), &hello).unwrap();
    let bob_after_receive = bob.state_for(&alice);

    // Bob догнал Alice и ушёл на шаг вперёд своим новым ratchet-ключом
    assert_eq!(bob_after_receive.last_fprint_hash(), alice_initial.fprint_hash());
    assert_ne!(bob_after_receive.fprint_hash(), alice_initial.fprint_hash());

    let reply = bob.cipher_for(&alice).encrypt(b"reply").unwrap();
    decrypt(&alice.cipher_for(&bob), &reply).unwrap();
    let alice_after_receive = alice.state_for(&bob);

    assert_eq!(alice_after_receive.last_fprint_hash(), bob_after_receive.fprint_hash());
    assert_ne!(alice_after_receive.fprint_hash(), alice_initial.fprint_hash());
    assert_ne!(alice_after_receive.last_fprint_hash(), alice_initial.last_fprint_hash());

    // Auth key эпохи тоже двигаются на каждом DH-шаге
    assert!(alice_after_receive.auth_key().index() > alice_initial.auth_key().index());
    assert_eq!(
        alice_after_receive.auth_key().last_key(),
        bob_after_receive.auth_key().key()
    );
}

/// Test shuffled delivery in both directions
#[test]
fn test_out_of_order_messages() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    let mut rng = StdRng::seed_from_u64(0x5eed);

    let mut from_alice: Vec<(usize, CiphertextMessage)> = (0..50)
        .map(|i| {
            let text = format!("alice #{}", i);
            (i, alice.cipher_for(&bob).encrypt(text.as_bytes()).unwrap())
        })
        .collect();
    from_alice.shuffle(&mut rng);

    for (i, message) in &from_alice {
        let plaintext = decrypt(&bob.cipher_for(&alice), message).unwrap();
        assert_eq!(plaintext, format!("alice #{}", i).as_bytes());
    }

    let mut from_bob: Vec<(usize, CiphertextMessage)> = (0..20)
        .map(|i| {
            let text = format!("bob #{}", i);
            (i, bob.cipher_for(&alice).encrypt(text.as_bytes()).unwrap())
        })
        .collect();
    from_bob.shuffle(&mut rng);

    for (i, message) in &from_bob {
        let plaintext = decrypt(&alice.cipher_for(&bob), message).unwrap();
        assert_eq!(plaintext, format!("bob #{}", i).as_bytes());
    }
}

/// Test out-of-order prekey messages before the first reply
#[test]
fn test_out_of_order_pre_key_messages() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    alice.builder_for(&bob).process_bundle(&bob.bundle(7, 3)).unwrap();

    let messages: Vec<CiphertextMessage> = (0..5)
        .map(|i| alice.cipher_for(&bob).encrypt(&[i as u8; 16]).unwrap())
        .collect();

    for i in [3usize, 0, 4, 1, 2] {
        assert_eq!(messages[i].message_type(), CiphertextMessageType::PreKey);
        assert_eq!(decrypt(&bob.cipher_for(&alice), &messages[i]).unwrap(), vec![i as u8; 16]);
    }
}

/// Test that replaying a message is reported and leaves the session usable
#[test]
fn test_duplicate_message_rejected() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    let message = alice.cipher_for(&bob).encrypt(b"once").unwrap();
    assert_eq!(decrypt(&bob.cipher_for(&alice), &message).unwrap(), b"once");

    let err = decrypt(&bob.cipher_for(&alice), &message).unwrap_err();
    assert!(matches!(err, RatchetError::DuplicateMessage { .. }));

    let next = alice.cipher_for(&bob).encrypt(b"twice").unwrap();
    assert_eq!(decrypt(&bob.cipher_for(&alice), &next).unwrap(), b"twice");
}

/// Test that a redelivered prekey message is a duplicate, not a new session
#[test]
fn test_redelivered_pre_key_message() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    alice.builder_for(&bob).process_bundle(&bob.bundle(5, 5)).unwrap();

    let message = alice.cipher_for(&bob).encrypt(b"hello").unwrap();
    decrypt(&bob.cipher_for(&alice), &message).unwrap();

    let err = decrypt(&bob.cipher_for(&alice), &message).unwrap_err();
    assert!(matches!(err, RatchetError::DuplicateMessage { .. }));

    let store = bob.store.lock().unwrap();
    assert_eq!(store.load_session(&alice.address).unwrap().previous_session_count(), 0);
}

/// Test that old skipped keys fall out of the bounded window
#[test]
fn test_skipped_key_window_eviction() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    let alice_cipher = alice.cipher_for(&bob);
    let messages: Vec<CiphertextMessage> = (0..2010)
        .map(|_| alice_cipher.encrypt(b"burst").unwrap())
        .collect();

    let bob_cipher = bob.cipher_for(&alice);
    assert_eq!(decrypt(&bob_cipher, &messages[1000]).unwrap(), b"burst");
    assert_eq!(decrypt(&bob_cipher, &messages[2009]).unwrap(), b"burst");

    let err = decrypt(&bob_cipher, &messages[0]).unwrap_err();
    assert!(matches!(err, RatchetError::DuplicateMessage { .. }));

    // Ключи внутри окна всё ещё доступны
    assert_eq!(decrypt(&bob_cipher, &messages[1500]).unwrap(), b"burst");
}

/// Test that a counter too far ahead is rejected
#[test]
fn test_too_far_into_the_future() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    let alice_cipher = alice.cipher_for(&bob);
    let messages: Vec<CiphertextMessage> = (0..2002)
        .map(|_| alice_cipher.encrypt(b"far").unwrap())
        .collect();

    let err = decrypt(&bob.cipher_for(&alice), &messages[2001]).unwrap_err();
    assert!(matches!(err, RatchetError::InvalidMessage(_)));
}

/// Test that a tampered message fails the MAC and does not advance the session
#[test]
fn test_tampered_message_rejected() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    let message = alice.cipher_for(&bob).encrypt(b"integrity").unwrap();
    let mut bytes = message.serialize().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let tampered = SignalMessage::deserialize(&bytes).unwrap();
    assert!(bob.cipher_for(&alice).decrypt_message(&tampered).is_err());

    assert_eq!(decrypt(&bob.cipher_for(&alice), &message).unwrap(), b"integrity");
}

/// Test that a failing callback discards the decryption result
#[test]
fn test_callback_error_does_not_commit() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    alice.builder_for(&bob).process_bundle(&bob.bundle(9, 9)).unwrap();

    let message = alice.cipher_for(&bob).encrypt(b"callback").unwrap();
    let pre_key_message = PreKeySignalMessage::deserialize(message.serialize()).unwrap();

    let bob_cipher = bob.cipher_for(&alice);
    let err = bob_cipher
        .decrypt_pre_key_message_with_callback(&pre_key_message, |plaintext| {
            assert_eq!(plaintext, b"callback");
            Err(RatchetError::InvalidMessage("rejected by application".to_string()))
        })
        .unwrap_err();
    assert!(matches!(err, RatchetError::InvalidMessage(_)));

    // Ни сессия, ни удаление prekey не сохранились
    assert!(bob.store.lock().unwrap().contains_pre_key(9).unwrap());
    assert_eq!(bob_cipher.decrypt_pre_key_message(&pre_key_message).unwrap(), b"callback");
}

/// Test that a stale session is found in the archive and promoted
#[test]
fn test_archived_session_promotion() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    // Bob продолжает писать в старой сессии
    let from_old_session = bob.cipher_for(&alice).encrypt(b"old session").unwrap();

    // Alice тем временем строит новую сессию по свежему bundle
    alice.builder_for(&bob).process_bundle(&bob.bundle(100, 23)).unwrap();
    {
        let store = alice.store.lock().unwrap();
        assert_eq!(store.load_session(&bob.address).unwrap().previous_session_count(), 1);
    }

    assert_eq!(
        decrypt(&alice.cipher_for(&bob), &from_old_session).unwrap(),
        b"old session"
    );

    let store = alice.store.lock().unwrap();
    let record = store.load_session(&bob.address).unwrap();
    assert_eq!(record.previous_session_count(), 1);
    assert!(record.session_state().unacknowledged_pre_key_message().is_none());
}

/// Test that a new session after reinstall keeps the old one archived
#[test]
fn test_simultaneous_sessions_both_decrypt() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    // Bob тоже строит новую сессию по bundle Alice
    bob.builder_for(&alice).process_bundle(&alice.bundle(200, 40)).unwrap();
    let from_bob = bob.cipher_for(&alice).encrypt(b"from new bob session").unwrap();
    assert_eq!(from_bob.message_type(), CiphertextMessageType::PreKey);

    assert_eq!(
        decrypt(&alice.cipher_for(&bob), &from_bob).unwrap(),
        b"from new bob session"
    );

    let store = alice.store.lock().unwrap();
    assert_eq!(store.load_session(&bob.address).unwrap().previous_session_count(), 1);
}

/// Test that encryption without a session fails
#[test]
fn test_encrypt_without_session() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    let err = alice.cipher_for(&bob).encrypt(b"nobody home").unwrap_err();
    assert!(matches!(err, RatchetError::NoSession(_)));
    assert!(matches!(
        alice.cipher_for(&bob).remote_registration_id(),
        Err(RatchetError::NoSession(_))
    ));
}

/// Test that a changed identity key is refused
#[test]
fn test_untrusted_identity_rejected() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");
    establish(&alice, &bob);

    let impostor = IdentityKeyPair::generate();
    let signed_pre_key = keys::generate_signed_pre_key(&impostor, 1);
    let bundle = PreKeyBundle {
        registration_id: 1,
        device_id: 1,
        pre_key_id: None,
        pre_key_public: None,
        signed_pre_key_id: 1,
        signed_pre_key_public: Some(*signed_pre_key.public_key()),
        signed_pre_key_signature: signed_pre_key.signature().to_vec(),
        identity_key: *impostor.identity_key(),
    };

    let err = alice.builder_for(&bob).process_bundle(&bundle).unwrap_err();
    assert!(matches!(err, RatchetError::UntrustedIdentity(_)));
}

/// Test that a bad signed prekey signature is refused
#[test]
fn test_bad_signed_pre_key_signature() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    let mut bundle = bob.bundle(1, 1);
    bundle.signed_pre_key_signature[0] ^= 0x01;

    let err = alice.builder_for(&bob).process_bundle(&bundle).unwrap_err();
    assert!(matches!(err, RatchetError::InvalidKey(_)));
    assert!(!alice.store.lock().unwrap().contains_session(&bob.address).unwrap());
}

/// Test that a bundle without a signed prekey is refused
#[test]
fn test_missing_signed_pre_key() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    let mut bundle = bob.bundle(1, 1);
    bundle.signed_pre_key_public = None;

    let err = alice.builder_for(&bob).process_bundle(&bundle).unwrap_err();
    assert!(matches!(err, RatchetError::InvalidKey(_)));
}

/// Test a session without a one-time prekey
#[test]
fn test_session_without_one_time_pre_key() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    let mut bundle = bob.bundle(1, 1);
    bundle.pre_key_id = None;
    bundle.pre_key_public = None;
    alice.builder_for(&bob).process_bundle(&bundle).unwrap();

    let message = alice.cipher_for(&bob).encrypt(b"no otpk").unwrap();
    let pre_key_message = PreKeySignalMessage::deserialize(message.serialize()).unwrap();
    assert_eq!(pre_key_message.pre_key_id(), None);

    assert_eq!(bob.cipher_for(&alice).decrypt_pre_key_message(&pre_key_message).unwrap(), b"no otpk");
    // Одноразовый prekey не использовался и остаётся в хранилище
    assert!(bob.store.lock().unwrap().contains_pre_key(1).unwrap());
}

/// Test that an unknown signed prekey id is reported
#[test]
fn test_unknown_signed_pre_key_id() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    let mut bundle = bob.bundle(1, 1);
    bundle.signed_pre_key_id = 99;
    alice.builder_for(&bob).process_bundle(&bundle).unwrap();

    let message = alice.cipher_for(&bob).encrypt(b"lost").unwrap();
    let err = decrypt(&bob.cipher_for(&alice), &message).unwrap_err();
    assert!(matches!(err, RatchetError::InvalidKeyId(99)));
}

/// Test that a consumed one-time prekey is not fatal to session setup
/// but the mismatched agreement fails decryption without storing anything
#[test]
fn test_missing_one_time_pre_key_falls_back() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    alice.builder_for(&bob).process_bundle(&bob.bundle(5, 9)).unwrap();
    let message = alice.cipher_for(&bob).encrypt(b"otpk gone").unwrap();
    let pre_key_message = PreKeySignalMessage::deserialize(message.serialize()).unwrap();
    assert_eq!(pre_key_message.pre_key_id(), Some(5));

    bob.store.lock().unwrap().remove_pre_key(5).unwrap();

    let err = bob
        .cipher_for(&alice)
        .decrypt_pre_key_message(&pre_key_message)
        .unwrap_err();
    assert!(matches!(err, RatchetError::InvalidMessage(_)));

    let store = bob.store.lock().unwrap();
    assert!(store.load_session(&alice.address).unwrap().is_fresh());
    assert!(store.contains_signed_pre_key(9).unwrap());
}

/// Test building the responder session through the builder alone
#[test]
fn test_builder_processes_pre_key_message() {
    let alice = Party::new("alice");
    let bob = Party::new("bob");

    alice.builder_for(&bob).process_bundle(&bob.bundle(11, 3)).unwrap();
    let message = alice.cipher_for(&bob).encrypt(b"via builder").unwrap();
    let pre_key_message = PreKeySignalMessage::deserialize(message.serialize()).unwrap();

    let used = bob.builder_for(&alice).process_pre_key_message(&pre_key_message).unwrap();
    assert_eq!(used, Some(11));

    // Запись сохранена самим builder'ом
    let alice_registration_id = alice.store.lock().unwrap().local_registration_id().unwrap();
    assert_eq!(bob.state_for(&alice).remote_registration_id(), alice_registration_id);

    // Повторная обработка того же сообщения ничего не меняет
    let again = bob.builder_for(&alice).process_pre_key_message(&pre_key_message).unwrap();
    assert_eq!(again, None);

    assert_eq!(
        bob.cipher_for(&alice).decrypt_pre_key_message(&pre_key_message).unwrap(),
        b"via builder"
    );
}
