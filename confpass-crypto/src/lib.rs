//! Encryption layer for ConfPass.
//!
//! Provides:
//! - PBKDF2-HMAC-SHA256 key derivation from passphrases
//! - AES-256-GCM authenticated encryption for data at rest
//! - RSA-OAEP + AES-GCM hybrid encryption for asymmetric key exchange
//! - Passphrase-protected key-value storage with a cached derived key
//!
//! # Formats
//!
//! Every ciphertext produced here is AES-256-GCM with a random 96-bit nonce.
//! Compact string forms are standard base64 of the concatenated parts:
//!
//! | Producer | Layout |
//! |---|---|
//! | [`EncryptedData::to_base64`] | `nonce \|\| ciphertext` |
//! | [`ServerEncryptor::encrypt`] | `v1.` + `base64(nonce \|\| ciphertext)` |
//! | [`passphrase::seal_to_string`] | `salt \|\| nonce \|\| ciphertext` |
//!
//! [`hybrid::HybridEnvelope`] keeps its parts as separate base64 fields.

mod cipher;
mod error;
pub mod hybrid;
mod key;
pub mod passphrase;
pub mod server;
pub mod storage;

pub use cipher::{
    EncryptedData, NONCE_SIZE, TAG_SIZE, decrypt, decrypt_string, decrypt_with_aad, encrypt,
    encrypt_string, encrypt_with_aad,
};
pub use error::{CryptoError, CryptoResult};
pub use hybrid::{HybridEnvelope, HybridKeyPair};
pub use key::{
    DEFAULT_PBKDF2_ITERATIONS, DerivedKey, KEY_SIZE, KdfParams, MIN_PBKDF2_ITERATIONS, SALT_SIZE,
    Salt, derive_key, generate_random_key,
};
pub use passphrase::{PassphraseSealed, open_with_passphrase, seal_with_passphrase};
pub use server::{EncryptionConfig, ServerEncryptor, constant_time_eq, generate_token, hash_sha256};
pub use storage::{FileBackend, MemoryBackend, SecureStorage, StorageBackend};
