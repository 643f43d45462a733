//! Data-at-rest encryption with a single configured key.
//!
//! Tokens look like `v1.<base64(nonce || ciphertext)>` so the format can be
//! rotated later without guessing at stored values.

use crate::cipher::{EncryptedData, decrypt, encrypt};
use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;

const TOKEN_VERSION: &str = "v1";

/// Environment variable holding the data-at-rest key.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// Configuration for [`ServerEncryptor`].
#[derive(Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// 64 hex characters or base64 of 32 bytes.
    pub key: String,
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl EncryptionConfig {
    /// Reads the key from `ENCRYPTION_KEY`.
    pub fn from_env() -> CryptoResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the key through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CryptoResult<Self> {
        let key = lookup(ENCRYPTION_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CryptoError::Config(format!("{ENCRYPTION_KEY_ENV} is not set")))?;
        Ok(Self { key })
    }

    /// Parses the configured key, accepting hex first and base64 second.
    pub fn parse_key(&self) -> CryptoResult<DerivedKey> {
        let trimmed = self.key.trim();
        if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return DerivedKey::from_hex(trimmed);
        }
        DerivedKey::from_base64(trimmed)
    }
}

/// Encrypts and decrypts values stored by the backend.
pub struct ServerEncryptor {
    key: DerivedKey,
}

impl ServerEncryptor {
    pub fn new(key: DerivedKey) -> Self {
        Self { key }
    }

    pub fn from_config(config: &EncryptionConfig) -> CryptoResult<Self> {
        Ok(Self::new(config.parse_key()?))
    }

    pub fn from_env() -> CryptoResult<Self> {
        Self::from_config(&EncryptionConfig::from_env()?)
    }

    /// Encrypts a string into a versioned token.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        self.encrypt_bytes(plaintext.as_bytes())
    }

    /// Decrypts a token produced by [`ServerEncryptor::encrypt`].
    pub fn decrypt(&self, token: &str) -> CryptoResult<String> {
        let bytes = self.decrypt_bytes(token)?;
        String::from_utf8(bytes)
            .map_err(|e| CryptoError::Decryption(format!("plaintext is not UTF-8: {e}")))
    }

    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> CryptoResult<String> {
        let encrypted = encrypt(&self.key, plaintext)?;
        Ok(format!("{TOKEN_VERSION}.{}", encrypted.to_base64()))
    }

    pub fn decrypt_bytes(&self, token: &str) -> CryptoResult<Vec<u8>> {
        let (version, body) = token
            .split_once('.')
            .ok_or_else(|| CryptoError::InvalidFormat("missing token version".to_string()))?;
        if version != TOKEN_VERSION {
            return Err(CryptoError::InvalidFormat(format!(
                "unsupported token version: {version}"
            )));
        }
        let encrypted = EncryptedData::from_base64(body)?;
        decrypt(&self.key, &encrypted)
    }

    /// Serializes `value` to JSON and encrypts it.
    pub fn encrypt_value<T: Serialize>(&self, value: &T) -> CryptoResult<String> {
        let json = serde_json::to_vec(value)?;
        self.encrypt_bytes(&json)
    }

    /// Decrypts a token and deserializes the JSON inside it.
    pub fn decrypt_value<T: DeserializeOwned>(&self, token: &str) -> CryptoResult<T> {
        let json = self.decrypt_bytes(token)?;
        let value = serde_json::from_slice(&json)?;
        debug!("decrypted {} byte record", json.len());
        Ok(value)
    }
}

/// Hex-encoded SHA-256 of `data`.
pub fn hash_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Random hex token of `len_bytes` bytes of entropy.
pub fn generate_token(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time equality for secrets of possibly different lengths.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_random_key;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Attendee {
        name: String,
        phone: String,
    }

    #[test]
    fn token_round_trip() {
        let enc = ServerEncryptor::new(generate_random_key());
        let token = enc.encrypt("+234 801 234 5678").unwrap();
        assert!(token.starts_with("v1."));
        assert_eq!(enc.decrypt(&token).unwrap(), "+234 801 234 5678");
    }

    #[test]
    fn value_round_trip() {
        let enc = ServerEncryptor::new(generate_random_key());
        let attendee = Attendee {
            name: "Ada".into(),
            phone: "0801".into(),
        };
        let token = enc.encrypt_value(&attendee).unwrap();
        let back: Attendee = enc.decrypt_value(&token).unwrap();
        assert_eq!(back, attendee);
    }

    #[test]
    fn unknown_version_rejected() {
        let enc = ServerEncryptor::new(generate_random_key());
        let token = enc.encrypt("x").unwrap().replacen("v1.", "v9.", 1);
        assert!(matches!(enc.decrypt(&token), Err(CryptoError::InvalidFormat(_))));
        assert!(matches!(enc.decrypt("no-version"), Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn other_key_cannot_decrypt() {
        let a = ServerEncryptor::new(generate_random_key());
        let b = ServerEncryptor::new(generate_random_key());
        let token = a.encrypt("secret").unwrap();
        assert!(matches!(b.decrypt(&token), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn config_accepts_hex_and_base64() {
        let hex_cfg = EncryptionConfig { key: "ab".repeat(32) };
        assert_eq!(hex_cfg.parse_key().unwrap().as_bytes(), &[0xab; 32]);

        use base64::{Engine, engine::general_purpose::STANDARD};
        let b64_cfg = EncryptionConfig {
            key: STANDARD.encode([3u8; 32]),
        };
        assert_eq!(b64_cfg.parse_key().unwrap().as_bytes(), &[3u8; 32]);
    }

    #[test]
    fn config_from_lookup_missing_key() {
        let err = EncryptionConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, CryptoError::Config(_)));
    }

    #[test]
    fn config_debug_redacts_key() {
        let cfg = EncryptionConfig { key: "ab".repeat(32) };
        assert!(!format!("{cfg:?}").contains("abab"));
    }

    #[test]
    fn helpers() {
        assert_eq!(
            hash_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(generate_token(16).len(), 32);
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"diff"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
