//! Passphrase-sealed payloads (PBKDF2 -> AES-256-GCM).
//!
//! The salt and iteration count travel with the ciphertext so the
//! passphrase is the only input needed to open it.

use crate::cipher::{EncryptedData, NONCE_SIZE, decrypt, encrypt};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, SALT_SIZE, Salt, derive_key};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// Payload encrypted under a passphrase-derived key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassphraseSealed {
    pub salt: Salt,
    pub iterations: u32,
    pub encrypted: EncryptedData,
}

/// Encrypts `plaintext` under a key derived from `passphrase` with a fresh salt.
pub fn seal_with_passphrase(
    passphrase: &str,
    plaintext: &[u8],
    params: &KdfParams,
) -> CryptoResult<PassphraseSealed> {
    let salt = Salt::random();
    let key = derive_key(passphrase, &salt, params)?;
    let encrypted = encrypt(&key, plaintext)?;
    Ok(PassphraseSealed {
        salt,
        iterations: params.iterations,
        encrypted,
    })
}

/// Opens a [`PassphraseSealed`] payload.
pub fn open_with_passphrase(passphrase: &str, sealed: &PassphraseSealed) -> CryptoResult<Vec<u8>> {
    let params = KdfParams {
        iterations: sealed.iterations,
    };
    let key = derive_key(passphrase, &sealed.salt, &params)?;
    decrypt(&key, &sealed.encrypted)
}

/// Seals a string into `base64(salt || nonce || ciphertext)` with default iterations.
pub fn seal_to_string(passphrase: &str, plaintext: &str) -> CryptoResult<String> {
    let sealed = seal_with_passphrase(passphrase, plaintext.as_bytes(), &KdfParams::default())?;
    let mut raw =
        Vec::with_capacity(SALT_SIZE + NONCE_SIZE + sealed.encrypted.ciphertext.len());
    raw.extend_from_slice(sealed.salt.as_bytes());
    raw.extend_from_slice(&sealed.encrypted.nonce);
    raw.extend_from_slice(&sealed.encrypted.ciphertext);
    Ok(STANDARD.encode(raw))
}

/// Opens a string produced by [`seal_to_string`].
pub fn open_from_string(passphrase: &str, encoded: &str) -> CryptoResult<String> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64: {e}")))?;
    if raw.len() < SALT_SIZE {
        return Err(CryptoError::InvalidFormat(format!(
            "sealed payload too short: {} bytes",
            raw.len()
        )));
    }
    let salt = Salt::from_slice(&raw[..SALT_SIZE])?;
    let encrypted = EncryptedData::from_raw(&raw[SALT_SIZE..])?;
    let sealed = PassphraseSealed {
        salt,
        iterations: KdfParams::default().iterations,
        encrypted,
    };
    let bytes = open_with_passphrase(passphrase, &sealed)?;
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::Decryption(format!("plaintext is not UTF-8: {e}")))
}
