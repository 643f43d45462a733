//! Hybrid encryption: RSA-OAEP key wrap + AES-256-GCM payload.
//!
//! A random AES key encrypts the payload; the AES key is wrapped with the
//! recipient's RSA public key using OAEP with SHA-256. The envelope carries
//! base64 strings so it can be passed through JSON APIs unchanged.

use crate::cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE, decrypt, encrypt};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE, generate_random_key};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Smallest accepted RSA modulus.
pub const MIN_RSA_BITS: usize = 2048;

/// RSA keypair used for hybrid key exchange.
pub struct HybridKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl HybridKeyPair {
    /// Generates a new keypair with a modulus of `bits` bits.
    pub fn generate(bits: usize) -> CryptoResult<Self> {
        if bits < MIN_RSA_BITS {
            return Err(CryptoError::InvalidKey(format!(
                "RSA modulus must be at least {MIN_RSA_BITS} bits, got {bits}"
            )));
        }
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::InvalidKey(format!("RSA key generation failed: {e}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Loads a keypair from a PKCS#8 PEM private key.
    pub fn from_private_pem(pem: &str) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid private key PEM: {e}")))?;
        check_modulus(private.size())?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// SPKI PEM encoding of the public key.
    pub fn public_key_pem(&self) -> CryptoResult<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("public key PEM encoding failed: {e}")))
    }

    /// PKCS#8 PEM encoding of the private key.
    pub fn private_key_pem(&self) -> CryptoResult<Zeroizing<String>> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("private key PEM encoding failed: {e}")))
    }
}

/// Parses an SPKI PEM public key.
pub fn public_key_from_pem(pem: &str) -> CryptoResult<RsaPublicKey> {
    let public = RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid public key PEM: {e}")))?;
    check_modulus(public.size())?;
    Ok(public)
}

fn check_modulus(size_bytes: usize) -> CryptoResult<()> {
    if size_bytes * 8 < MIN_RSA_BITS {
        return Err(CryptoError::InvalidKey(format!(
            "RSA modulus must be at least {MIN_RSA_BITS} bits, got {}",
            size_bytes * 8
        )));
    }
    Ok(())
}

/// RSA-wrapped key plus AES-GCM ciphertext, all base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridEnvelope {
    /// AES key wrapped with RSA-OAEP(SHA-256).
    pub encrypted_key: String,
    /// AES-GCM nonce.
    pub nonce: String,
    /// AES-GCM ciphertext with tag.
    pub ciphertext: String,
}

/// Encrypts `plaintext` for the holder of `recipient`'s private key.
pub fn seal(plaintext: &[u8], recipient: &RsaPublicKey) -> CryptoResult<HybridEnvelope> {
    let data_key = generate_random_key();
    let encrypted = encrypt(&data_key, plaintext)?;

    let wrapped = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), data_key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP key wrap failed: {e}")))?;

    Ok(HybridEnvelope {
        encrypted_key: STANDARD.encode(wrapped),
        nonce: STANDARD.encode(encrypted.nonce),
        ciphertext: STANDARD.encode(&encrypted.ciphertext),
    })
}

/// Decrypts an envelope produced by [`seal`].
pub fn open(envelope: &HybridEnvelope, private: &RsaPrivateKey) -> CryptoResult<Vec<u8>> {
    let wrapped = decode_field("encrypted_key", &envelope.encrypted_key)?;
    let nonce_bytes = decode_field("nonce", &envelope.nonce)?;
    let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;

    let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidFormat(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce_bytes.len()
        ))
    })?;
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::InvalidFormat(
            "ciphertext shorter than authentication tag".to_string(),
        ));
    }

    let key_bytes = Zeroizing::new(
        private
            .decrypt(Oaep::new::<Sha256>(), &wrapped)
            .map_err(|_| {
                CryptoError::Decryption(
                    "RSA-OAEP unwrap failed (wrong key or tampered data)".to_string(),
                )
            })?,
    );
    if key_bytes.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key_bytes.len(),
        });
    }
    let data_key = DerivedKey::from_slice(&key_bytes)?;

    decrypt(&data_key, &EncryptedData { nonce, ciphertext })
}

fn decode_field(name: &str, value: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CryptoError::InvalidFormat(format!("{name} is not valid base64: {e}")))
}
