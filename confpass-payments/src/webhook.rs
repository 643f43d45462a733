//! Webhook signature verification.
//!
//! Every comparison here runs in constant time; `hmac`'s `verify_slice`
//! covers the HMAC cases and `subtle` the shared-secret header.

use crate::error::{PaymentError, PaymentResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Paystack: hex HMAC-SHA512 of the raw body keyed with the secret key.
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Flutterwave: base64 HMAC-SHA256 of the raw body keyed with the secret hash.
pub const FLUTTERWAVE_SIGNATURE_HEADER: &str = "flutterwave-signature";

/// Flutterwave (legacy): the configured secret hash, sent verbatim.
pub const FLUTTERWAVE_VERIF_HASH_HEADER: &str = "verif-hash";

/// Hex HMAC-SHA512 of `body`. Used by tests and by tooling that replays webhooks.
pub fn sign_hmac_sha512_hex(secret: &[u8], body: &[u8]) -> PaymentResult<String> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| PaymentError::Config(format!("invalid HMAC key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Base64 HMAC-SHA256 of `body`.
pub fn sign_hmac_sha256_base64(secret: &[u8], body: &[u8]) -> PaymentResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| PaymentError::Config(format!("invalid HMAC key: {e}")))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verifies a hex-encoded HMAC-SHA512 signature.
pub fn verify_hmac_sha512_hex(secret: &[u8], body: &[u8], signature: &str) -> PaymentResult<()> {
    let expected = hex::decode(signature.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac =
        HmacSha512::new_from_slice(secret).map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::InvalidSignature)
}

/// Verifies a base64-encoded HMAC-SHA256 signature.
pub fn verify_hmac_sha256_base64(secret: &[u8], body: &[u8], signature: &str) -> PaymentResult<()> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::InvalidSignature)
}

/// Compares a presented shared secret against the expected one.
pub fn verify_shared_secret(expected: &str, presented: &str) -> PaymentResult<()> {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if expected.is_empty() || a.len() != b.len() || !bool::from(a.ct_eq(b)) {
        return Err(PaymentError::InvalidSignature);
    }
    Ok(())
}

/// Reads a header as UTF-8, treating non-UTF-8 values as absent.
pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_sign_then_verify() {
        let body = b"{\"event\":\"charge.success\"}";
        let sig = sign_hmac_sha512_hex(b"sk_test", body).unwrap();
        assert_eq!(sig.len(), 128);
        verify_hmac_sha512_hex(b"sk_test", body, &sig).unwrap();
        assert!(verify_hmac_sha512_hex(b"sk_other", body, &sig).is_err());
    }

    #[test]
    fn sha256_sign_then_verify() {
        let sig = sign_hmac_sha256_base64(b"hash", b"body").unwrap();
        verify_hmac_sha256_base64(b"hash", b"body", &sig).unwrap();
        assert!(verify_hmac_sha256_base64(b"hash", b"body!", &sig).is_err());
    }

    #[test]
    fn known_sha256_vector() {
        // RFC 4231 test case 2
        let sig = sign_hmac_sha256_base64(b"Jefe", b"what do ya want for nothing?").unwrap();
        let raw = STANDARD.decode(sig).unwrap();
        assert_eq!(
            hex::encode(raw),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn malformed_signatures_rejected() {
        assert!(matches!(
            verify_hmac_sha512_hex(b"k", b"b", "zz-not-hex"),
            Err(PaymentError::InvalidSignature)
        ));
        assert!(matches!(
            verify_hmac_sha256_base64(b"k", b"b", "%%%"),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn shared_secret_comparison() {
        verify_shared_secret("s3cret", "s3cret").unwrap();
        assert!(verify_shared_secret("s3cret", "s3cre").is_err());
        assert!(verify_shared_secret("s3cret", "S3cret").is_err());
        assert!(verify_shared_secret("", "").is_err());
    }
}
