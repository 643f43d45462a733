//! Payment error types.

use crate::types::{Currency, PaymentProvider, PaymentStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for payment operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors that can occur while talking to payment providers.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("{provider} rejected the request: {message}")]
    Provider {
        provider: PaymentProvider,
        message: String,
    },

    #[error("payment provider not configured: {0}")]
    ProviderNotConfigured(PaymentProvider),

    #[error("unsupported payment provider: {0}")]
    UnsupportedProvider(String),

    #[error("{provider} does not support currency {currency}")]
    UnsupportedCurrency {
        provider: PaymentProvider,
        currency: Currency,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid payment request: {0}")]
    InvalidRequest(String),

    #[error("webhook signature missing")]
    MissingSignature,

    #[error("webhook signature invalid")]
    InvalidSignature,

    #[error("amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    #[error("payment {reference} not successful: {status}")]
    PaymentNotSuccessful {
        reference: String,
        status: PaymentStatus,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] confpass_crypto::CryptoError),
}
