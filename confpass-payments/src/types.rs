//! Shared types for payment operations.

use crate::error::{PaymentError, PaymentResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported payment gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Flutterwave,
    Paystack,
}

impl PaymentProvider {
    /// Every provider, in the order they are offered to users.
    pub const ALL: [PaymentProvider; 2] = [PaymentProvider::Paystack, PaymentProvider::Flutterwave];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flutterwave => "flutterwave",
            Self::Paystack => "paystack",
        }
    }

    /// Human-readable name for receipts and checkout pages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Flutterwave => "Flutterwave",
            Self::Paystack => "Paystack",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flutterwave" => Ok(Self::Flutterwave),
            "paystack" => Ok(Self::Paystack),
            other => Err(PaymentError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// ISO 4217 currencies accepted at checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ngn,
    Ghs,
    Kes,
    Zar,
    Usd,
    Gbp,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ngn => "NGN",
            Self::Ghs => "GHS",
            Self::Kes => "KES",
            Self::Zar => "ZAR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Self::Ngn),
            "GHS" => Ok(Self::Ghs),
            "KES" => Ok(Self::Kes),
            "ZAR" => Ok(Self::Zar),
            "USD" => Ok(Self::Usd),
            "GBP" => Ok(Self::Gbp),
            "EUR" => Ok(Self::Eur),
            other => Err(PaymentError::InvalidRequest(format!("unknown currency: {other}"))),
        }
    }
}

/// Normalized transaction status across providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Abandoned,
    Reversed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Reversed => "reversed",
        })
    }
}

/// The paying customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// A request to start a hosted checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Amount in major units (e.g. naira, not kobo).
    pub amount: Decimal,
    pub currency: Currency,
    pub customer: Customer,
    /// Merchant reference; generated when absent.
    pub reference: Option<String>,
    /// Where the provider redirects the customer afterwards.
    pub callback_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PaymentRequest {
    pub fn new(amount: Decimal, currency: Currency, email: impl Into<String>) -> Self {
        Self {
            amount,
            currency,
            customer: Customer {
                email: email.into(),
                name: None,
                phone: None,
            },
            reference: None,
            callback_url: None,
            description: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Checks the request before anything is sent to a provider.
    pub fn validate(&self) -> PaymentResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.amount.normalize().scale() > 2 {
            return Err(PaymentError::InvalidAmount(format!(
                "amount has more than 2 decimal places: {}",
                self.amount
            )));
        }
        to_minor_units(self.amount)?;
        if !is_plausible_email(&self.customer.email) {
            return Err(PaymentError::InvalidRequest(format!(
                "invalid customer email: {:?}",
                self.customer.email
            )));
        }
        if let Some(url) = &self.callback_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(PaymentError::InvalidRequest(format!(
                    "callback URL must be http(s): {url}"
                )));
            }
        }
        if let Some(reference) = &self.reference {
            if !is_valid_reference(reference) {
                return Err(PaymentError::InvalidRequest(format!(
                    "invalid reference: {reference:?}"
                )));
            }
        }
        Ok(())
    }
}

/// References travel in URL paths and query strings, so they are limited to
/// `[A-Za-z0-9-_.=]` and may not be a dot segment.
pub(crate) fn is_valid_reference(reference: &str) -> bool {
    !reference.is_empty()
        && reference != "."
        && reference != ".."
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '='))
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Result of starting a checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentInitialization {
    pub provider: PaymentProvider,
    pub reference: String,
    /// Hosted checkout URL to redirect the customer to.
    pub authorization_url: String,
    /// Paystack access code for inline checkout.
    pub access_code: Option<String>,
}

/// Result of verifying a transaction with its provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub provider: PaymentProvider,
    pub reference: String,
    pub status: PaymentStatus,
    /// Amount in major units.
    pub amount: Decimal,
    pub currency: Currency,
    pub provider_transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Provider fees in major units, when reported.
    pub fees: Option<Decimal>,
    pub customer_email: Option<String>,
    pub gateway_response: Option<String>,
}

impl PaymentVerification {
    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}

/// An authenticated webhook notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub provider: PaymentProvider,
    /// Provider event name, e.g. `charge.success`.
    pub event_type: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: Currency,
    pub provider_transaction_id: Option<String>,
    pub customer_email: Option<String>,
}

/// Converts a major-unit amount to minor units (kobo, pesewas, cents).
pub fn to_minor_units(amount: Decimal) -> PaymentResult<i64> {
    let scaled = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| PaymentError::InvalidAmount(format!("amount out of range: {amount}")))?;
    if !scaled.fract().is_zero() {
        return Err(PaymentError::InvalidAmount(format!(
            "amount has more than 2 decimal places: {amount}"
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidAmount(format!("amount out of range: {amount}")))
}

/// Converts minor units back to a major-unit amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Generates a merchant reference: `<PREFIX>-<32 hex chars>`.
pub fn generate_reference(prefix: &str) -> String {
    format!("{}-{}", prefix.to_ascii_uppercase(), uuid::Uuid::new_v4().simple())
}

/// Parses provider timestamps, tolerating missing or malformed values.
pub(crate) fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
