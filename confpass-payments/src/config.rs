//! Payment provider configuration.

use crate::error::{PaymentError, PaymentResult};
use crate::fees::ProviderFees;
use crate::types::PaymentProvider;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FLUTTERWAVE_DEFAULT_BASE_URL: &str = "https://api.flutterwave.com/v3";
pub const PAYSTACK_DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Configuration for the payment layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// Provider used when the user has no stored preference.
    pub default_provider: PaymentProvider,

    /// Flutterwave credentials; `None` disables the provider.
    pub flutterwave: Option<FlutterwaveConfig>,

    /// Paystack credentials; `None` disables the provider.
    pub paystack: Option<PaystackConfig>,

    /// Timeout for each provider HTTP request (seconds).
    pub request_timeout_secs: u64,

    /// Prefix for generated merchant references.
    pub reference_prefix: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            default_provider: PaymentProvider::Paystack,
            flutterwave: None,
            paystack: None,
            request_timeout_secs: 30,
            reference_prefix: "CONF".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FlutterwaveConfig {
    pub secret_key: String,
    pub public_key: Option<String>,
    /// Secret hash configured on the Flutterwave dashboard for webhooks.
    pub webhook_secret_hash: Option<String>,
    pub base_url: String,
    pub fees: ProviderFees,
}

impl FlutterwaveConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            public_key: None,
            webhook_secret_hash: None,
            base_url: FLUTTERWAVE_DEFAULT_BASE_URL.to_string(),
            fees: ProviderFees::flutterwave(),
        }
    }
}

impl fmt::Debug for FlutterwaveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlutterwaveConfig")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field(
                "webhook_secret_hash",
                &self.webhook_secret_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("base_url", &self.base_url)
            .field("fees", &self.fees)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PaystackConfig {
    /// Also the webhook signing key.
    pub secret_key: String,
    pub public_key: Option<String>,
    pub base_url: String,
    pub fees: ProviderFees,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            public_key: None,
            base_url: PAYSTACK_DEFAULT_BASE_URL.to_string(),
            fees: ProviderFees::paystack(),
        }
    }
}

impl fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("base_url", &self.base_url)
            .field("fees", &self.fees)
            .finish()
    }
}

impl PaymentsConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> PaymentResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// A provider is enabled when its secret key variable is set and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PaymentResult<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(secret_key) = get("FLUTTERWAVE_SECRET_KEY") {
            let mut fw = FlutterwaveConfig::new(secret_key);
            fw.public_key = get("FLUTTERWAVE_PUBLIC_KEY");
            fw.webhook_secret_hash = get("FLUTTERWAVE_WEBHOOK_HASH");
            if let Some(url) = get("FLUTTERWAVE_BASE_URL") {
                fw.base_url = url;
            }
            config.flutterwave = Some(fw);
        }

        if let Some(secret_key) = get("PAYSTACK_SECRET_KEY") {
            let mut ps = PaystackConfig::new(secret_key);
            ps.public_key = get("PAYSTACK_PUBLIC_KEY");
            if let Some(url) = get("PAYSTACK_BASE_URL") {
                ps.base_url = url;
            }
            config.paystack = Some(ps);
        }

        if let Some(provider) = get("PAYMENT_DEFAULT_PROVIDER") {
            config.default_provider = provider
                .parse()
                .map_err(|_| {
                    PaymentError::Config(format!(
                        "PAYMENT_DEFAULT_PROVIDER: unknown provider {provider:?}"
                    ))
                })?;
        }

        if let Some(timeout) = get("PAYMENT_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout
                .parse()
                .map_err(|e| PaymentError::Config(format!("PAYMENT_TIMEOUT_SECS: {e}")))?;
        }

        if let Some(prefix) = get("PAYMENT_REFERENCE_PREFIX") {
            config.reference_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> PaymentResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(PaymentError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.reference_prefix.is_empty()
            || !self.reference_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(PaymentError::Config(format!(
                "reference_prefix must be alphanumeric: {:?}",
                self.reference_prefix
            )));
        }
        for (name, url) in [
            ("flutterwave", self.flutterwave.as_ref().map(|c| c.base_url.as_str())),
            ("paystack", self.paystack.as_ref().map(|c| c.base_url.as_str())),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(PaymentError::Config(format!(
                        "{name} base_url must be http(s): {url}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Providers with credentials present, in [`PaymentProvider::ALL`] order.
    pub fn configured_providers(&self) -> Vec<PaymentProvider> {
        PaymentProvider::ALL
            .into_iter()
            .filter(|p| self.is_configured(*p))
            .collect()
    }

    pub fn is_configured(&self, provider: PaymentProvider) -> bool {
        match provider {
            PaymentProvider::Flutterwave => self.flutterwave.is_some(),
            PaymentProvider::Paystack => self.paystack.is_some(),
        }
    }
}
