//! The gateway abstraction every payment provider implements.

use crate::error::{PaymentError, PaymentResult};
use crate::fees::{FeeBreakdown, ProviderFees};
use crate::types::{
    Currency, PaymentInitialization, PaymentProvider, PaymentRequest, PaymentVerification,
    WebhookEvent, generate_reference,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use rust_decimal::Decimal;

/// A hosted-checkout payment gateway.
///
/// Implementations hold their own HTTP client and credentials and are
/// shared behind `Arc<dyn PaymentGateway>`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    fn supported_currencies(&self) -> &[Currency];

    fn supports_currency(&self, currency: Currency) -> bool {
        self.supported_currencies().contains(&currency)
    }

    /// Starts a checkout and returns the URL to redirect the customer to.
    async fn initialize(&self, request: &PaymentRequest) -> PaymentResult<PaymentInitialization>;

    /// Looks a transaction up by merchant reference.
    async fn verify(&self, reference: &str) -> PaymentResult<PaymentVerification>;

    /// Authenticates a webhook from its headers and raw body.
    fn verify_webhook(&self, headers: &HeaderMap, body: &[u8]) -> PaymentResult<()>;

    /// Parses an already-authenticated webhook body.
    fn parse_webhook(&self, body: &[u8]) -> PaymentResult<WebhookEvent>;

    /// Fee schedules this gateway charges under.
    fn fees(&self) -> &ProviderFees;

    fn calculate_fees(&self, amount: Decimal, currency: Currency) -> FeeBreakdown {
        self.fees().breakdown(self.provider(), amount, currency)
    }
}

/// Validates `request` for `gateway` and returns the reference to send.
pub(crate) fn prepare_request(
    gateway: &dyn PaymentGateway,
    request: &PaymentRequest,
    reference_prefix: &str,
) -> PaymentResult<String> {
    request.validate()?;
    if !gateway.supports_currency(request.currency) {
        return Err(PaymentError::UnsupportedCurrency {
            provider: gateway.provider(),
            currency: request.currency,
        });
    }
    Ok(request
        .reference
        .clone()
        .unwrap_or_else(|| generate_reference(reference_prefix)))
}
