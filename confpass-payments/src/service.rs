//! Payment service: provider selection, checkout, confirmation and webhooks.

use crate::error::{PaymentError, PaymentResult};
use crate::factory::PaymentFactory;
use crate::fees::FeeBreakdown;
use crate::provider::PaymentGateway;
use crate::types::*;
use confpass_crypto::SecureStorage;
use reqwest::header::HeaderMap;
use rust_decimal::Decimal;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Storage key for the persisted provider preference.
pub const PREFERRED_PROVIDER_KEY: &str = "payment_provider";

pub struct PaymentService {
    factory: Arc<PaymentFactory>,
    preferences: Option<SecureStorage>,
    /// Preference set during this session. Consulted before stored preferences.
    preferred: RwLock<Option<PaymentProvider>>,
}

impl PaymentService {
    pub fn new(factory: Arc<PaymentFactory>) -> Self {
        Self {
            factory,
            preferences: None,
            preferred: RwLock::new(None),
        }
    }

    /// Persists the preferred provider in `storage`, encrypted.
    pub fn with_preferences(mut self, storage: SecureStorage) -> Self {
        self.preferences = Some(storage);
        self
    }

    pub fn factory(&self) -> &Arc<PaymentFactory> {
        &self.factory
    }

    pub fn available_providers(&self) -> Vec<PaymentProvider> {
        self.factory.available_providers()
    }

    fn stored_preference(&self) -> Option<PaymentProvider> {
        if let Ok(guard) = self.preferred.read() {
            if let Some(provider) = *guard {
                return Some(provider);
            }
        }
        let storage = self.preferences.as_ref()?;
        match storage.get_item::<PaymentProvider>(PREFERRED_PROVIDER_KEY) {
            Ok(provider) => provider,
            Err(e) => {
                warn!("Could not read stored payment provider: {e}");
                None
            }
        }
    }

    /// The provider to use when the caller does not name one.
    ///
    /// Order: stored preference, configured default, first available. A
    /// preference for a provider that is no longer configured is ignored.
    pub fn preferred_provider(&self) -> PaymentResult<PaymentProvider> {
        let available = self.factory.available_providers();
        if let Some(provider) = self.stored_preference() {
            if available.contains(&provider) {
                return Ok(provider);
            }
            debug!("Stored provider {provider} is no longer available");
        }
        let default = self.factory.default_provider();
        if available.contains(&default) {
            return Ok(default);
        }
        available
            .first()
            .copied()
            .ok_or_else(|| PaymentError::Config("no payment providers configured".to_string()))
    }

    pub fn set_preferred_provider(&self, provider: PaymentProvider) -> PaymentResult<()> {
        if !self.factory.is_available(provider) {
            return Err(PaymentError::ProviderNotConfigured(provider));
        }
        if let Some(storage) = &self.preferences {
            storage.set_item(PREFERRED_PROVIDER_KEY, &provider, None)?;
        }
        if let Ok(mut guard) = self.preferred.write() {
            *guard = Some(provider);
        }
        info!("Preferred payment provider set to {provider}");
        Ok(())
    }

    pub fn clear_preferred_provider(&self) -> PaymentResult<()> {
        if let Some(storage) = &self.preferences {
            storage.remove_item(PREFERRED_PROVIDER_KEY)?;
        }
        if let Ok(mut guard) = self.preferred.write() {
            *guard = None;
        }
        Ok(())
    }

    fn gateway(&self, provider: Option<PaymentProvider>) -> PaymentResult<Arc<dyn PaymentGateway>> {
        let provider = match provider {
            Some(p) => p,
            None => self.preferred_provider()?,
        };
        self.factory.get(provider)
    }

    /// Starts a checkout with `provider`, or the preferred provider.
    pub async fn initialize_payment(
        &self,
        request: &PaymentRequest,
        provider: Option<PaymentProvider>,
    ) -> PaymentResult<PaymentInitialization> {
        let gateway = self.gateway(provider)?;
        let init = gateway.initialize(request).await?;
        info!(
            "Payment {} initialized with {} for {} {}",
            init.reference, init.provider, request.amount, request.currency
        );
        Ok(init)
    }

    pub async fn verify_payment(
        &self,
        provider: PaymentProvider,
        reference: &str,
    ) -> PaymentResult<PaymentVerification> {
        self.factory.get(provider)?.verify(reference).await
    }

    /// Verifies a payment and checks it settled for the expected amount and currency.
    ///
    /// Paying more than `expected_amount` is accepted; paying less is not.
    pub async fn confirm_payment(
        &self,
        provider: PaymentProvider,
        reference: &str,
        expected_amount: Decimal,
        expected_currency: Currency,
    ) -> PaymentResult<PaymentVerification> {
        let verification = self.verify_payment(provider, reference).await?;

        if !verification.is_successful() {
            warn!(
                "Payment {reference} via {provider} is {}, not successful",
                verification.status
            );
            return Err(PaymentError::PaymentNotSuccessful {
                reference: reference.to_string(),
                status: verification.status,
            });
        }
        if verification.currency != expected_currency {
            return Err(PaymentError::CurrencyMismatch {
                expected: expected_currency,
                actual: verification.currency,
            });
        }
        if verification.amount < expected_amount {
            warn!(
                "Payment {reference} underpaid: expected {expected_amount}, got {}",
                verification.amount
            );
            return Err(PaymentError::AmountMismatch {
                expected: expected_amount,
                actual: verification.amount,
            });
        }

        info!("Payment {reference} confirmed via {provider}");
        Ok(verification)
    }

    /// Authenticates and parses a webhook delivered for `provider`.
    pub fn handle_webhook(
        &self,
        provider: PaymentProvider,
        headers: &HeaderMap,
        body: &[u8],
    ) -> PaymentResult<WebhookEvent> {
        let gateway = self.factory.get(provider)?;
        if let Err(e) = gateway.verify_webhook(headers, body) {
            warn!("Rejected {provider} webhook: {e}");
            return Err(e);
        }
        let event = gateway.parse_webhook(body)?;
        info!(
            "{provider} webhook {} for {} ({})",
            event.event_type, event.reference, event.status
        );
        Ok(event)
    }

    pub fn calculate_fees(
        &self,
        provider: PaymentProvider,
        amount: Decimal,
        currency: Currency,
    ) -> PaymentResult<FeeBreakdown> {
        Ok(self.factory.get(provider)?.calculate_fees(amount, currency))
    }

    /// Cheapest available provider for charging `amount` in `currency`.
    ///
    /// Ties go to the provider listed first in [`PaymentProvider::ALL`].
    pub fn cheapest_provider(
        &self,
        amount: Decimal,
        currency: Currency,
    ) -> PaymentResult<FeeBreakdown> {
        let mut best: Option<FeeBreakdown> = None;
        for provider in self.factory.available_providers() {
            let gateway = self.factory.get(provider)?;
            if !gateway.supports_currency(currency) {
                continue;
            }
            let quote = gateway.calculate_fees(amount, currency);
            if best.as_ref().is_none_or(|b| quote.fee < b.fee) {
                best = Some(quote);
            }
        }
        best.ok_or_else(|| {
            PaymentError::InvalidRequest(format!("no configured provider supports {currency}"))
        })
    }

    /// What to charge so the merchant settles `net` after `provider`'s fees.
    pub fn charge_for_net(
        &self,
        provider: PaymentProvider,
        net: Decimal,
        currency: Currency,
    ) -> PaymentResult<FeeBreakdown> {
        if net <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(format!(
                "net amount must be positive, got {net}"
            )));
        }
        let gateway = self.factory.get(provider)?;
        let gross = gateway.fees().schedule_for(currency).gross_up(net);
        Ok(gateway.calculate_fees(gross, currency))
    }
}
