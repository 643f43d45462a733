//! Paystack transaction API client.

use super::{build_client, read_json};
use crate::config::PaystackConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::fees::ProviderFees;
use crate::provider::{PaymentGateway, prepare_request};
use crate::types::*;
use crate::webhook::{PAYSTACK_SIGNATURE_HEADER, header_value, verify_hmac_sha512_hex};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const SUPPORTED_CURRENCIES: &[Currency] = &[
    Currency::Ngn,
    Currency::Ghs,
    Currency::Kes,
    Currency::Zar,
    Currency::Usd,
];

pub struct PaystackGateway {
    client: Client,
    config: PaystackConfig,
    reference_prefix: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct InitData {
    authorization_url: String,
    access_code: Option<String>,
    reference: String,
}

#[derive(Deserialize)]
struct PsCustomer {
    email: Option<String>,
}

#[derive(Deserialize)]
struct PsTransaction {
    id: Option<u64>,
    status: String,
    reference: String,
    /// Minor units.
    amount: i64,
    currency: String,
    paid_at: Option<String>,
    /// Minor units.
    fees: Option<i64>,
    gateway_response: Option<String>,
    customer: Option<PsCustomer>,
}

#[derive(Deserialize)]
struct PsWebhook {
    event: String,
    data: PsTransaction,
}

fn map_status(status: &str) -> PaymentStatus {
    match status.to_ascii_lowercase().as_str() {
        "success" => PaymentStatus::Success,
        "failed" => PaymentStatus::Failed,
        "abandoned" => PaymentStatus::Abandoned,
        "reversed" => PaymentStatus::Reversed,
        "ongoing" | "pending" | "processing" | "queued" => PaymentStatus::Pending,
        other => {
            warn!("Unknown Paystack transaction status {other:?}, treating as pending");
            PaymentStatus::Pending
        }
    }
}

impl PaystackGateway {
    pub fn new(
        config: PaystackConfig,
        timeout: Duration,
        reference_prefix: impl Into<String>,
    ) -> PaymentResult<Self> {
        if config.secret_key.is_empty() {
            return Err(PaymentError::ProviderNotConfigured(PaymentProvider::Paystack));
        }
        Ok(Self {
            client: build_client(timeout)?,
            config,
            reference_prefix: reference_prefix.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn unwrap_envelope<T>(&self, envelope: Envelope<T>) -> PaymentResult<T> {
        let message = envelope.message.unwrap_or_default();
        if !envelope.status {
            return Err(PaymentError::Provider {
                provider: PaymentProvider::Paystack,
                message,
            });
        }
        envelope
            .data
            .ok_or_else(|| PaymentError::Api(format!("Paystack response missing data: {message}")))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Paystack
    }

    fn supported_currencies(&self) -> &[Currency] {
        SUPPORTED_CURRENCIES
    }

    async fn initialize(&self, request: &PaymentRequest) -> PaymentResult<PaymentInitialization> {
        let reference = prepare_request(self, request, &self.reference_prefix)?;

        let mut metadata = request.metadata.clone();
        if let Some(name) = &request.customer.name {
            metadata.insert("customer_name".to_string(), name.clone().into());
        }
        if let Some(description) = &request.description {
            metadata.insert("description".to_string(), description.clone().into());
        }

        let mut body = serde_json::json!({
            "amount": to_minor_units(request.amount)?,
            "email": request.customer.email,
            "reference": reference,
            "currency": request.currency.code(),
            "metadata": metadata,
        });
        if let Some(url) = &request.callback_url {
            body["callback_url"] = url.clone().into();
        }

        let url = self.url("/transaction/initialize");
        debug!("POST {url} reference={reference}");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await?;
        let envelope: Envelope<InitData> = read_json(PaymentProvider::Paystack, resp, &url).await?;
        let data = self.unwrap_envelope(envelope)?;

        info!("Initialized Paystack payment {}", data.reference);
        Ok(PaymentInitialization {
            provider: PaymentProvider::Paystack,
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify(&self, reference: &str) -> PaymentResult<PaymentVerification> {
        if !is_valid_reference(reference) {
            return Err(PaymentError::InvalidRequest(format!(
                "invalid reference: {reference:?}"
            )));
        }
        let url = self.url(&format!("/transaction/verify/{reference}"));
        debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;
        let envelope: Envelope<PsTransaction> =
            match read_json(PaymentProvider::Paystack, resp, reference).await {
                // Paystack answers unknown references with 400 "Transaction reference not found".
                Err(PaymentError::Provider { message, .. })
                    if message.to_ascii_lowercase().contains("not found") =>
                {
                    return Err(PaymentError::NotFound(reference.to_string()));
                }
                other => other?,
            };
        let tx = self.unwrap_envelope(envelope)?;

        Ok(PaymentVerification {
            provider: PaymentProvider::Paystack,
            status: map_status(&tx.status),
            currency: tx.currency.parse()?,
            amount: from_minor_units(tx.amount),
            paid_at: parse_timestamp(tx.paid_at.as_deref()),
            provider_transaction_id: tx.id.map(|id| id.to_string()),
            fees: tx.fees.map(from_minor_units),
            customer_email: tx.customer.and_then(|c| c.email),
            gateway_response: tx.gateway_response,
            reference: tx.reference,
        })
    }

    fn verify_webhook(&self, headers: &HeaderMap, body: &[u8]) -> PaymentResult<()> {
        let signature =
            header_value(headers, PAYSTACK_SIGNATURE_HEADER).ok_or(PaymentError::MissingSignature)?;
        verify_hmac_sha512_hex(self.config.secret_key.as_bytes(), body, signature)
    }

    fn parse_webhook(&self, body: &[u8]) -> PaymentResult<WebhookEvent> {
        let hook: PsWebhook = serde_json::from_slice(body)?;
        Ok(WebhookEvent {
            provider: PaymentProvider::Paystack,
            event_type: hook.event,
            status: map_status(&hook.data.status),
            currency: hook.data.currency.parse()?,
            amount: from_minor_units(hook.data.amount),
            provider_transaction_id: hook.data.id.map(|id| id.to_string()),
            customer_email: hook.data.customer.and_then(|c| c.email),
            reference: hook.data.reference,
        })
    }

    fn fees(&self) -> &ProviderFees {
        &self.config.fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_in_flight_states() {
        for s in ["ongoing", "pending", "processing", "queued"] {
            assert_eq!(map_status(s), PaymentStatus::Pending);
        }
        assert_eq!(map_status("success"), PaymentStatus::Success);
        assert_eq!(map_status("reversed"), PaymentStatus::Reversed);
        assert_eq!(map_status("abandoned"), PaymentStatus::Abandoned);
    }

    #[test]
    fn gbp_is_not_supported() {
        let gw =
            PaystackGateway::new(PaystackConfig::new("sk"), Duration::from_secs(5), "T").unwrap();
        assert!(gw.supports_currency(Currency::Ngn));
        assert!(!gw.supports_currency(Currency::Gbp));
    }
}
