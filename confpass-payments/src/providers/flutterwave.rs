//! Flutterwave Standard (hosted checkout) client.

use super::{build_client, read_json};
use crate::config::FlutterwaveConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::fees::ProviderFees;
use crate::provider::{PaymentGateway, prepare_request};
use crate::types::*;
use crate::webhook::{
    FLUTTERWAVE_SIGNATURE_HEADER, FLUTTERWAVE_VERIF_HASH_HEADER, header_value,
    verify_hmac_sha256_base64, verify_shared_secret,
};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const SUPPORTED_CURRENCIES: &[Currency] = &[
    Currency::Ngn,
    Currency::Ghs,
    Currency::Kes,
    Currency::Zar,
    Currency::Usd,
    Currency::Gbp,
    Currency::Eur,
];

pub struct FlutterwaveGateway {
    client: Client,
    config: FlutterwaveConfig,
    reference_prefix: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct HostedLink {
    link: String,
}

#[derive(Deserialize)]
struct FwCustomer {
    email: Option<String>,
}

#[derive(Deserialize)]
struct FwTransaction {
    id: Option<u64>,
    tx_ref: String,
    amount: Decimal,
    currency: String,
    status: String,
    created_at: Option<String>,
    app_fee: Option<Decimal>,
    processor_response: Option<String>,
    customer: Option<FwCustomer>,
}

#[derive(Deserialize)]
struct FwWebhook {
    event: String,
    data: FwTransaction,
}

fn map_status(status: &str) -> PaymentStatus {
    match status.to_ascii_lowercase().as_str() {
        "successful" | "completed" => PaymentStatus::Success,
        "failed" | "error" => PaymentStatus::Failed,
        "cancelled" => PaymentStatus::Abandoned,
        "reversed" | "refunded" => PaymentStatus::Reversed,
        "pending" => PaymentStatus::Pending,
        other => {
            warn!("Unknown Flutterwave transaction status {other:?}, treating as pending");
            PaymentStatus::Pending
        }
    }
}

impl FlutterwaveGateway {
    pub fn new(
        config: FlutterwaveConfig,
        timeout: Duration,
        reference_prefix: impl Into<String>,
    ) -> PaymentResult<Self> {
        if config.secret_key.is_empty() {
            return Err(PaymentError::ProviderNotConfigured(PaymentProvider::Flutterwave));
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

    /// Unwraps `{status, message, data}`, treating anything but `"success"` as a rejection.
    fn unwrap_envelope<T>(&self, envelope: Envelope<T>) -> PaymentResult<T> {
        let message = envelope.message.unwrap_or_default();
        if envelope.status != "success" {
            return Err(PaymentError::Provider {
                provider: PaymentProvider::Flutterwave,
                message,
            });
        }
        envelope.data.ok_or_else(|| {
            PaymentError::Api(format!("Flutterwave response missing data: {message}"))
        })
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Flutterwave
    }

    fn supported_currencies(&self) -> &[Currency] {
        SUPPORTED_CURRENCIES
    }

    async fn initialize(&self, request: &PaymentRequest) -> PaymentResult<PaymentInitialization> {
        let reference = prepare_request(self, request, &self.reference_prefix)?;

        let mut body = serde_json::json!({
            "tx_ref": reference,
            "amount": request.amount.to_string(),
            "currency": request.currency.code(),
            "customer": {
                "email": request.customer.email,
                "name": request.customer.name,
                "phonenumber": request.customer.phone,
            },
            "meta": request.metadata,
        });
        if let Some(url) = &request.callback_url {
            body["redirect_url"] = url.clone().into();
        }
        if let Some(description) = &request.description {
            body["customizations"] = serde_json::json!({ "description": description });
        }

        let url = self.url("/payments");
        debug!("POST {url} tx_ref={reference}");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await?;
        let envelope: Envelope<HostedLink> =
            read_json(PaymentProvider::Flutterwave, resp, &url).await?;
        let link = self.unwrap_envelope(envelope)?;

        info!("Initialized Flutterwave payment {reference}");
        Ok(PaymentInitialization {
            provider: PaymentProvider::Flutterwave,
            reference,
            authorization_url: link.link,
            access_code: None,
        })
    }

    async fn verify(&self, reference: &str) -> PaymentResult<PaymentVerification> {
        let url = self.url("/transactions/verify_by_reference");
        debug!("GET {url} tx_ref={reference}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .query(&[("tx_ref", reference)])
            .send()
            .await?;
        let envelope: Envelope<FwTransaction> =
            read_json(PaymentProvider::Flutterwave, resp, reference).await?;
        let tx = self.unwrap_envelope(envelope)?;

        Ok(PaymentVerification {
            provider: PaymentProvider::Flutterwave,
            status: map_status(&tx.status),
            currency: tx.currency.parse()?,
            amount: tx.amount,
            paid_at: parse_timestamp(tx.created_at.as_deref()),
            provider_transaction_id: tx.id.map(|id| id.to_string()),
            fees: tx.app_fee,
            customer_email: tx.customer.and_then(|c| c.email),
            gateway_response: tx.processor_response,
            reference: tx.tx_ref,
        })
    }

    fn verify_webhook(&self, headers: &HeaderMap, body: &[u8]) -> PaymentResult<()> {
        let secret_hash = self
            .config
            .webhook_secret_hash
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                PaymentError::Config("Flutterwave webhook secret hash not configured".to_string())
            })?;

        if let Some(signature) = header_value(headers, FLUTTERWAVE_SIGNATURE_HEADER) {
            return verify_hmac_sha256_base64(secret_hash.as_bytes(), body, signature);
        }
        if let Some(presented) = header_value(headers, FLUTTERWAVE_VERIF_HASH_HEADER) {
            return verify_shared_secret(secret_hash, presented);
        }
        Err(PaymentError::MissingSignature)
    }

    fn parse_webhook(&self, body: &[u8]) -> PaymentResult<WebhookEvent> {
        let hook: FwWebhook = serde_json::from_slice(body)?;
        Ok(WebhookEvent {
            provider: PaymentProvider::Flutterwave,
            event_type: hook.event,
            status: map_status(&hook.data.status),
            currency: hook.data.currency.parse()?,
            amount: hook.data.amount,
            provider_transaction_id: hook.data.id.map(|id| id.to_string()),
            customer_email: hook.data.customer.and_then(|c| c.email),
            reference: hook.data.tx_ref,
        })
    }

    fn fees(&self) -> &ProviderFees {
        &self.config.fees
    }
}
