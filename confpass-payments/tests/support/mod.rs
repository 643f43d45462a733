//! Shared helpers for provider integration tests against wiremock.

#![allow(dead_code)]

use confpass_payments::{FlutterwaveConfig, PaymentsConfig, PaystackConfig};
use std::time::Duration;

pub const PAYSTACK_SECRET: &str = "sk_test_4c1a7e";
pub const FLUTTERWAVE_SECRET: &str = "FLWSECK_TEST-9b2d";
pub const FLUTTERWAVE_HASH: &str = "confpass-webhook-hash";

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn paystack_config(base_url: &str) -> PaystackConfig {
    let mut config = PaystackConfig::new(PAYSTACK_SECRET);
    config.base_url = base_url.to_string();
    config
}

pub fn flutterwave_config(base_url: &str) -> FlutterwaveConfig {
    let mut config = FlutterwaveConfig::new(FLUTTERWAVE_SECRET);
    config.webhook_secret_hash = Some(FLUTTERWAVE_HASH.to_string());
    config.base_url = base_url.to_string();
    config
}

/// Both providers pointed at the same mock server.
pub fn payments_config(base_url: &str) -> PaymentsConfig {
    PaymentsConfig {
        flutterwave: Some(flutterwave_config(base_url)),
        paystack: Some(paystack_config(base_url)),
        request_timeout_secs: TIMEOUT.as_secs(),
        ..PaymentsConfig::default()
    }
}

pub fn paystack_transaction(reference: &str, status: &str, kobo: i64) -> serde_json::Value {
    serde_json::json!({
        "id": 4099260516u64,
        "status": status,
        "reference": reference,
        "amount": kobo,
        "currency": "NGN",
        "paid_at": "2024-08-22T09:15:02.000Z",
        "fees": 10283,
        "gateway_response": "Successful",
        "customer": { "email": "ada@example.com" }
    })
}

pub fn flutterwave_transaction(reference: &str, status: &str, amount: f64) -> serde_json::Value {
    serde_json::json!({
        "id": 285959875,
        "tx_ref": reference,
        "flw_ref": "FLW-MOCK-1",
        "amount": amount,
        "currency": "NGN",
        "charged_amount": amount,
        "app_fee": 140,
        "status": status,
        "processor_response": "Approved by Financial Institution",
        "created_at": "2024-08-22T09:15:02.000Z",
        "customer": { "email": "ada@example.com" }
    })
}
