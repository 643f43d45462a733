use confpass_payments::config::{FLUTTERWAVE_DEFAULT_BASE_URL, PAYSTACK_DEFAULT_BASE_URL};
use confpass_payments::{PaymentError, PaymentProvider, PaymentsConfig, PaystackConfig};
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn default_has_no_providers() {
    let config = PaymentsConfig::default();
    assert!(config.flutterwave.is_none());
    assert!(config.paystack.is_none());
    assert!(config.configured_providers().is_empty());
}

#[test]
fn default_timeout_and_prefix() {
    let config = PaymentsConfig::default();
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.reference_prefix, "CONF");
    assert_eq!(config.default_provider, PaymentProvider::Paystack);
}

#[test]
fn provider_defaults_point_at_production_apis() {
    assert_eq!(
        PaystackConfig::new("sk").base_url,
        PAYSTACK_DEFAULT_BASE_URL
    );
    assert_eq!(FLUTTERWAVE_DEFAULT_BASE_URL, "https://api.flutterwave.com/v3");
}

#[test]
fn from_lookup_enables_providers_with_keys() {
    let config = PaymentsConfig::from_lookup(lookup(&[
        ("PAYSTACK_SECRET_KEY", "sk_live_x"),
        ("PAYSTACK_PUBLIC_KEY", "pk_live_x"),
        ("FLUTTERWAVE_SECRET_KEY", "FLWSECK-x"),
        ("FLUTTERWAVE_WEBHOOK_HASH", "hash"),
        ("FLUTTERWAVE_BASE_URL", "http://localhost:8080/v3"),
        ("PAYMENT_DEFAULT_PROVIDER", "Flutterwave"),
        ("PAYMENT_TIMEOUT_SECS", "12"),
        ("PAYMENT_REFERENCE_PREFIX", "DEVCONF"),
    ]))
    .unwrap();

    let paystack = config.paystack.as_ref().unwrap();
    assert_eq!(paystack.secret_key, "sk_live_x");
    assert_eq!(paystack.public_key.as_deref(), Some("pk_live_x"));
    assert_eq!(paystack.base_url, PAYSTACK_DEFAULT_BASE_URL);

    let flutterwave = config.flutterwave.as_ref().unwrap();
    assert_eq!(flutterwave.webhook_secret_hash.as_deref(), Some("hash"));
    assert_eq!(flutterwave.base_url, "http://localhost:8080/v3");

    assert_eq!(config.default_provider, PaymentProvider::Flutterwave);
    assert_eq!(config.request_timeout_secs, 12);
    assert_eq!(config.reference_prefix, "DEVCONF");
    assert_eq!(
        config.configured_providers(),
        vec![PaymentProvider::Paystack, PaymentProvider::Flutterwave]
    );
}

#[test]
fn blank_secret_leaves_provider_disabled() {
    let config = PaymentsConfig::from_lookup(lookup(&[("PAYSTACK_SECRET_KEY", "   ")])).unwrap();
    assert!(config.paystack.is_none());
}

#[test]
fn unknown_default_provider_is_rejected() {
    let err = PaymentsConfig::from_lookup(lookup(&[("PAYMENT_DEFAULT_PROVIDER", "stripe")]))
        .unwrap_err();
    assert!(matches!(err, PaymentError::Config(msg) if msg.contains("PAYMENT_DEFAULT_PROVIDER")));
}

#[test]
fn invalid_timeout_is_rejected() {
    for value in ["soon", "0", "-1"] {
        let result = PaymentsConfig::from_lookup(lookup(&[("PAYMENT_TIMEOUT_SECS", value)]));
        assert!(matches!(result, Err(PaymentError::Config(_))), "{value}");
    }
}

#[test]
fn non_http_base_url_is_rejected() {
    let result = PaymentsConfig::from_lookup(lookup(&[
        ("PAYSTACK_SECRET_KEY", "sk"),
        ("PAYSTACK_BASE_URL", "ftp://api.paystack.co"),
    ]));
    assert!(matches!(result, Err(PaymentError::Config(_))));
}

#[test]
fn debug_redacts_secrets() {
    let config = PaymentsConfig::from_lookup(lookup(&[
        ("PAYSTACK_SECRET_KEY", "sk_live_supersecret"),
        ("FLUTTERWAVE_SECRET_KEY", "FLWSECK-supersecret"),
        ("FLUTTERWAVE_WEBHOOK_HASH", "hash-supersecret"),
    ]))
    .unwrap();
    let printed = format!("{config:?}");
    assert!(!printed.contains("supersecret"));
    assert!(printed.contains("[REDACTED]"));
}

#[test]
fn serialization_roundtrip() {
    let mut config = PaymentsConfig::default();
    config.paystack = Some(PaystackConfig::new("sk_test"));
    let json = serde_json::to_string(&config).unwrap();
    let back: PaymentsConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.paystack.unwrap().secret_key, "sk_test");
    assert_eq!(back.request_timeout_secs, 30);
}
