mod support;

use confpass_payments::webhook::{
    FLUTTERWAVE_SIGNATURE_HEADER, FLUTTERWAVE_VERIF_HASH_HEADER, sign_hmac_sha256_base64,
};
use confpass_payments::*;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal_macros::dec;
use support::*;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> FlutterwaveGateway {
    FlutterwaveGateway::new(flutterwave_config(&server.uri()), TIMEOUT, "CONF").unwrap()
}

fn webhook_body(status: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "event": "charge.completed",
        "data": flutterwave_transaction("CONF-FW-1", status, 7500.0)
    }))
    .unwrap()
}

// --- Initialize ---

#[tokio::test]
async fn initialize_returns_hosted_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .and(header("authorization", format!("Bearer {FLUTTERWAVE_SECRET}").as_str()))
        .and(body_partial_json(serde_json::json!({
            "tx_ref": "CONF-FW-1",
            "currency": "NGN",
            "redirect_url": "https://tickets.example.com/paid",
            "customer": { "email": "ada@example.com", "name": "Ada Obi" },
            "customizations": { "description": "Early bird pass" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "message": "Hosted Link",
            "data": {
                "link": "https://checkout.flutterwave.com/v3/hosted/pay/f524c1196ffda5556341"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = PaymentRequest::new(dec!(7500), Currency::Ngn, "ada@example.com")
        .with_reference("CONF-FW-1")
        .with_customer_name("Ada Obi")
        .with_description("Early bird pass")
        .with_callback_url("https://tickets.example.com/paid");
    let init = gateway(&server).initialize(&request).await.unwrap();

    assert_eq!(init.provider, PaymentProvider::Flutterwave);
    assert_eq!(init.reference, "CONF-FW-1");
    assert_eq!(
        init.authorization_url,
        "https://checkout.flutterwave.com/v3/hosted/pay/f524c1196ffda5556341"
    );
    assert_eq!(init.access_code, None);
}

#[tokio::test]
async fn initialize_error_status_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "status": "error",
            "message": "Invalid currency",
            "data": null
        })))
        .mount(&server)
        .await;

    let request = PaymentRequest::new(dec!(10), Currency::Eur, "ada@example.com");
    let err = gateway(&server).initialize(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "flutterwave rejected the request: Invalid currency");
}

#[tokio::test]
async fn initialize_rejects_bad_email_without_network() {
    let server = MockServer::start().await;
    let request = PaymentRequest::new(dec!(10), Currency::Ngn, "not-an-email");
    let err = gateway(&server).initialize(&request).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// --- Verify ---

#[tokio::test]
async fn verify_by_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/verify_by_reference"))
        .and(query_param("tx_ref", "CONF-FW-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "message": "Transaction fetched successfully",
            "data": flutterwave_transaction("CONF-FW-1", "successful", 7500.0)
        })))
        .mount(&server)
        .await;

    let v = gateway(&server).verify("CONF-FW-1").await.unwrap();
    assert_eq!(v.status, PaymentStatus::Success);
    assert_eq!(v.amount, dec!(7500));
    assert_eq!(v.fees, Some(dec!(140)));
    assert_eq!(v.provider_transaction_id.as_deref(), Some("285959875"));
    assert_eq!(
        v.gateway_response.as_deref(),
        Some("Approved by Financial Institution")
    );
}

#[tokio::test]
async fn verify_cancelled_maps_to_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/verify_by_reference"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "message": "Transaction fetched successfully",
            "data": flutterwave_transaction("CONF-FW-2", "cancelled", 100.0)
        })))
        .mount(&server)
        .await;

    let v = gateway(&server).verify("CONF-FW-2").await.unwrap();
    assert_eq!(v.status, PaymentStatus::Abandoned);
}

#[tokio::test]
async fn verify_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/verify_by_reference"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "status": "error",
            "message": "No transaction was found for this id",
            "data": null
        })))
        .mount(&server)
        .await;

    let err = gateway(&server).verify("CONF-nope").await.unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(r) if r == "CONF-nope"));
}

// --- Webhooks ---

#[tokio::test]
async fn webhook_with_hmac_signature() {
    let server = MockServer::start().await;
    let gw = gateway(&server);
    let body = webhook_body("successful");
    let sig = sign_hmac_sha256_base64(FLUTTERWAVE_HASH.as_bytes(), &body).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(FLUTTERWAVE_SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());

    gw.verify_webhook(&headers, &body).unwrap();
    let event = gw.parse_webhook(&body).unwrap();
    assert_eq!(event.provider, PaymentProvider::Flutterwave);
    assert_eq!(event.event_type, "charge.completed");
    assert_eq!(event.reference, "CONF-FW-1");
    assert_eq!(event.amount, dec!(7500));
    assert_eq!(event.status, PaymentStatus::Success);
}

#[tokio::test]
async fn webhook_with_legacy_verif_hash() {
    let server = MockServer::start().await;
    let gw = gateway(&server);
    let body = webhook_body("successful");

    let mut headers = HeaderMap::new();
    headers.insert(FLUTTERWAVE_VERIF_HASH_HEADER, HeaderValue::from_static(FLUTTERWAVE_HASH));
    gw.verify_webhook(&headers, &body).unwrap();

    headers.insert(FLUTTERWAVE_VERIF_HASH_HEADER, HeaderValue::from_static("guess"));
    assert!(matches!(
        gw.verify_webhook(&headers, &body),
        Err(PaymentError::InvalidSignature)
    ));
}

#[tokio::test]
async fn webhook_signature_takes_precedence_over_verif_hash() {
    let server = MockServer::start().await;
    let gw = gateway(&server);
    let body = webhook_body("successful");

    let mut headers = HeaderMap::new();
    headers.insert(FLUTTERWAVE_VERIF_HASH_HEADER, HeaderValue::from_static(FLUTTERWAVE_HASH));
    headers.insert(FLUTTERWAVE_SIGNATURE_HEADER, HeaderValue::from_static("bm90LWEtc2ln"));
    assert!(matches!(
        gw.verify_webhook(&headers, &body),
        Err(PaymentError::InvalidSignature)
    ));
}

#[tokio::test]
async fn webhook_without_configured_hash_is_config_error() {
    let server = MockServer::start().await;
    let mut config = flutterwave_config(&server.uri());
    config.webhook_secret_hash = None;
    let gw = FlutterwaveGateway::new(config, TIMEOUT, "CONF").unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(FLUTTERWAVE_VERIF_HASH_HEADER, HeaderValue::from_static("anything"));
    assert!(matches!(
        gw.verify_webhook(&headers, b"{}"),
        Err(PaymentError::Config(_))
    ));
}

#[tokio::test]
async fn webhook_missing_headers() {
    let server = MockServer::start().await;
    assert!(matches!(
        gateway(&server).verify_webhook(&HeaderMap::new(), b"{}"),
        Err(PaymentError::MissingSignature)
    ));
}

#[tokio::test]
async fn international_fees() {
    let server = MockServer::start().await;
    let quote = gateway(&server).calculate_fees(dec!(250), Currency::Usd);
    assert_eq!(quote.fee, dec!(9.50));
    assert_eq!(quote.settlement, dec!(240.50));
}
