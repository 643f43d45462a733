//! Provider clients.

mod flutterwave;
mod paystack;

pub use flutterwave::FlutterwaveGateway;
pub use paystack::PaystackGateway;

use crate::error::{PaymentError, PaymentResult};
use crate::types::PaymentProvider;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Both providers put a human-readable `message` on error bodies.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn build_client(timeout: Duration) -> PaymentResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PaymentError::Config(format!("failed to build HTTP client: {e}")))
}

/// Decodes a successful response, mapping HTTP failures to payment errors.
///
/// 404 becomes [`PaymentError::NotFound`] naming `what`; other non-2xx
/// statuses carry the provider's message when it sent one.
async fn read_json<T: DeserializeOwned>(
    provider: PaymentProvider,
    resp: Response,
    what: &str,
) -> PaymentResult<T> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PaymentError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| status.to_string());
        return Err(PaymentError::Provider { provider, message });
    }
    Ok(resp.json().await?)
}
