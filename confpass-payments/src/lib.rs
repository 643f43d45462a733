//! Payment provider layer for ConfPass.
//!
//! Provides:
//! - A single [`PaymentGateway`] interface over Flutterwave and Paystack
//! - Checkout initialization and transaction verification over their REST APIs
//! - Constant-time webhook signature checks
//! - Fee schedules, fee quotes and gross-up for passing fees to customers
//! - A lazily-populated provider registry and a service facade that
//!   remembers the user's preferred provider in encrypted storage
//!
//! Amounts are [`rust_decimal::Decimal`] in major units everywhere in the
//! public API; conversion to minor units happens inside the Paystack client.

pub mod config;
pub mod error;
pub mod factory;
pub mod fees;
pub mod provider;
pub mod providers;
pub mod service;
pub mod types;
pub mod webhook;

pub use config::{FlutterwaveConfig, PaymentsConfig, PaystackConfig};
pub use error::{PaymentError, PaymentResult};
pub use factory::PaymentFactory;
pub use fees::{FeeBreakdown, FeeSchedule, ProviderFees};
pub use provider::PaymentGateway;
pub use providers::{FlutterwaveGateway, PaystackGateway};
pub use service::PaymentService;
pub use types::*;
