//! Provider registry.
//!
//! Gateways are built on first use from [`PaymentsConfig`] and cached, so
//! every caller shares one HTTP client per provider.

use crate::config::PaymentsConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentGateway;
use crate::providers::{FlutterwaveGateway, PaystackGateway};
use crate::types::PaymentProvider;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;
use tracing::debug;

static GLOBAL: OnceLock<Arc<PaymentFactory>> = OnceLock::new();

pub struct PaymentFactory {
    config: PaymentsConfig,
    gateways: RwLock<HashMap<PaymentProvider, Arc<dyn PaymentGateway>>>,
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> PaymentError {
    PaymentError::Api("payment factory lock poisoned".to_string())
}

impl PaymentFactory {
    pub fn new(config: PaymentsConfig) -> Self {
        Self {
            config,
            gateways: RwLock::new(HashMap::new()),
        }
    }

    /// Installs the process-wide factory. Returns the already-installed one
    /// if another caller got there first.
    pub fn install_global(config: PaymentsConfig) -> Arc<PaymentFactory> {
        GLOBAL
            .get_or_init(|| Arc::new(PaymentFactory::new(config)))
            .clone()
    }

    pub fn global() -> PaymentResult<Arc<PaymentFactory>> {
        GLOBAL
            .get()
            .cloned()
            .ok_or_else(|| PaymentError::Config("payment factory not installed".to_string()))
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.config
    }

    /// Returns the gateway for `provider`, building it on first use.
    pub fn get(&self, provider: PaymentProvider) -> PaymentResult<Arc<dyn PaymentGateway>> {
        if let Some(gateway) = self.gateways.read().map_err(poisoned)?.get(&provider) {
            return Ok(gateway.clone());
        }

        let mut gateways = self.gateways.write().map_err(poisoned)?;
        // Another thread may have built it while we waited for the write lock.
        if let Some(gateway) = gateways.get(&provider) {
            return Ok(gateway.clone());
        }
        let gateway = self.build(provider)?;
        debug!("Created {provider} gateway");
        gateways.insert(provider, gateway.clone());
        Ok(gateway)
    }

    fn build(&self, provider: PaymentProvider) -> PaymentResult<Arc<dyn PaymentGateway>> {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let prefix = self.config.reference_prefix.as_str();
        let gateway: Arc<dyn PaymentGateway> = match provider {
            PaymentProvider::Flutterwave => {
                let config = self
                    .config
                    .flutterwave
                    .clone()
                    .ok_or(PaymentError::ProviderNotConfigured(provider))?;
                Arc::new(FlutterwaveGateway::new(config, timeout, prefix)?)
            }
            PaymentProvider::Paystack => {
                let config = self
                    .config
                    .paystack
                    .clone()
                    .ok_or(PaymentError::ProviderNotConfigured(provider))?;
                Arc::new(PaystackGateway::new(config, timeout, prefix)?)
            }
        };
        Ok(gateway)
    }

    /// Installs a gateway, replacing any cached one for the same provider.
    pub fn register(&self, gateway: Arc<dyn PaymentGateway>) -> PaymentResult<()> {
        let provider = gateway.provider();
        self.gateways
            .write()
            .map_err(poisoned)?
            .insert(provider, gateway);
        debug!("Registered custom {provider} gateway");
        Ok(())
    }

    /// Providers that are configured or registered, in [`PaymentProvider::ALL`] order.
    pub fn available_providers(&self) -> Vec<PaymentProvider> {
        let registered = self
            .gateways
            .read()
            .map(|g| g.keys().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        PaymentProvider::ALL
            .into_iter()
            .filter(|p| self.config.is_configured(*p) || registered.contains(p))
            .collect()
    }

    pub fn is_available(&self, provider: PaymentProvider) -> bool {
        self.available_providers().contains(&provider)
    }

    pub fn default_provider(&self) -> PaymentProvider {
        self.config.default_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlutterwaveConfig, PaystackConfig};

    #[test]
    fn gateways_are_cached() {
        let config = PaymentsConfig {
            paystack: Some(PaystackConfig::new("sk_test")),
            ..PaymentsConfig::default()
        };
        let factory = PaymentFactory::new(config);
        let a = factory.get(PaymentProvider::Paystack).unwrap();
        let b = factory.get(PaymentProvider::Paystack).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn missing_credentials_are_reported() {
        let config = PaymentsConfig {
            flutterwave: Some(FlutterwaveConfig::new("FLWSECK_TEST")),
            ..PaymentsConfig::default()
        };
        let factory = PaymentFactory::new(config);
        assert!(matches!(
            factory.get(PaymentProvider::Paystack),
            Err(PaymentError::ProviderNotConfigured(PaymentProvider::Paystack))
        ));
        assert_eq!(factory.available_providers(), vec![PaymentProvider::Flutterwave]);
    }
}
