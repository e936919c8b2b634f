#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for multi-account integration tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use multi_account::{AccountRegistry, ChainResolver, ClientCache, MultiAccountConfig};
use multi_account_sdk::{
    AccountConfig, ApiClientFactory, SecretString, WebhookEndpoint, WebhookEndpointApi,
};
use serde_json::{Value, json};

/// Two accounts, both environments for `us`, test only for `eu`.
pub fn sample_config() -> Value {
    json!({
        "default_environment": "test",
        "default_account": "us",
        "accounts": {
            "us": {
                "name": "US Main Account",
                "test": {
                    "secret": "sk_test_us",
                    "webhook_secret": "whsec_test_us",
                    "currency": "usd"
                },
                "live": {
                    "secret": "sk_live_us",
                    "webhook_secret": "whsec_live_us",
                    "currency": "usd"
                }
            },
            "eu": {
                "test": { "secret": "sk_test_eu", "currency": "eur" }
            },
            "broken": {
                "test": { "secret": "sk_test_broken", "extra": { "fail_webhooks": true } }
            }
        },
        "webhook": {
            "path": "stripe/{account}/{environment}/webhook",
            "base_url": "https://shop.example.com/"
        }
    })
}

pub fn config_from(value: Value) -> MultiAccountConfig {
    serde_json::from_value(value).unwrap()
}

pub fn registry_from(value: Value) -> Arc<AccountRegistry> {
    Arc::new(AccountRegistry::new(config_from(value)))
}

pub fn registry() -> Arc<AccountRegistry> {
    registry_from(sample_config())
}

pub fn resolver(registry: &Arc<AccountRegistry>) -> Arc<ChainResolver> {
    Arc::new(ChainResolver::new(Arc::clone(registry)))
}

pub fn client_cache(registry: &Arc<AccountRegistry>) -> Arc<ClientCache<FakeStripeFactory>> {
    Arc::new(ClientCache::new(
        Arc::clone(registry),
        resolver(registry),
        FakeStripeFactory::default(),
    ))
}

/// API client bound to one account's key.
pub struct FakeStripeClient {
    pub api_key: String,
    pub account_id: String,
    pub environment: String,
    fail_webhooks: bool,
}

#[async_trait]
impl WebhookEndpointApi for FakeStripeClient {
    async fn create_webhook_endpoint(
        &self,
        url: &str,
        enabled_events: &[String],
    ) -> anyhow::Result<WebhookEndpoint> {
        if self.fail_webhooks {
            anyhow::bail!("invalid api key provided");
        }
        assert!(url.contains(&format!("/{}/", self.account_id)));
        assert_eq!(enabled_events, ["*".to_owned()]);
        Ok(WebhookEndpoint {
            id: format!("we_{}_{}", self.account_id, self.environment),
            secret: Some(SecretString::new(format!("whsec_new_{}", self.account_id))),
        })
    }
}

#[derive(Default)]
pub struct FakeStripeFactory {
    pub built: Arc<AtomicUsize>,
}

impl FakeStripeFactory {
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

impl ApiClientFactory for FakeStripeFactory {
    type Client = FakeStripeClient;

    fn build(&self, config: &AccountConfig) -> FakeStripeClient {
        self.built.fetch_add(1, Ordering::SeqCst);
        FakeStripeClient {
            api_key: config.secret().expose().to_owned(),
            account_id: config.account_id().to_owned(),
            environment: config.environment().to_owned(),
            fail_webhooks: config
                .extra()
                .get("fail_webhooks")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}
