//! Domain models for the multi-account module.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::secret::SecretString;

/// Identifier of a logical account (a tenant of the payment API).
pub type AccountId = String;

/// Environment name partitioning credentials within an account (`test`, `live`).
pub type Environment = String;

/// Environment used when nothing else is configured.
pub const FALLBACK_ENVIRONMENT: &str = "test";

/// Validated credentials of one logical account in one environment.
///
/// Immutable once built; identity is `(account_id, environment)`.
/// `Debug` never prints the secret or the webhook secret.
#[derive(Clone, PartialEq)]
pub struct AccountConfig {
    account_id: AccountId,
    environment: Environment,
    secret: SecretString,
    publishable_key: Option<String>,
    webhook_secret: Option<SecretString>,
    currency: Option<String>,
    extra: Map<String, Value>,
}

impl AccountConfig {
    /// Create a config with only the required fields set.
    #[must_use]
    pub fn new(
        account_id: impl Into<AccountId>,
        environment: impl Into<Environment>,
        secret: SecretString,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            environment: environment.into(),
            secret,
            publishable_key: None,
            webhook_secret: None,
            currency: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_webhook_secret(mut self, secret: SecretString) -> Self {
        self.webhook_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub fn publishable_key(&self) -> Option<&str> {
        self.publishable_key.as_deref()
    }

    #[must_use]
    pub fn webhook_secret(&self) -> Option<&SecretString> {
        self.webhook_secret.as_ref()
    }

    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    /// Forward-compatible custom fields.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    #[must_use]
    pub fn identity(&self) -> ResolvedIdentity {
        ResolvedIdentity::new(self.account_id.clone(), self.environment.clone())
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("account_id", &self.account_id)
            .field("environment", &self.environment)
            .field("secret", &self.secret)
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &self.webhook_secret)
            .field("currency", &self.currency)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Output of resolution: which account and environment a unit of work belongs to.
///
/// Carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedIdentity {
    pub account_id: AccountId,
    pub environment: Environment,
}

impl ResolvedIdentity {
    #[must_use]
    pub fn new(account_id: impl Into<AccountId>, environment: impl Into<Environment>) -> Self {
        Self {
            account_id: account_id.into(),
            environment: environment.into(),
        }
    }
}

impl fmt::Display for ResolvedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account_id, self.environment)
    }
}

/// Request- or operation-scoped view of the account a unit of work runs as.
///
/// Cheap to clone; never persisted.
#[derive(Debug, Clone)]
pub struct AccountContext {
    config: Arc<AccountConfig>,
}

impl AccountContext {
    #[must_use]
    pub fn new(config: Arc<AccountConfig>) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        self.config.account_id()
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        self.config.environment()
    }

    #[must_use]
    pub fn config(&self) -> &Arc<AccountConfig> {
        &self.config
    }

    #[must_use]
    pub fn identity(&self) -> ResolvedIdentity {
        self.config.identity()
    }
}
