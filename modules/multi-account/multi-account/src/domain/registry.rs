//! Account registry: the single source of truth for per-account credentials.

use std::collections::HashMap;
use std::sync::Arc;

use multi_account_sdk::{AccountConfig, MultiAccountError, ResolvedIdentity};
use parking_lot::RwLock;

use crate::config::{EnvironmentSettings, MultiAccountConfig};

type ConfigKey = (String, String);

/// Validated, memoized view over the configured accounts.
///
/// Built once at startup and shared; the raw configuration is immutable.
/// Entries are validated lazily on first lookup so partially configured
/// accounts do not prevent the process from starting.
pub struct AccountRegistry {
    config: MultiAccountConfig,
    resolved: RwLock<HashMap<ConfigKey, Arc<AccountConfig>>>,
}

impl AccountRegistry {
    #[must_use]
    pub fn new(config: MultiAccountConfig) -> Self {
        Self {
            config,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Raw configuration this registry was built from.
    #[must_use]
    pub fn config(&self) -> &MultiAccountConfig {
        &self.config
    }

    /// Configured default environment, or `test` if unset.
    #[must_use]
    pub fn default_environment(&self) -> &str {
        self.config.default_environment()
    }

    /// All configured account ids, in configured order.
    #[must_use]
    pub fn account_ids(&self) -> Vec<&str> {
        self.config.accounts.keys().map(String::as_str).collect()
    }

    /// The explicitly configured default account when set and non-empty,
    /// otherwise the first configured account.
    #[must_use]
    pub fn default_account_id(&self) -> Option<&str> {
        match self.config.default_account.as_deref() {
            Some(id) if !id.is_empty() => Some(id),
            _ => self.config.accounts.keys().next().map(String::as_str),
        }
    }

    /// Default account in the default environment.
    ///
    /// # Errors
    /// [`MultiAccountError::NoDefaultAccount`] when no account exists.
    pub fn default_identity(&self) -> Result<ResolvedIdentity, MultiAccountError> {
        let account_id = self
            .default_account_id()
            .ok_or(MultiAccountError::NoDefaultAccount)?;
        Ok(ResolvedIdentity::new(account_id, self.default_environment()))
    }

    /// Environments configured for `account_id`, in configured order.
    #[must_use]
    pub fn environments_for(&self, account_id: &str) -> Vec<&str> {
        self.config
            .accounts
            .get(account_id)
            .map(|account| account.environments.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether the pair is configured, without validating its contents.
    #[must_use]
    pub fn contains(&self, account_id: &str, environment: &str) -> bool {
        self.config
            .accounts
            .get(account_id)
            .is_some_and(|account| account.environments.contains_key(environment))
    }

    /// Display name of an account, if configured.
    #[must_use]
    pub fn account_name(&self, account_id: &str) -> Option<&str> {
        self.config.accounts.get(account_id)?.name.as_deref()
    }

    /// Look up the config for `account_id` in `environment` (default
    /// environment when `None`).
    ///
    /// Repeated calls with the same key return the same `Arc`.
    ///
    /// # Errors
    /// - [`MultiAccountError::UnknownAccount`] if the account is not configured
    /// - [`MultiAccountError::UnknownEnvironment`] if the account lacks the environment
    /// - [`MultiAccountError::MissingSecret`] if the entry has no secret
    pub fn get(
        &self,
        account_id: &str,
        environment: Option<&str>,
    ) -> Result<Arc<AccountConfig>, MultiAccountError> {
        let environment = environment.unwrap_or_else(|| self.default_environment());
        let key = (account_id.to_owned(), environment.to_owned());

        if let Some(config) = self.resolved.read().get(&key) {
            return Ok(Arc::clone(config));
        }

        let built = Arc::new(self.build(account_id, environment)?);

        let mut w = self.resolved.write();
        let entry = w.entry(key).or_insert(built);
        Ok(Arc::clone(entry))
    }

    /// Same as [`get`](Self::get) for an already resolved identity.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub fn get_identity(
        &self,
        identity: &ResolvedIdentity,
    ) -> Result<Arc<AccountConfig>, MultiAccountError> {
        self.get(&identity.account_id, Some(&identity.environment))
    }

    fn build(
        &self,
        account_id: &str,
        environment: &str,
    ) -> Result<AccountConfig, MultiAccountError> {
        let account = self
            .config
            .accounts
            .get(account_id)
            .ok_or_else(|| MultiAccountError::unknown_account(account_id))?;

        let settings = account
            .environments
            .get(environment)
            .ok_or_else(|| MultiAccountError::unknown_environment(account_id, environment))?;

        tracing::debug!(account_id, environment, "validated account configuration");
        to_account_config(account_id, environment, settings)
    }
}

fn to_account_config(
    account_id: &str,
    environment: &str,
    settings: &EnvironmentSettings,
) -> Result<AccountConfig, MultiAccountError> {
    let secret = settings
        .secret
        .as_ref()
        .filter(|s| !s.is_empty())
        .cloned()
        .ok_or_else(|| MultiAccountError::missing_secret(account_id, environment))?;

    let mut config = AccountConfig::new(account_id, environment, secret)
        .with_extra(settings.extra.clone());
    if let Some(key) = &settings.publishable_key {
        config = config.with_publishable_key(key.clone());
    }
    if let Some(webhook_secret) = settings.webhook_secret.as_ref().filter(|s| !s.is_empty()) {
        config = config.with_webhook_secret(webhook_secret.clone());
    }
    if let Some(currency) = &settings.currency {
        config = config.with_currency(currency.clone());
    }
    Ok(config)
}
