//! Configuration for the multi-account module.
//!
//! ```yaml
//! multi_account:
//!   default_environment: test
//!   default_account: us
//!   accounts:
//!     us:
//!       name: US Main Account
//!       test:
//!         secret: sk_test_us
//!         webhook_secret: whsec_us
//!         currency: usd
//!       live:
//!         secret: sk_live_us
//!   webhook:
//!     path: "stripe/{account}/{environment}/webhook"
//!     base_url: "https://shop.example.com"
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use indexmap::IndexMap;
use multi_account_sdk::{FALLBACK_ENVIRONMENT, SecretString, scalar};
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};

/// Key of the module section inside the application config.
pub const CONFIG_SECTION: &str = "multi_account";

/// Prefix for environment variable overrides (`MULTI_ACCOUNT_DEFAULT_ACCOUNT=eu`).
pub const ENV_PREFIX: &str = "MULTI_ACCOUNT_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid multi-account configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {message}", path.display())]
    Yaml { path: PathBuf, message: String },

    /// The provider does not keep key order, so "first configured account"
    /// is undefined.
    #[error(
        "default_account must be set: {count} accounts are configured and their order is unknown"
    )]
    AmbiguousDefaultAccount { count: usize },
}

/// Module configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultiAccountConfig {
    /// Environment used when none is resolved. Falls back to `test`.
    #[serde(deserialize_with = "scalar::option_string")]
    pub default_environment: Option<String>,

    /// Supported environment names. Informational; lookups only check
    /// what each account actually configures.
    pub environments: Vec<String>,

    /// Account used when nothing else resolves. Falls back to the first
    /// configured account.
    #[serde(deserialize_with = "scalar::option_string")]
    pub default_account: Option<String>,

    /// Logical accounts in configured order.
    pub accounts: IndexMap<String, AccountSettings>,

    pub resolver: ResolverOptions,

    pub webhook: WebhookSettings,

    pub client_cache: ClientCacheSettings,
}

impl Default for MultiAccountConfig {
    fn default() -> Self {
        Self {
            default_environment: None,
            environments: vec!["test".to_owned(), "live".to_owned()],
            default_account: None,
            accounts: IndexMap::new(),
            resolver: ResolverOptions::default(),
            webhook: WebhookSettings::default(),
            client_cache: ClientCacheSettings::default(),
        }
    }
}

impl MultiAccountConfig {
    /// Layered provider: YAML file, then `MULTI_ACCOUNT_*` environment variables.
    ///
    /// Nested keys use a double underscore:
    /// `MULTI_ACCOUNT_ACCOUNTS__US__LIVE__SECRET`.
    #[must_use]
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .split("__")
                    .map(|key| format!("{CONFIG_SECTION}.{}", key.as_str()).into()),
            )
    }

    /// Extract the `multi_account` section. A missing section yields defaults.
    ///
    /// Figment providers do not keep map key order, so with more than one
    /// account `default_account` must be set explicitly. Use
    /// [`load`](Self::load) to keep the order of a YAML file.
    ///
    /// # Errors
    /// - [`ConfigError::Invalid`] if the section does not match the expected shape
    /// - [`ConfigError::AmbiguousDefaultAccount`] if several accounts are
    ///   configured without `default_account`
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config = Self::extract(figment)?;
        config.check_default_account(0)?;
        Ok(config)
    }

    /// Load from a YAML file with environment overrides.
    ///
    /// Accounts and their environments keep the order of the file. Accounts
    /// added only through environment variables come after them.
    ///
    /// # Errors
    /// - [`ConfigError::Invalid`] on malformed input
    /// - [`ConfigError::Read`] / [`ConfigError::Yaml`] if the file cannot be
    ///   read back for its key order
    /// - [`ConfigError::AmbiguousDefaultAccount`] if the first account cannot
    ///   be determined and `default_account` is not set
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::extract(&Self::figment(path))?;
        let order = DocumentOrder::read(path)?;
        let ordered = config.apply_order(&order);
        config.check_default_account(ordered)?;
        Ok(config)
    }

    fn extract(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            return Ok(Self::default());
        }
        figment
            .extract_inner(CONFIG_SECTION)
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Reorder accounts and environments to match `order`. Returns how many
    /// accounts have a known position.
    fn apply_order(&mut self, order: &AccountOrder) -> usize {
        self.accounts
            .sort_by(|a, _, b, _| position(Some(order), a).cmp(&position(Some(order), b)));
        for (account_id, account) in &mut self.accounts {
            let keys = order.get(account_id).and_then(Option::as_ref);
            account
                .environments
                .sort_by(|a, _, b, _| position(keys, a).cmp(&position(keys, b)));
        }

        self.accounts
            .keys()
            .filter(|id| order.contains_key(id.as_str()))
            .count()
    }

    fn check_default_account(&self, ordered: usize) -> Result<(), ConfigError> {
        let explicit = self
            .default_account
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        if explicit || self.accounts.len() <= 1 || ordered > 0 {
            return Ok(());
        }
        Err(ConfigError::AmbiguousDefaultAccount {
            count: self.accounts.len(),
        })
    }

    /// Configured default environment, or `test` when unset or blank.
    #[must_use]
    pub fn default_environment(&self) -> &str {
        match self.default_environment.as_deref() {
            Some(env) if !env.is_empty() => env,
            _ => FALLBACK_ENVIRONMENT,
        }
    }
}

/// One logical account: an optional display name plus one entry per environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountSettings {
    #[serde(default, deserialize_with = "scalar::option_string")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub environments: IndexMap<String, EnvironmentSettings>,
}

/// Raw credentials of one account in one environment.
///
/// Nothing is validated here; the registry checks required fields on lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentSettings {
    pub secret: Option<SecretString>,
    #[serde(deserialize_with = "scalar::option_string")]
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<SecretString>,
    #[serde(deserialize_with = "scalar::option_string")]
    pub currency: Option<String>,
    pub extra: Map<String, Value>,
}

/// Names of the signals the built-in resolver reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverOptions {
    pub entity_account_field: String,
    pub entity_environment_field: String,
    pub account_route_key: String,
    pub environment_route_key: String,
    pub account_param: String,
    pub environment_param: String,
    pub account_header: String,
    pub environment_header: String,

    /// Explicit fallback accounts; only the first entry is used.
    pub default_accounts: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            entity_account_field: "stripe_account_id".to_owned(),
            entity_environment_field: "stripe_env".to_owned(),
            account_route_key: "stripe_account".to_owned(),
            environment_route_key: "stripe_env".to_owned(),
            account_param: "stripe_account".to_owned(),
            environment_param: "stripe_env".to_owned(),
            account_header: "X-Stripe-Account".to_owned(),
            environment_header: "X-Stripe-Env".to_owned(),
            default_accounts: Vec::new(),
        }
    }
}

/// Webhook route and provisioning settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookSettings {
    /// Route template; must contain `{account}`.
    pub path: String,

    /// Placeholder name of the optional environment route segment.
    pub environment_placeholder: String,

    /// Public base URL the provider will call.
    pub base_url: String,

    /// Events the provisioned endpoint subscribes to.
    pub events: Vec<String>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            path: "stripe/{account}/webhook".to_owned(),
            environment_placeholder: "environment".to_owned(),
            base_url: "http://localhost".to_owned(),
            events: vec!["*".to_owned()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientCacheSettings {
    /// Upper bound on cached clients. `None` keeps one client per configured
    /// account/environment pair for the life of the process.
    pub max_entries: Option<usize>,
}

/// Account id -> environment keys (plus `name`), in document order.
type AccountOrder = IndexMap<String, Option<IndexMap<String, IgnoredAny>>>;

/// Index of `key` in `keys`; unknown keys sort last and keep their
/// relative order.
fn position<V>(keys: Option<&IndexMap<String, V>>, key: &str) -> usize {
    keys.and_then(|keys| keys.get_index_of(key)).unwrap_or(usize::MAX)
}

/// Key order of the `multi_account.accounts` mapping in a YAML file.
#[derive(Deserialize)]
struct DocumentOrder {
    #[serde(default)]
    multi_account: Option<SectionOrder>,
}

#[derive(Deserialize)]
struct SectionOrder {
    #[serde(default)]
    accounts: Option<AccountOrder>,
}

impl DocumentOrder {
    /// A missing or empty file has no order, matching `Yaml::file`.
    fn read(path: &Path) -> Result<AccountOrder, ConfigError> {
        if !path.exists() {
            return Ok(AccountOrder::new());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(AccountOrder::new());
        }
        let document: Self = serde_saphyr::from_str(&text).map_err(|e| ConfigError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(document
            .multi_account
            .and_then(|section| section.accounts)
            .unwrap_or_default())
    }
}
