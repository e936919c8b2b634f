//! Account resolution: an ordered chain of strategies with fallback.
//!
//! Built-in order, which callers can rely on:
//!
//! 1. entity attributes
//! 2. route parameters
//! 3. query parameters, falling back to headers
//! 4. configured defaults
//!
//! Each strategy either yields an identity or defers to the next. A missing
//! or empty account halts a strategy; a missing or empty environment never
//! does and is replaced by the default environment. The first strategy that
//! yields an account wins, with no merging across strategies.

use std::fmt;
use std::sync::Arc;

use multi_account_sdk::{AccountResolver, ResolutionRequest, ResolvedIdentity};

use crate::config::ResolverOptions;
use crate::domain::registry::AccountRegistry;

/// Which strategy produced a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    Entity,
    Route,
    Signal,
    Default,
    Custom(&'static str),
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => f.write_str("entity"),
            Self::Route => f.write_str("route"),
            Self::Signal => f.write_str("signal"),
            Self::Default => f.write_str("default"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// A resolved identity together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: ResolvedIdentity,
    pub source: ResolutionSource,
}

/// One step of the resolution chain.
pub trait ResolutionStrategy: Send + Sync {
    fn source(&self) -> ResolutionSource;

    /// `None` defers to the next strategy.
    fn resolve(
        &self,
        request: &ResolutionRequest<'_>,
        default_environment: &str,
    ) -> Option<ResolvedIdentity>;
}

/// Shared success rule: a non-empty account succeeds, the environment falls
/// back to the default when absent or empty.
fn identity_from(
    account: Option<&str>,
    environment: Option<&str>,
    default_environment: &str,
) -> Option<ResolvedIdentity> {
    let account = account.filter(|a| !a.is_empty())?;
    let environment = environment
        .filter(|e| !e.is_empty())
        .unwrap_or(default_environment);
    Some(ResolvedIdentity::new(account, environment))
}

/// Reads account and environment from attributes of a domain entity.
#[derive(Debug, Clone)]
pub struct EntityStrategy {
    account_field: String,
    environment_field: String,
}

impl EntityStrategy {
    #[must_use]
    pub fn new(account_field: impl Into<String>, environment_field: impl Into<String>) -> Self {
        Self {
            account_field: account_field.into(),
            environment_field: environment_field.into(),
        }
    }
}

impl ResolutionStrategy for EntityStrategy {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Entity
    }

    fn resolve(
        &self,
        request: &ResolutionRequest<'_>,
        default_environment: &str,
    ) -> Option<ResolvedIdentity> {
        let entity = request.entity()?;
        let account = entity.attribute(&self.account_field);
        let environment = entity.attribute(&self.environment_field);
        identity_from(account.as_deref(), environment.as_deref(), default_environment)
    }
}

/// Reads account and environment from route parameters.
#[derive(Debug, Clone)]
pub struct RouteStrategy {
    account_key: String,
    environment_key: String,
}

impl RouteStrategy {
    #[must_use]
    pub fn new(account_key: impl Into<String>, environment_key: impl Into<String>) -> Self {
        Self {
            account_key: account_key.into(),
            environment_key: environment_key.into(),
        }
    }
}

impl ResolutionStrategy for RouteStrategy {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Route
    }

    fn resolve(
        &self,
        request: &ResolutionRequest<'_>,
        default_environment: &str,
    ) -> Option<ResolvedIdentity> {
        identity_from(
            request.route_param(&self.account_key),
            request.route_param(&self.environment_key),
            default_environment,
        )
    }
}

/// Reads account and environment from query parameters, falling back to
/// headers when a parameter is absent.
#[derive(Debug, Clone)]
pub struct SignalStrategy {
    account_param: String,
    environment_param: String,
    account_header: String,
    environment_header: String,
}

impl SignalStrategy {
    #[must_use]
    pub fn new(
        account_param: impl Into<String>,
        environment_param: impl Into<String>,
        account_header: impl Into<String>,
        environment_header: impl Into<String>,
    ) -> Self {
        Self {
            account_param: account_param.into(),
            environment_param: environment_param.into(),
            account_header: account_header.into(),
            environment_header: environment_header.into(),
        }
    }
}

impl ResolutionStrategy for SignalStrategy {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Signal
    }

    fn resolve(
        &self,
        request: &ResolutionRequest<'_>,
        default_environment: &str,
    ) -> Option<ResolvedIdentity> {
        identity_from(
            request.query_or_header(&self.account_param, &self.account_header),
            request.query_or_header(&self.environment_param, &self.environment_header),
            default_environment,
        )
    }
}

/// Last resort: the first explicitly listed default account, else the
/// registry's default account, always in the default environment.
pub struct DefaultStrategy {
    registry: Arc<AccountRegistry>,
    default_accounts: Vec<String>,
}

impl DefaultStrategy {
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>, default_accounts: Vec<String>) -> Self {
        Self {
            registry,
            default_accounts,
        }
    }

    fn default_account(&self) -> Option<&str> {
        // An explicit list always wins, even when its first entry is blank.
        match self.default_accounts.first() {
            Some(first) => Some(first.as_str()).filter(|a| !a.is_empty()),
            None => self.registry.default_account_id(),
        }
    }
}

impl ResolutionStrategy for DefaultStrategy {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Default
    }

    fn resolve(
        &self,
        _request: &ResolutionRequest<'_>,
        default_environment: &str,
    ) -> Option<ResolvedIdentity> {
        identity_from(self.default_account(), None, default_environment)
    }
}

/// The built-in resolver: runs its strategies in order and stops at the
/// first one that yields an account.
pub struct ChainResolver {
    registry: Arc<AccountRegistry>,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl ChainResolver {
    /// Standard four-step chain configured from the registry's resolver options.
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>) -> Self {
        let options = registry.config().resolver.clone();
        Self::builder(registry).with_options(&options).build()
    }

    #[must_use]
    pub fn builder(registry: Arc<AccountRegistry>) -> ChainResolverBuilder {
        ChainResolverBuilder {
            registry,
            options: ResolverOptions::default(),
            custom: Vec::new(),
        }
    }

    /// Resolve and report which strategy won.
    #[must_use]
    pub fn resolve_traced(&self, request: &ResolutionRequest<'_>) -> Option<Resolution> {
        let default_environment = self.registry.default_environment();
        let resolution = self.strategies.iter().find_map(|strategy| {
            strategy
                .resolve(request, default_environment)
                .map(|identity| Resolution {
                    identity,
                    source: strategy.source(),
                })
        });

        match &resolution {
            Some(r) => tracing::trace!(
                account_id = %r.identity.account_id,
                environment = %r.identity.environment,
                strategy = %r.source,
                "account resolved"
            ),
            None => tracing::trace!("no account could be resolved"),
        }
        resolution
    }

    /// Strategy names in evaluation order.
    #[must_use]
    pub fn strategy_order(&self) -> Vec<ResolutionSource> {
        self.strategies.iter().map(|s| s.source()).collect()
    }
}

impl AccountResolver for ChainResolver {
    fn resolve(&self, request: &ResolutionRequest<'_>) -> Option<ResolvedIdentity> {
        self.resolve_traced(request).map(|r| r.identity)
    }
}

pub struct ChainResolverBuilder {
    registry: Arc<AccountRegistry>,
    options: ResolverOptions,
    custom: Vec<Box<dyn ResolutionStrategy>>,
}

impl ChainResolverBuilder {
    #[must_use]
    pub fn with_options(mut self, options: &ResolverOptions) -> Self {
        self.options = options.clone();
        self
    }

    /// Add a caller-supplied strategy. Custom strategies run after the
    /// built-in signal strategy and before the default fallback, in the
    /// order they were added.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl ResolutionStrategy + 'static) -> Self {
        self.custom.push(Box::new(strategy));
        self
    }

    #[must_use]
    pub fn build(self) -> ChainResolver {
        let o = self.options;
        let mut strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(EntityStrategy::new(
                o.entity_account_field,
                o.entity_environment_field,
            )),
            Box::new(RouteStrategy::new(
                o.account_route_key,
                o.environment_route_key,
            )),
            Box::new(SignalStrategy::new(
                o.account_param,
                o.environment_param,
                o.account_header,
                o.environment_header,
            )),
        ];
        strategies.extend(self.custom);
        strategies.push(Box::new(DefaultStrategy::new(
            Arc::clone(&self.registry),
            o.default_accounts,
        )));

        ChainResolver {
            registry: self.registry,
            strategies,
        }
    }
}
