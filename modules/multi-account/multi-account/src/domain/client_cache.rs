//! Process-wide cache of API clients, one per account/environment pair.
//!
//! This is the only place that calls [`ApiClientFactory::build`]. Handles are
//! `Arc`s: a handle obtained once stays valid even if the entry is later
//! evicted or the cache is cleared.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use multi_account_sdk::{
    AccountConfig, AccountResolver, ApiClientFactory, AttributeSource, MultiAccountError,
    ResolutionRequest, ResolvedIdentity,
};
use parking_lot::RwLock;

use crate::domain::ambient::AmbientContext;
use crate::domain::registry::AccountRegistry;

struct CacheState<C> {
    clients: HashMap<ResolvedIdentity, Arc<C>>,
    // Insertion order, used for eviction when a bound is configured.
    order: VecDeque<ResolvedIdentity>,
}

impl<C> CacheState<C> {
    fn new() -> Self {
        Self {
            clients: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

pub struct ClientCache<F: ApiClientFactory> {
    registry: Arc<AccountRegistry>,
    resolver: Arc<dyn AccountResolver>,
    factory: F,
    max_entries: Option<usize>,
    state: RwLock<CacheState<F::Client>>,
}

impl<F: ApiClientFactory> ClientCache<F> {
    /// The bound is taken from `client_cache.max_entries` of the registry config.
    #[must_use]
    pub fn new(
        registry: Arc<AccountRegistry>,
        resolver: Arc<dyn AccountResolver>,
        factory: F,
    ) -> Self {
        let max_entries = registry.config().client_cache.max_entries;
        Self {
            registry,
            resolver,
            factory,
            max_entries,
            state: RwLock::new(CacheState::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    /// Client for `account_id` in `environment` (default environment when `None`).
    ///
    /// # Errors
    /// Registry lookup errors: unknown account, unknown environment, missing secret.
    pub fn for_identity(
        &self,
        account_id: &str,
        environment: Option<&str>,
    ) -> Result<Arc<F::Client>, MultiAccountError> {
        let config = self.registry.get(account_id, environment)?;
        Ok(self.for_config(&config))
    }

    /// Resolve `request`, falling back to the default account in the default
    /// environment, and return its client.
    ///
    /// # Errors
    /// [`MultiAccountError::NoDefaultAccount`] when nothing resolves and no
    /// account exists, otherwise registry lookup errors.
    pub fn for_request(
        &self,
        request: &ResolutionRequest<'_>,
    ) -> Result<Arc<F::Client>, MultiAccountError> {
        let identity = match self.resolver.resolve(request) {
            Some(identity) => identity,
            None => self.registry.default_identity()?,
        };
        self.for_identity(&identity.account_id, Some(&identity.environment))
    }

    /// [`for_request`](Self::for_request) with only a domain entity.
    ///
    /// # Errors
    /// See [`for_request`](Self::for_request).
    pub fn for_entity(
        &self,
        entity: &dyn AttributeSource,
    ) -> Result<Arc<F::Client>, MultiAccountError> {
        self.for_request(&ResolutionRequest::for_entity(entity))
    }

    /// Client for the account bound to the current ambient scope.
    ///
    /// # Errors
    /// [`MultiAccountError::NoAmbientContext`] outside of a scope.
    pub fn for_ambient(&self) -> Result<Arc<F::Client>, MultiAccountError> {
        let ctx = AmbientContext::require()?;
        Ok(self.for_config(ctx.config()))
    }

    /// Client for an already validated config, bypassing the registry.
    #[must_use]
    pub fn for_config(&self, config: &AccountConfig) -> Arc<F::Client> {
        let key = config.identity();

        if let Some(client) = self.state.read().clients.get(&key) {
            return Arc::clone(client);
        }

        // Built without holding the lock: the factory may call back into the
        // cache. Racing callers may each build; only the first insert is kept.
        tracing::debug!(
            account_id = %key.account_id,
            environment = %key.environment,
            "building api client"
        );
        let built = Arc::new(self.factory.build(config));

        let mut state = self.state.write();
        if let Some(client) = state.clients.get(&key) {
            return Arc::clone(client);
        }

        if let Some(max) = self.max_entries {
            while state.clients.len() >= max.max(1) {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.clients.remove(&oldest);
                tracing::debug!(
                    account_id = %oldest.account_id,
                    environment = %oldest.environment,
                    "evicted cached api client"
                );
            }
        }

        state.order.push_back(key.clone());
        state.clients.insert(key, Arc::clone(&built));
        built
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().clients.is_empty()
    }

    /// Drop every cached client. Outstanding handles remain usable.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.clients.clear();
        state.order.clear();
    }
}
