//! Billing helpers for domain entities that carry their own account hint.

use std::future::Future;
use std::sync::Arc;

use multi_account_sdk::{
    AccountContext, AccountResolver, ApiClientFactory, AttributeSource, CredentialSlot,
    MultiAccountError, ResolutionRequest, ResolvedIdentity,
};

use crate::domain::client_cache::ClientCache;
use crate::domain::credential_swap::CredentialSwapper;
use crate::domain::registry::AccountRegistry;

/// Multi-account billing for any entity exposing attributes.
///
/// Every method resolves the entity first and falls back to the default
/// account in the default environment.
pub trait MultiBillable: AttributeSource + Sized {
    /// Account and environment this entity bills under.
    ///
    /// # Errors
    /// [`MultiAccountError::NoDefaultAccount`] when the entity carries no
    /// account and none is configured.
    fn billing_identity(
        &self,
        resolver: &dyn AccountResolver,
        registry: &AccountRegistry,
    ) -> Result<ResolvedIdentity, MultiAccountError> {
        match resolver.resolve(&ResolutionRequest::for_entity(self)) {
            Some(identity) => Ok(identity),
            None => registry.default_identity(),
        }
    }

    /// Cached API client of the entity's account.
    ///
    /// # Errors
    /// See [`ClientCache::for_entity`].
    fn api_client<F: ApiClientFactory>(
        &self,
        cache: &ClientCache<F>,
    ) -> Result<Arc<F::Client>, MultiAccountError> {
        cache.for_entity(self)
    }

    /// Run a single-tenant SDK call ("charge", "new subscription", ...) with
    /// the entity's credential installed in `slot`.
    ///
    /// # Errors
    /// Resolution errors only; whatever `body` returns is passed through.
    fn with_billing_credential<R>(
        &self,
        swapper: &CredentialSwapper,
        slot: &dyn CredentialSlot,
        body: impl FnOnce(&AccountContext) -> R,
    ) -> Result<R, MultiAccountError> {
        swapper.with_request_credential(slot, &ResolutionRequest::for_entity(self), body)
    }

    /// Async counterpart of [`with_billing_credential`](Self::with_billing_credential).
    fn with_billing_credential_async<R, F, Fut>(
        &self,
        swapper: &CredentialSwapper,
        slot: &dyn CredentialSlot,
        body: F,
    ) -> impl Future<Output = Result<R, MultiAccountError>>
    where
        F: FnOnce(AccountContext) -> Fut,
        Fut: Future<Output = R>,
    {
        let identity = swapper.resolve(&ResolutionRequest::for_entity(self));
        async move { swapper.with_credential_async(slot, identity.as_ref(), body).await }
    }
}

impl<T: AttributeSource> MultiBillable for T {}
