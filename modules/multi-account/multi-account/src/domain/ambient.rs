//! Ambient account context carried by the current task.
//!
//! Each request or operation opens its own scope; nothing is stored in
//! process-global state, so concurrent tasks never observe each other's
//! account. Reads never trigger resolution.

use std::future::Future;
use std::sync::Arc;

use multi_account_sdk::{
    AccountContext, AccountResolver, MultiAccountError, ResolutionRequest,
};

use crate::domain::registry::AccountRegistry;

tokio::task_local! {
    static CURRENT_ACCOUNT: AccountContext;
}

/// Accessors for the task-scoped account context.
pub struct AmbientContext;

impl AmbientContext {
    /// Run `fut` with `ctx` as the ambient account. Nested scopes shadow the
    /// outer one until they end.
    pub async fn scope<F>(ctx: AccountContext, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_ACCOUNT.scope(ctx, fut).await
    }

    /// Blocking counterpart of [`scope`](Self::scope).
    pub fn sync_scope<R>(ctx: AccountContext, f: impl FnOnce() -> R) -> R {
        CURRENT_ACCOUNT.sync_scope(ctx, f)
    }

    #[must_use]
    pub fn current() -> Option<AccountContext> {
        CURRENT_ACCOUNT.try_with(Clone::clone).ok()
    }

    /// # Errors
    /// [`MultiAccountError::NoAmbientContext`] outside of a scope.
    pub fn require() -> Result<AccountContext, MultiAccountError> {
        Self::current().ok_or(MultiAccountError::NoAmbientContext)
    }

    #[must_use]
    pub fn is_set() -> bool {
        CURRENT_ACCOUNT.try_with(|_| ()).is_ok()
    }
}

/// Entry-point binder: resolves the account of an incoming request and runs
/// the downstream work inside its ambient scope.
pub struct RequestContextBinder {
    registry: Arc<AccountRegistry>,
    resolver: Arc<dyn AccountResolver>,
}

impl RequestContextBinder {
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>, resolver: Arc<dyn AccountResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Context for `request`, or `None` when nothing resolves.
    ///
    /// # Errors
    /// Registry lookup errors for a resolved identity.
    pub fn context_for(
        &self,
        request: &ResolutionRequest<'_>,
    ) -> Result<Option<AccountContext>, MultiAccountError> {
        let Some(identity) = self.resolver.resolve(request) else {
            return Ok(None);
        };
        let config = self.registry.get_identity(&identity)?;
        Ok(Some(AccountContext::new(config)))
    }

    /// Run `next` inside the scope of the account `request` resolves to.
    ///
    /// Unresolvable requests run without a scope; downstream code applies
    /// its own fallback.
    ///
    /// # Errors
    /// Registry lookup errors; `next` is not run in that case.
    pub async fn bind<F>(
        &self,
        request: &ResolutionRequest<'_>,
        next: F,
    ) -> Result<F::Output, MultiAccountError>
    where
        F: Future,
    {
        match self.context_for(request)? {
            Some(ctx) => {
                tracing::debug!(
                    account_id = ctx.account_id(),
                    environment = ctx.environment(),
                    "bound ambient account context"
                );
                Ok(AmbientContext::scope(ctx, next).await)
            }
            None => Ok(next.await),
        }
    }
}
