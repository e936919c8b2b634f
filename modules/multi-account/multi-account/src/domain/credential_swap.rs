//! Scoped credential override for single-tenant SDK surfaces.
//!
//! Some SDK calls read their key from one configured slot instead of taking
//! it per call. [`CredentialSwapGuard`] installs an account's secret into such
//! a slot and puts the previous value back when it is dropped, on every exit
//! path: normal return, `?`, panic unwinding, or a cancelled future.
//!
//! Slots are per unit of work ([`ScopedCredentialSlot`]); concurrent requests
//! never swap the same slot.

use std::future::Future;
use std::sync::Arc;

use multi_account_sdk::{
    AccountConfig, AccountContext, AccountResolver, CredentialSlot, MultiAccountError,
    ResolutionRequest, ResolvedIdentity, SecretString,
};
use parking_lot::Mutex;

use crate::domain::ambient::AmbientContext;
use crate::domain::registry::AccountRegistry;

/// In-memory credential slot owned by a single request or operation.
#[derive(Default)]
pub struct ScopedCredentialSlot {
    active: Mutex<Option<SecretString>>,
}

impl ScopedCredentialSlot {
    #[must_use]
    pub fn new(initial: Option<SecretString>) -> Self {
        Self {
            active: Mutex::new(initial),
        }
    }
}

impl CredentialSlot for ScopedCredentialSlot {
    fn current(&self) -> Option<SecretString> {
        self.active.lock().clone()
    }

    fn install(&self, credential: Option<SecretString>) {
        *self.active.lock() = credential;
    }
}

/// Restores the previously active credential of a slot on drop.
#[must_use = "the credential is restored as soon as the guard is dropped"]
pub struct CredentialSwapGuard<'a> {
    slot: &'a dyn CredentialSlot,
    previous: Option<Option<SecretString>>,
    identity: ResolvedIdentity,
}

impl<'a> CredentialSwapGuard<'a> {
    /// Record the slot's current credential and install `config`'s secret.
    pub fn install(slot: &'a dyn CredentialSlot, config: &AccountConfig) -> Self {
        let previous = slot.current();
        slot.install(Some(config.secret().clone()));
        tracing::debug!(
            account_id = config.account_id(),
            environment = config.environment(),
            "installed account credential"
        );
        Self {
            slot,
            previous: Some(previous),
            identity: config.identity(),
        }
    }
}

impl Drop for CredentialSwapGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.slot.install(previous);
            tracing::debug!(
                account_id = %self.identity.account_id,
                environment = %self.identity.environment,
                "restored previous credential"
            );
        }
    }
}

/// Runs protected blocks of SDK calls under one account's credential, with
/// that account bound as the ambient context.
pub struct CredentialSwapper {
    registry: Arc<AccountRegistry>,
    resolver: Arc<dyn AccountResolver>,
}

impl CredentialSwapper {
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>, resolver: Arc<dyn AccountResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Identity `request` resolves to, without any fallback.
    #[must_use]
    pub fn resolve(&self, request: &ResolutionRequest<'_>) -> Option<ResolvedIdentity> {
        self.resolver.resolve(request)
    }

    /// Config for `identity`, or for the default account in the default
    /// environment when `None`.
    fn config_for(
        &self,
        identity: Option<&ResolvedIdentity>,
    ) -> Result<Arc<AccountConfig>, MultiAccountError> {
        match identity {
            Some(identity) => self.registry.get_identity(identity),
            None => self.registry.get_identity(&self.registry.default_identity()?),
        }
    }

    /// Run `body` with the account's credential installed in `slot`.
    ///
    /// Returns exactly what `body` returns; failures inside `body` are not
    /// touched.
    ///
    /// # Errors
    /// Resolution errors; `body` is not run and `slot` is untouched.
    #[tracing::instrument(level = "debug", skip(self, slot, body))]
    pub fn with_credential<R>(
        &self,
        slot: &dyn CredentialSlot,
        identity: Option<&ResolvedIdentity>,
        body: impl FnOnce(&AccountContext) -> R,
    ) -> Result<R, MultiAccountError> {
        let config = self.config_for(identity)?;
        let _guard = CredentialSwapGuard::install(slot, &config);
        let ctx = AccountContext::new(config);
        Ok(AmbientContext::sync_scope(ctx.clone(), || body(&ctx)))
    }

    /// Async counterpart of [`with_credential`](Self::with_credential).
    ///
    /// The guard lives for the whole future; dropping the future restores
    /// the slot.
    ///
    /// # Errors
    /// Resolution errors; `body` is not run and `slot` is untouched.
    #[tracing::instrument(level = "debug", skip(self, slot, body))]
    pub async fn with_credential_async<R, F, Fut>(
        &self,
        slot: &dyn CredentialSlot,
        identity: Option<&ResolvedIdentity>,
        body: F,
    ) -> Result<R, MultiAccountError>
    where
        F: FnOnce(AccountContext) -> Fut,
        Fut: Future<Output = R>,
    {
        let config = self.config_for(identity)?;
        let _guard = CredentialSwapGuard::install(slot, &config);
        let ctx = AccountContext::new(config);
        Ok(AmbientContext::scope(ctx.clone(), body(ctx)).await)
    }

    /// Resolve `request` and run `body` under that account's credential,
    /// falling back to the default account.
    ///
    /// # Errors
    /// See [`with_credential`](Self::with_credential).
    pub fn with_request_credential<R>(
        &self,
        slot: &dyn CredentialSlot,
        request: &ResolutionRequest<'_>,
        body: impl FnOnce(&AccountContext) -> R,
    ) -> Result<R, MultiAccountError> {
        let identity = self.resolve(request);
        self.with_credential(slot, identity.as_ref(), body)
    }
}
