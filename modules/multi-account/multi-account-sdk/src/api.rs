//! Extension-point traits.
//!
//! The module owns resolution, caching and credential scoping. Everything that
//! talks to the payment provider is injected through these traits.

use async_trait::async_trait;

use crate::models::{AccountConfig, ResolvedIdentity};
use crate::request::ResolutionRequest;
use crate::secret::SecretString;
use crate::webhook::{WebhookEndpoint, WebhookPayload, WebhookReply};

/// Maps a unit of work to the account and environment it belongs to.
///
/// Implementations must be pure: no caching, no side effects, and identical
/// input always yields identical output. `None` means "unresolved"; callers
/// decide on the fallback.
pub trait AccountResolver: Send + Sync {
    fn resolve(&self, request: &ResolutionRequest<'_>) -> Option<ResolvedIdentity>;
}

/// Builds an API client bound to one account's credentials.
///
/// Only the client cache calls this.
pub trait ApiClientFactory: Send + Sync {
    type Client: Send + Sync + 'static;

    fn build(&self, config: &AccountConfig) -> Self::Client;
}

/// The "currently active credential" of an SDK surface that reads its key from
/// configuration instead of taking one per call.
///
/// One slot is created per request or operation; a slot shared by concurrent
/// units of work would let one tenant's key leak into another's calls.
pub trait CredentialSlot: Send + Sync {
    fn current(&self) -> Option<SecretString>;

    fn install(&self, credential: Option<SecretString>);
}

/// Signature verification and event dispatch of the payment SDK.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    /// Verify `payload` against `signing_secret` and dispatch the event.
    async fn dispatch(
        &self,
        signing_secret: &SecretString,
        payload: WebhookPayload,
    ) -> anyhow::Result<WebhookReply>;
}

/// Remote webhook-endpoint management, implemented by an account-bound client.
#[async_trait]
pub trait WebhookEndpointApi: Send + Sync {
    async fn create_webhook_endpoint(
        &self,
        url: &str,
        enabled_events: &[String],
    ) -> anyhow::Result<WebhookEndpoint>;
}
