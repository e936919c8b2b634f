//! Webhook entry point for multi-account deliveries.
//!
//! The route carries `{account}` and optionally an environment segment. The
//! handler looks up that account's signing secret and hands the raw delivery
//! to the payment SDK's dispatcher, inside the account's ambient scope.

use std::sync::Arc;

use multi_account_sdk::{
    AccountContext, MultiAccountError, ResolutionRequest, WebhookDispatcher, WebhookPayload,
    WebhookReply,
};

use crate::config::WebhookSettings;
use crate::domain::ambient::AmbientContext;
use crate::domain::registry::AccountRegistry;

/// Route parameter holding the logical account id.
pub const ACCOUNT_ROUTE_PARAM: &str = "account";

pub struct WebhookHandler {
    registry: Arc<AccountRegistry>,
    dispatcher: Arc<dyn WebhookDispatcher>,
    settings: WebhookSettings,
}

impl WebhookHandler {
    #[must_use]
    pub fn new(registry: Arc<AccountRegistry>, dispatcher: Arc<dyn WebhookDispatcher>) -> Self {
        let settings = registry.config().webhook.clone();
        Self {
            registry,
            dispatcher,
            settings,
        }
    }

    /// Route template to mount the handler on, e.g. `stripe/{account}/webhook`.
    #[must_use]
    pub fn route_path(&self) -> &str {
        &self.settings.path
    }

    /// Verify and dispatch one delivery. Only the route parameters of
    /// `request` are read.
    ///
    /// # Errors
    /// - registry lookup errors for the routed account/environment
    /// - [`MultiAccountError::MissingWebhookSecret`] when no signing secret is configured
    /// - [`MultiAccountError::Upstream`] when the dispatcher fails
    #[tracing::instrument(skip(self, request, payload), fields(body_len = payload.body.len()))]
    pub async fn handle(
        &self,
        request: &ResolutionRequest<'_>,
        payload: WebhookPayload,
    ) -> Result<WebhookReply, MultiAccountError> {
        let account_id = request.route_param(ACCOUNT_ROUTE_PARAM).unwrap_or_default();
        let environment = request
            .route_param(&self.settings.environment_placeholder)
            .filter(|env| !env.is_empty());

        let config = self.registry.get(account_id, environment)?;
        let Some(secret) = config.webhook_secret().cloned() else {
            tracing::warn!(
                account_id = config.account_id(),
                environment = config.environment(),
                "webhook secret not configured"
            );
            return Err(MultiAccountError::missing_webhook_secret(
                config.account_id(),
                config.environment(),
            ));
        };

        let ctx = AccountContext::new(config);
        AmbientContext::scope(ctx, self.dispatcher.dispatch(&secret, payload))
            .await
            .map_err(MultiAccountError::upstream)
    }

    /// [`handle`](Self::handle) with errors rendered as a reply for the provider.
    pub async fn respond(
        &self,
        request: &ResolutionRequest<'_>,
        payload: WebhookPayload,
    ) -> WebhookReply {
        match self.handle(request, payload).await {
            Ok(reply) => reply,
            Err(err) => {
                if err.status_code() >= 500 {
                    tracing::error!(error = %err, code = err.code(), "webhook handling failed");
                }
                WebhookReply {
                    status: err.status_code(),
                    body: err.to_string(),
                }
            }
        }
    }
}
