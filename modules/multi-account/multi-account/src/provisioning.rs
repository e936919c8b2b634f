//! Webhook endpoint provisioning for one account.
//!
//! Operator-facing: builds the public webhook URL for an account and
//! environment, creates the endpoint through that account's API client and
//! prints the returned signing secret so it can be copied into config.
//!
//! ```text
//! webhook-sync us --env live
//! ```

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use multi_account_sdk::{
    ApiClientFactory, MultiAccountError, WebhookEndpoint, WebhookEndpointApi,
};

use crate::config::WebhookSettings;
use crate::domain::client_cache::ClientCache;
use crate::webhook::ACCOUNT_ROUTE_PARAM;

/// Create or sync a webhook endpoint for one logical account and environment.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "webhook-sync")]
#[command(about, long_about = None)]
pub struct WebhookSyncArgs {
    /// Logical account id as configured under `accounts`
    #[arg(value_name = "ACCOUNT")]
    pub account: String,

    /// Environment (e.g. test or live). Defaults to the configured default environment
    #[arg(long = "env")]
    pub env: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookSyncError {
    #[error("failed to resolve account configuration: {0}")]
    Resolution(#[from] MultiAccountError),

    #[error("api error while creating webhook endpoint: {0:#}")]
    Upstream(#[source] anyhow::Error),

    #[error("failed to write operator output: {0}")]
    Output(#[from] std::io::Error),
}

/// Result of a sync run, convertible to a process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Failure(String),
}

impl SyncOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<SyncOutcome> for ExitCode {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Success => ExitCode::SUCCESS,
            SyncOutcome::Failure(_) => ExitCode::FAILURE,
        }
    }
}

/// Public webhook URL for `account` in `environment`.
///
/// Replaces `{account}` and the environment placeholder in the path template,
/// trims trailing slashes off the base URL and joins with exactly one slash.
#[must_use]
pub fn build_webhook_url(settings: &WebhookSettings, account: &str, environment: &str) -> String {
    let env_placeholder = format!("{{{}}}", settings.environment_placeholder);
    let path = settings
        .path
        .replace(&format!("{{{ACCOUNT_ROUTE_PARAM}}}"), account)
        .replace(&env_placeholder, environment);

    format!(
        "{}/{}",
        settings.base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub struct WebhookSync<F: ApiClientFactory> {
    cache: Arc<ClientCache<F>>,
    settings: WebhookSettings,
}

impl<F> WebhookSync<F>
where
    F: ApiClientFactory,
    F::Client: WebhookEndpointApi,
{
    #[must_use]
    pub fn new(cache: Arc<ClientCache<F>>) -> Self {
        let settings = cache.registry().config().webhook.clone();
        Self { cache, settings }
    }

    /// Run the command, writing operator output to `out`.
    ///
    /// Never panics on API or config errors; they become [`SyncOutcome::Failure`].
    pub async fn run(&self, args: &WebhookSyncArgs, out: &mut impl Write) -> SyncOutcome {
        match self.sync(args, out).await {
            Ok(_) => SyncOutcome::Success,
            Err(err) => {
                let message = err.to_string();
                tracing::error!(
                    account_id = %args.account,
                    error = %message,
                    "webhook sync failed"
                );
                if writeln!(out, "error: {message}").is_err() {
                    tracing::warn!("failed to write webhook sync error to operator output");
                }
                SyncOutcome::Failure(message)
            }
        }
    }

    async fn sync(
        &self,
        args: &WebhookSyncArgs,
        out: &mut impl Write,
    ) -> Result<WebhookEndpoint, WebhookSyncError> {
        let registry = self.cache.registry();
        let environment = args
            .env
            .as_deref()
            .filter(|env| !env.is_empty())
            .unwrap_or_else(|| registry.default_environment())
            .to_owned();

        writeln!(out, "Account     : {}", args.account)?;
        writeln!(out, "Environment : {environment}")?;

        let client = self.cache.for_identity(&args.account, Some(&environment))?;
        let url = build_webhook_url(&self.settings, &args.account, &environment);
        writeln!(out, "Webhook URL : {url}")?;

        let endpoint = client
            .create_webhook_endpoint(&url, &self.settings.events)
            .await
            .map_err(WebhookSyncError::Upstream)?;

        tracing::info!(
            account_id = %args.account,
            environment = %environment,
            endpoint_id = %endpoint.id,
            "webhook endpoint created"
        );
        writeln!(out, "Endpoint ID : {}", endpoint.id)?;

        match endpoint.secret.as_ref().filter(|s| !s.is_empty()) {
            Some(secret) => {
                writeln!(out, "Signing secret (shown once):")?;
                writeln!(out, "  {}", secret.expose())?;
                writeln!(
                    out,
                    "Configure it under accounts.{}.{}.webhook_secret",
                    args.account, environment
                )?;
            }
            None => {
                writeln!(out, "No signing secret was returned for this endpoint.")?;
                writeln!(out, "Retrieve it from the provider dashboard and configure")?;
                writeln!(out, "accounts.{}.{environment}.webhook_secret", args.account)?;
            }
        }

        Ok(endpoint)
    }
}
