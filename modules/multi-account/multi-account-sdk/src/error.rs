//! Error types for the multi-account module.

use thiserror::Error;

/// Errors surfaced by registry lookups, resolution and credential scoping.
///
/// None of these are recovered locally: an unknown account or environment is
/// never replaced by some other tenant's credentials.
#[derive(Debug, Error)]
pub enum MultiAccountError {
    /// The requested logical account is not configured.
    #[error("account [{account_id}] is not configured")]
    UnknownAccount { account_id: String },

    /// The account exists but the environment is not configured for it.
    #[error("environment [{environment}] for account [{account_id}] is not configured")]
    UnknownEnvironment {
        account_id: String,
        environment: String,
    },

    /// A fallback was needed but no default account exists anywhere.
    #[error("no default account is configured")]
    NoDefaultAccount,

    /// The environment entry exists but carries no secret key.
    #[error("secret for account [{account_id}] in environment [{environment}] is not configured")]
    MissingSecret {
        account_id: String,
        environment: String,
    },

    /// Webhook handling was attempted for an entry without a signing secret.
    #[error(
        "webhook secret for account [{account_id}] in environment [{environment}] is not configured"
    )]
    MissingWebhookSecret {
        account_id: String,
        environment: String,
    },

    /// Code asked for the ambient account context outside of any scope.
    #[error("no account context is bound to the current operation")]
    NoAmbientContext,

    /// The third-party API call failed. Passed through untouched.
    #[error("upstream API error: {0}")]
    Upstream(#[source] anyhow::Error),
}

impl MultiAccountError {
    #[must_use]
    pub fn unknown_account(account_id: impl Into<String>) -> Self {
        Self::UnknownAccount {
            account_id: account_id.into(),
        }
    }

    #[must_use]
    pub fn unknown_environment(
        account_id: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self::UnknownEnvironment {
            account_id: account_id.into(),
            environment: environment.into(),
        }
    }

    #[must_use]
    pub fn missing_secret(account_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self::MissingSecret {
            account_id: account_id.into(),
            environment: environment.into(),
        }
    }

    #[must_use]
    pub fn missing_webhook_secret(
        account_id: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self::MissingWebhookSecret {
            account_id: account_id.into(),
            environment: environment.into(),
        }
    }

    #[must_use]
    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        Self::Upstream(err.into())
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownAccount { .. } => "MULTI_ACCOUNT_UNKNOWN_ACCOUNT",
            Self::UnknownEnvironment { .. } => "MULTI_ACCOUNT_UNKNOWN_ENVIRONMENT",
            Self::NoDefaultAccount => "MULTI_ACCOUNT_NO_DEFAULT_ACCOUNT",
            Self::MissingSecret { .. } => "MULTI_ACCOUNT_MISSING_SECRET",
            Self::MissingWebhookSecret { .. } => "MULTI_ACCOUNT_MISSING_WEBHOOK_SECRET",
            Self::NoAmbientContext => "MULTI_ACCOUNT_NO_CONTEXT",
            Self::Upstream(_) => "MULTI_ACCOUNT_UPSTREAM_ERROR",
        }
    }

    /// HTTP status code for this error.
    ///
    /// A missing webhook secret is a configuration gap reported to the
    /// caller as a client error, not a server fault.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingWebhookSecret { .. } => 400,
            Self::UnknownAccount { .. } | Self::UnknownEnvironment { .. } => 404,
            Self::NoDefaultAccount | Self::MissingSecret { .. } | Self::NoAmbientContext => 500,
            Self::Upstream(_) => 502,
        }
    }

    /// Whether this error came from the upstream API rather than from
    /// account resolution.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}
