//! Multi-account module
//!
//! Lets one process act as several tenants of a payment API. Work is mapped
//! to an account and environment by [`ChainResolver`], credentials come from
//! [`AccountRegistry`], clients are shared through [`ClientCache`], and the
//! resolved account travels with the task via [`AmbientContext`].
//!
//! For SDK surfaces that read a single configured key, [`CredentialSwapper`]
//! installs the right key for the duration of a call and always puts the
//! previous one back.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod provisioning;
pub mod webhook;

pub use config::{ConfigError, MultiAccountConfig};
pub use domain::{
    AccountRegistry, AmbientContext, ChainResolver, ClientCache, CredentialSwapGuard,
    CredentialSwapper, MultiBillable, RequestContextBinder, ScopedCredentialSlot,
};
pub use provisioning::{SyncOutcome, WebhookSync, WebhookSyncArgs, build_webhook_url};
pub use webhook::WebhookHandler;
