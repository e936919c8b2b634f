//! Multi-account SDK
//!
//! Public contract of the `multi-account` module, which lets one process act
//! as several independent tenants of a payment API:
//!
//! - [`AccountConfig`], [`ResolvedIdentity`], [`AccountContext`] - domain models
//! - [`ResolutionRequest`], [`AttributeSource`] - resolution inputs
//! - [`AccountResolver`], [`ApiClientFactory`], [`CredentialSlot`],
//!   [`WebhookDispatcher`], [`WebhookEndpointApi`] - extension points
//! - [`MultiAccountError`] - error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use multi_account_sdk::{AccountResolver, ResolutionRequest};
//!
//! let request = ResolutionRequest::new()
//!     .with_query_string("stripe_account=us&stripe_env=live")?;
//! let identity = resolver.resolve(&request);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod error;
pub mod models;
pub mod request;
pub mod scalar;
pub mod secret;
pub mod webhook;

pub use api::{
    AccountResolver, ApiClientFactory, CredentialSlot, WebhookDispatcher, WebhookEndpointApi,
};
pub use error::MultiAccountError;
pub use models::{
    AccountConfig, AccountContext, AccountId, Environment, FALLBACK_ENVIRONMENT,
    ResolvedIdentity,
};
pub use request::{AttributeSource, ResolutionRequest};
pub use secret::SecretString;
pub use webhook::{WebhookEndpoint, WebhookPayload, WebhookReply};
