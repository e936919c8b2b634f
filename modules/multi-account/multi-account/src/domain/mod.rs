//! Domain layer: account lookup, resolution, client caching and scoping.

pub mod ambient;
pub mod billing;
pub mod client_cache;
pub mod credential_swap;
pub mod registry;
pub mod resolver;

pub use ambient::{AmbientContext, RequestContextBinder};
pub use billing::MultiBillable;
pub use client_cache::ClientCache;
pub use credential_swap::{CredentialSwapGuard, CredentialSwapper, ScopedCredentialSlot};
pub use registry::AccountRegistry;
pub use resolver::{
    ChainResolver, ChainResolverBuilder, DefaultStrategy, EntityStrategy, Resolution,
    ResolutionSource, ResolutionStrategy, RouteStrategy, SignalStrategy,
};
