#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for client caching, ambient context and credential scoping

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{client_cache, registry, resolver};
use multi_account::{
    AmbientContext, CredentialSwapper, MultiBillable, RequestContextBinder, ScopedCredentialSlot,
};
use multi_account_sdk::{
    CredentialSlot, MultiAccountError, ResolutionRequest, ResolvedIdentity, SecretString,
};

fn platform_slot() -> ScopedCredentialSlot {
    ScopedCredentialSlot::new(Some(SecretString::new("sk_platform")))
}

fn active(slot: &ScopedCredentialSlot) -> Option<String> {
    slot.current().map(|s| s.expose().to_owned())
}

// =============================================================================
// Client cache
// =============================================================================

#[test]
fn test_same_identity_shares_one_client() {
    let registry = registry();
    let cache = client_cache(&registry);

    let a = cache.for_identity("us", Some("live")).unwrap();
    let b = cache.for_identity("us", Some("live")).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.api_key, "sk_live_us");
}

#[test]
fn test_entity_without_hint_uses_default_client() {
    let registry = registry();
    let cache = client_cache(&registry);
    let guest: HashMap<String, String> = HashMap::new();

    let client = cache.for_entity(&guest).unwrap();
    assert_eq!(client.account_id, "us");
    assert_eq!(client.environment, "test");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_converge_on_one_client_per_key() {
    let registry = registry();
    let cache = client_cache(&registry);

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let account = if i % 2 == 0 { "us" } else { "eu" };
                cache.for_identity(account, None).unwrap()
            })
        })
        .collect();

    let mut clients = Vec::new();
    for task in tasks {
        clients.push(task.await.unwrap());
    }

    let us: Vec<_> = clients.iter().filter(|c| c.account_id == "us").collect();
    let eu: Vec<_> = clients.iter().filter(|c| c.account_id == "eu").collect();
    assert!(us.windows(2).all(|w| Arc::ptr_eq(w[0], w[1])));
    assert!(eu.windows(2).all(|w| Arc::ptr_eq(w[0], w[1])));
    assert_eq!(cache.len(), 2);
}

// =============================================================================
// Ambient context
// =============================================================================

#[tokio::test]
async fn test_binder_makes_account_available_downstream() {
    let registry = registry();
    let cache = client_cache(&registry);
    let binder = RequestContextBinder::new(Arc::clone(&registry), resolver(&registry));
    let request = ResolutionRequest::new()
        .with_query_string("stripe_account=us&stripe_env=live")
        .unwrap();

    let key = binder
        .bind(&request, async { cache.for_ambient().unwrap().api_key.clone() })
        .await
        .unwrap();

    assert_eq!(key, "sk_live_us");
    assert!(!AmbientContext::is_set());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_see_their_own_account() {
    let registry = registry();
    let binder = Arc::new(RequestContextBinder::new(
        Arc::clone(&registry),
        resolver(&registry),
    ));

    let tasks: Vec<_> = ["us", "eu", "us", "eu", "broken"]
        .into_iter()
        .map(|account| {
            let binder = Arc::clone(&binder);
            tokio::spawn(async move {
                let request = ResolutionRequest::new().with_header("X-Stripe-Account", account);
                let seen = binder
                    .bind(&request, async {
                        tokio::task::yield_now().await;
                        AmbientContext::require().unwrap().account_id().to_owned()
                    })
                    .await
                    .unwrap();
                (account, seen)
            })
        })
        .collect();

    for task in tasks {
        let (expected, seen) = task.await.unwrap();
        assert_eq!(expected, seen);
    }
}

// =============================================================================
// Credential swapping
// =============================================================================

#[test]
fn test_swap_restores_after_success_and_failure() {
    let registry = registry();
    let swapper = CredentialSwapper::new(Arc::clone(&registry), resolver(&registry));
    let slot = platform_slot();
    let live = ResolvedIdentity::new("us", "live");

    let ok = swapper
        .with_credential(&slot, Some(&live), |_| active(&slot))
        .unwrap();
    assert_eq!(ok.as_deref(), Some("sk_live_us"));
    assert_eq!(active(&slot).as_deref(), Some("sk_platform"));

    let failed: Result<(), MultiAccountError> = swapper
        .with_credential(&slot, Some(&live), |_| {
            Err(MultiAccountError::upstream(anyhow::anyhow!("card declined")))
        })
        .unwrap();
    assert!(failed.unwrap_err().is_upstream());
    assert_eq!(active(&slot).as_deref(), Some("sk_platform"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_request_slots_do_not_leak_between_tenants() {
    let registry = registry();
    let swapper = Arc::new(CredentialSwapper::new(
        Arc::clone(&registry),
        resolver(&registry),
    ));

    let tasks: Vec<_> = [("us", "sk_test_us"), ("eu", "sk_test_eu")]
        .into_iter()
        .cycle()
        .take(16)
        .map(|(account, expected)| {
            let swapper = Arc::clone(&swapper);
            tokio::spawn(async move {
                let slot = ScopedCredentialSlot::default();
                let identity = ResolvedIdentity::new(account, "test");
                let seen = swapper
                    .with_credential_async(&slot, Some(&identity), |_| async {
                        tokio::task::yield_now().await;
                        active(&slot)
                    })
                    .await
                    .unwrap();
                assert_eq!(seen.as_deref(), Some(expected));
                active(&slot)
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), None);
    }
}

#[test]
fn test_billing_entity_charges_under_its_own_account() {
    let registry = registry();
    let swapper = CredentialSwapper::new(Arc::clone(&registry), resolver(&registry));
    let slot = platform_slot();

    let mut customer = HashMap::new();
    customer.insert("stripe_account_id".to_owned(), "eu".to_owned());

    let charged_with = customer
        .with_billing_credential(&swapper, &slot, |ctx| {
            format!("{}:{}", ctx.account_id(), active(&slot).unwrap())
        })
        .unwrap();

    assert_eq!(charged_with, "eu:sk_test_eu");
    assert_eq!(active(&slot).as_deref(), Some("sk_platform"));
    assert_eq!(
        customer
            .billing_identity(resolver(&registry).as_ref(), &registry)
            .unwrap(),
        ResolvedIdentity::new("eu", "test")
    );
}
