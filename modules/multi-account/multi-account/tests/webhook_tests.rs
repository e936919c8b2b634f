#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for webhook handling and endpoint provisioning

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{FakeStripeFactory, client_cache, registry, registry_from, sample_config};
use multi_account::{
    AmbientContext, MultiAccountConfig, SyncOutcome, WebhookHandler, WebhookSync, WebhookSyncArgs,
};
use multi_account_sdk::{
    ResolutionRequest, SecretString, WebhookDispatcher, WebhookPayload, WebhookReply,
};

struct EchoDispatcher;

#[async_trait]
impl WebhookDispatcher for EchoDispatcher {
    async fn dispatch(
        &self,
        signing_secret: &SecretString,
        _payload: WebhookPayload,
    ) -> anyhow::Result<WebhookReply> {
        let ctx = AmbientContext::require()?;
        Ok(WebhookReply {
            status: 200,
            body: format!("{}:{}", ctx.identity(), signing_secret.expose()),
        })
    }
}

fn webhook_route(account: &str, environment: Option<&str>) -> ResolutionRequest<'static> {
    let request = ResolutionRequest::new().with_route_param("account", account);
    match environment {
        Some(env) => request.with_route_param("environment", env),
        None => request,
    }
}

fn sync_args(account: &str, env: Option<&str>) -> WebhookSyncArgs {
    WebhookSyncArgs {
        account: account.to_owned(),
        env: env.map(str::to_owned),
    }
}

async fn run_sync(
    sync: &WebhookSync<FakeStripeFactory>,
    args: &WebhookSyncArgs,
) -> (SyncOutcome, String) {
    let mut out = Vec::new();
    let outcome = sync.run(args, &mut out).await;
    (outcome, String::from_utf8(out).unwrap())
}

// =============================================================================
// Webhook handler
// =============================================================================

#[tokio::test]
async fn test_webhook_uses_routed_account_and_environment() {
    let handler = WebhookHandler::new(registry(), Arc::new(EchoDispatcher));

    let reply = handler
        .respond(&webhook_route("us", Some("live")), WebhookPayload::new("{}"))
        .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "us:live:whsec_live_us");

    let reply = handler
        .respond(&webhook_route("us", None), WebhookPayload::new("{}"))
        .await;
    assert_eq!(reply.body, "us:test:whsec_test_us");
}

#[tokio::test]
async fn test_webhook_without_secret_is_rejected_with_400() {
    let handler = WebhookHandler::new(registry(), Arc::new(EchoDispatcher));

    let reply = handler
        .respond(&webhook_route("eu", None), WebhookPayload::new("{}"))
        .await;
    assert_eq!(reply.status, 400);
    assert!(!reply.body.contains("sk_test_eu"));
}

// =============================================================================
// Provisioning
// =============================================================================

#[tokio::test]
async fn test_sync_prints_endpoint_and_secret() {
    let registry = registry();
    let sync = WebhookSync::new(client_cache(&registry));

    let (outcome, out) = run_sync(&sync, &sync_args("us", Some("live"))).await;

    assert_eq!(outcome, SyncOutcome::Success);
    assert!(out.contains("https://shop.example.com/stripe/us/live/webhook"));
    assert!(out.contains("we_us_live"));
    assert!(out.contains("whsec_new_us"));
    assert!(out.contains("accounts.us.live.webhook_secret"));
}

#[tokio::test]
async fn test_sync_defaults_to_default_environment() {
    let registry = registry();
    let sync = WebhookSync::new(client_cache(&registry));

    let (outcome, out) = run_sync(&sync, &sync_args("eu", None)).await;

    assert!(outcome.is_success());
    assert!(out.contains("Environment : test"));
    assert!(out.contains("we_eu_test"));
}

#[tokio::test]
async fn test_sync_fails_on_unknown_environment() {
    let registry = registry();
    let cache = client_cache(&registry);
    let sync = WebhookSync::new(Arc::clone(&cache));

    let (outcome, out) = run_sync(&sync, &sync_args("eu", Some("live"))).await;

    let SyncOutcome::Failure(message) = outcome else {
        panic!("expected failure");
    };
    assert!(message.contains("failed to resolve account configuration"));
    assert!(out.contains("error:"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_sync_fails_on_upstream_error() {
    let registry = registry();
    let sync = WebhookSync::new(client_cache(&registry));

    let (outcome, out) = run_sync(&sync, &sync_args("broken", None)).await;

    let SyncOutcome::Failure(message) = outcome else {
        panic!("expected failure");
    };
    assert!(message.contains("invalid api key provided"));
    assert!(!out.contains("Endpoint ID"));
    assert!(!out.contains("sk_test_broken"));
}

#[tokio::test]
async fn test_sync_without_environment_placeholder() {
    let mut config = sample_config();
    config["webhook"] = serde_json::json!({ "base_url": "http://localhost/" });
    let registry = registry_from(config);
    let sync = WebhookSync::new(client_cache(&registry));

    let (_, out) = run_sync(&sync, &sync_args("us", None)).await;
    assert!(out.contains("http://localhost/stripe/us/webhook"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_loads_from_yaml_with_env_override() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "app.yaml",
            r"
multi_account:
  default_account: us
  accounts:
    us:
      test:
        secret: sk_test_us
",
        )?;
        jail.set_env("MULTI_ACCOUNT_ACCOUNTS__US__TEST__WEBHOOK_SECRET", "whsec_from_env");

        let config = MultiAccountConfig::load("app.yaml").unwrap();
        let registry = multi_account::AccountRegistry::new(config);
        let us = registry.get("us", None).unwrap();
        assert_eq!(us.secret().expose(), "sk_test_us");
        assert_eq!(
            us.webhook_secret().map(SecretString::expose),
            Some("whsec_from_env")
        );
        Ok(())
    });
}
