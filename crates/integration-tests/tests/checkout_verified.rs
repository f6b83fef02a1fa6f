//! Checkout in account mode with payment verification.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ishop_core::PurchaseMode;
use ishop_integration_tests::{Backend, TestContext, TestOptions, location};
use reqwest::StatusCode;

fn verified() -> TestOptions {
    TestOptions::new(PurchaseMode::Account).verify_payments()
}

async fn assert_rejected(ctx: &TestContext, path: &str) {
    let response = ctx.get(path).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Payment could not be verified");
}

#[tokio::test]
async fn test_success_url_asks_for_session_id() {
    let ctx = TestContext::start(verified()).await;
    ctx.login_account().await;

    ctx.get("/buy/sword1").await;

    assert_eq!(
        ctx.gateway.requests()[0].success_url,
        ctx.url("/success/sword1?session_id={CHECKOUT_SESSION_ID}")
    );
}

#[tokio::test]
async fn test_missing_or_unknown_session_is_rejected() {
    let ctx = TestContext::start(verified()).await;
    ctx.login_account().await;
    ctx.get("/buy/sword1").await;

    assert_rejected(&ctx, "/success/sword1").await;
    assert_rejected(&ctx, "/success/sword1?session_id=cs_test_404").await;

    assert!(ctx.accounts.grants().is_empty());
    assert!(ctx.purchase_statuses().await.is_empty());
}

#[tokio::test]
async fn test_unpaid_session_is_rejected() {
    let ctx = TestContext::start(verified().sessions_unpaid()).await;
    ctx.login_account().await;
    ctx.get("/buy/sword1").await;

    assert_rejected(&ctx, "/success/sword1?session_id=cs_test_1").await;

    assert!(ctx.accounts.grants().is_empty());
    assert!(ctx.purchase_statuses().await.is_empty());
}

async fn paid_session_grants_once(backend: Backend) {
    let ctx = TestContext::start(verified().backend(backend)).await;
    ctx.login_account().await;
    ctx.get("/buy/sword1").await;

    for _ in 0..3 {
        let response = ctx.get("/success/sword1?session_id=cs_test_1").await;
        assert_eq!(location(&response), "/?success=true");
    }

    assert_eq!(ctx.accounts.grants().len(), 1);
    assert_eq!(ctx.purchase_statuses().await, vec!["granted"]);
    assert_eq!(
        ctx.purchases().await[0].checkout_session_id.as_deref(),
        Some("cs_test_1")
    );
}

#[tokio::test]
async fn test_paid_session_grants_once() {
    paid_session_grants_once(Backend::Sqlite).await;
}

#[tokio::test]
async fn test_paid_session_grants_once_with_file_backend() {
    paid_session_grants_once(Backend::File).await;
}
