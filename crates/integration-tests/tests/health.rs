//! Health endpoints and locale selection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ishop_core::PurchaseMode;
use ishop_integration_tests::{TestContext, TestOptions, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_liveness_and_readiness() {
    let ctx = TestContext::start(TestOptions::new(PurchaseMode::Anonymous)).await;

    let live = ctx.get("/health").await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.unwrap(), "ok");

    assert_eq!(ctx.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let ctx = TestContext::start(TestOptions::new(PurchaseMode::Anonymous)).await;

    let response = ctx.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_locale_sets_cookie_and_returns() {
    let ctx = TestContext::start(TestOptions::new(PurchaseMode::Anonymous)).await;

    let response = ctx
        .client
        .get(ctx.url("/lang/de"))
        .header(reqwest::header::REFERER, ctx.url("/admin"))
        .send()
        .await
        .unwrap();

    let cookie = response.headers()[reqwest::header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("i18next=de;"));
    assert_eq!(location(&response), ctx.url("/admin"));
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let ctx = TestContext::start(TestOptions::new(PurchaseMode::Anonymous)).await;

    assert_eq!(ctx.get("/static/css/main.css").await.status(), StatusCode::OK);
}
