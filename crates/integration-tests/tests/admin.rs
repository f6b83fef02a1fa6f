//! Admin login and catalog management.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ishop_core::{ItemId, PurchaseMode};
use ishop_integration_tests::{ADMIN_PASSWORD, Backend, TestContext, TestOptions, location};
use reqwest::StatusCode;

async fn start() -> TestContext {
    TestContext::start(TestOptions::new(PurchaseMode::Anonymous)).await
}

fn id(value: &str) -> ItemId {
    ItemId::parse(value).unwrap()
}

#[tokio::test]
async fn test_admin_shows_login_form_without_flag() {
    let ctx = start().await;

    let body = ctx.get("/admin").await.text().await.unwrap();

    assert!(body.contains("action=\"/admin/login\""));
    assert!(!body.contains("Manage items"));
}

#[tokio::test]
async fn test_correct_and_wrong_password_diverge() {
    let wrong = start().await;
    let response = wrong
        .post_form("/admin/login", &[("password", "not-it")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Invalid password"));
    assert!(!wrong.get("/admin").await.text().await.unwrap().contains("Manage items"));

    let right = start().await;
    let response = right
        .post_form("/admin/login", &[("password", ADMIN_PASSWORD)])
        .await;
    assert_eq!(location(&response), "/admin");
    let body = right.get("/admin").await.text().await.unwrap();
    assert!(body.contains("Manage items"));
    assert!(body.contains("sword1"));
}

#[tokio::test]
async fn test_mutations_require_admin() {
    let ctx = start().await;

    let response = ctx
        .post_form("/admin/add", &[("id", "shield"), ("name", "Shield"), ("price", "5")])
        .await;
    assert_eq!(location(&response), "/admin");

    let response = ctx.post_form("/admin/delete/sword1", &[]).await;
    assert_eq!(location(&response), "/admin");

    assert!(ctx.catalog.get(&id("shield")).await.unwrap().is_none());
    assert!(ctx.catalog.get(&id("sword1")).await.unwrap().is_some());
}

async fn add_edit_delete(backend: Backend) {
    let ctx = TestContext::start(TestOptions::new(PurchaseMode::Anonymous).backend(backend)).await;
    ctx.login_admin().await;

    let response = ctx
        .post_form("/admin/add", &[("id", "shield"), ("name", "Shield"), ("price", "5.5")])
        .await;
    assert_eq!(location(&response), "/admin");
    let shield = ctx.catalog.get(&id("shield")).await.unwrap().unwrap();
    assert_eq!(shield.price.minor_units().unwrap(), 550);

    let response = ctx
        .post_form("/admin/edit/shield", &[("name", "Tower Shield"), ("price", "7")])
        .await;
    assert_eq!(location(&response), "/admin");
    let shield = ctx.catalog.get(&id("shield")).await.unwrap().unwrap();
    assert_eq!(shield.name, "Tower Shield");
    assert_eq!(shield.price.minor_units().unwrap(), 700);

    let response = ctx.post_form("/admin/delete/shield", &[]).await;
    assert_eq!(location(&response), "/admin");
    assert!(ctx.catalog.get(&id("shield")).await.unwrap().is_none());

    let body = ctx.get("/").await.text().await.unwrap();
    assert!(body.contains("Sword"));
    assert!(!body.contains("Shield"));
}

#[tokio::test]
async fn test_add_edit_delete() {
    add_edit_delete(Backend::Sqlite).await;
}

#[tokio::test]
async fn test_add_edit_delete_with_file_backend() {
    add_edit_delete(Backend::File).await;
}

#[tokio::test]
async fn test_duplicate_add_keeps_existing_item() {
    let ctx = start().await;
    ctx.login_admin().await;

    let response = ctx
        .post_form("/admin/add", &[("id", "sword1"), ("name", "Fake"), ("price", "0.01")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Item already exists"));
    let sword = ctx.catalog.get(&id("sword1")).await.unwrap().unwrap();
    assert_eq!(sword.name, "Sword");
    assert_eq!(sword.price.minor_units().unwrap(), 999);
}

#[tokio::test]
async fn test_invalid_price_rerenders_with_error() {
    let ctx = start().await;
    ctx.login_admin().await;

    let response = ctx
        .post_form("/admin/add", &[("id", "axe"), ("name", "Axe"), ("price", "cheap")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Invalid price"));
    assert!(ctx.catalog.get(&id("axe")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_edit_and_delete_of_unknown_ids_are_noops() {
    let ctx = start().await;
    ctx.login_admin().await;

    let response = ctx
        .post_form("/admin/edit/ghost", &[("name", "Ghost"), ("price", "1")])
        .await;
    assert_eq!(location(&response), "/admin");
    assert!(ctx.catalog.get(&id("ghost")).await.unwrap().is_none());

    let response = ctx.post_form("/admin/delete/ghost", &[]).await;
    assert_eq!(location(&response), "/admin");
    assert_eq!(ctx.catalog.list().await.unwrap().len(), 1);
}
