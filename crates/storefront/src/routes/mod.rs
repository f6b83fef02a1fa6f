//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog (flash flags: success, canceled, grant_failed)
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (catalog store)
//! GET  /lang/{lng}             - Set locale cookie, redirect back
//!
//! # Checkout
//! GET  /buy/{id}               - Create checkout session, redirect to provider
//! GET  /success/{id}           - Provider success callback: record and grant
//!
//! # Account (account purchase mode)
//! GET  /login                  - Login page
//! POST /login                  - Login action
//! GET  /logout                 - Destroy session
//!
//! # Admin
//! GET  /admin                  - Catalog management, or admin login form
//! POST /admin/login            - Admin login
//! POST /admin/add              - Create item
//! POST /admin/edit/{id}        - Update item
//! POST /admin/delete/{id}      - Delete item
//! ```

pub mod admin;
pub mod auth;
pub mod checkout;
pub mod health;
pub mod home;
pub mod locale;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/login", post(admin::login))
        .route("/add", post(admin::add))
        .route("/edit/{id}", post(admin::edit))
        .route("/delete/{id}", post(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/lang/{lng}", get(locale::set_locale))
        // Checkout
        .route("/buy/{id}", get(checkout::buy))
        .route("/success/{id}", get(checkout::success))
        // Account auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        // Admin panel (nested "/" serves GET /admin)
        .nest("/admin", admin_routes())
}
