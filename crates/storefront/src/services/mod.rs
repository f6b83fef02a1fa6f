//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `checkout` - Checkout orchestration: payment session, purchase record, item grant
//! - `admin_auth` - Admin panel password verification

pub mod admin_auth;
pub mod checkout;

pub use admin_auth::{AdminAuthError, AdminCredentials};
pub use checkout::{
    CheckoutError, CheckoutRedirect, CheckoutService, CheckoutSettings, Confirmation, GrantStatus,
};
