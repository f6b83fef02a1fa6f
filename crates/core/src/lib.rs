//! iShop Core - Shared types library.
//!
//! This crate provides the domain types used across all iShop components:
//! - `storefront` - Public storefront, checkout and admin panel
//! - `cli` - Command-line tools for catalog migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for item ids, account ids, prices and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
