//! Session-held models for the storefront.

pub mod session;

pub use session::{CurrentAccount, keys as session_keys};
