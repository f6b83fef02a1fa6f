//! Core types for iShop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod item_id;
pub mod mode;
pub mod price;
pub mod status;

pub use id::*;
pub use item_id::{ItemId, ItemIdError};
pub use mode::{GrantFailurePolicy, PurchaseMode};
pub use price::{Price, PriceError};
pub use status::PurchaseStatus;
