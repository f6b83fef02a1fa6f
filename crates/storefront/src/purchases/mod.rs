//! Purchase ledger.
//!
//! Every confirmed checkout is recorded before the item is granted, then
//! updated with the grant outcome. A purchase whose grant never ran (crash,
//! database outage) stays `confirmed` and can be found afterwards.
//!
//! # Backends
//!
//! - [`SqlitePurchaseLedger`] - `purchases` table next to the catalog
//! - [`FilePurchaseLedger`] - append-only JSON lines, one snapshot per change

mod file;
mod sqlite;

pub use file::FilePurchaseLedger;
pub use sqlite::SqlitePurchaseLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ishop_core::{AccountId, ItemId, PurchaseId, PurchaseStatus};

/// A recorded purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub account_id: Option<AccountId>,
    pub item_id: ItemId,
    pub item_name: String,
    /// Charged amount in minor currency units.
    pub amount_minor: i64,
    pub currency: String,
    pub checkout_session_id: Option<String>,
    pub status: PurchaseStatus,
    /// Failure reason for `grant_failed`.
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields known when a purchase is confirmed.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub account_id: Option<AccountId>,
    pub item_id: ItemId,
    pub item_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub checkout_session_id: Option<String>,
}

impl Purchase {
    /// A fresh `confirmed` record with a new id.
    #[must_use]
    pub fn confirmed(new: NewPurchase) -> Self {
        let now = Utc::now();
        Self {
            id: PurchaseId::generate(),
            account_id: new.account_id,
            item_id: new.item_id,
            item_name: new.item_name,
            amount_minor: new.amount_minor,
            currency: new.currency,
            checkout_session_id: new.checkout_session_id,
            status: PurchaseStatus::Confirmed,
            detail: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Errors from the purchase ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("purchase not found: {0}")]
    NotFound(PurchaseId),

    /// A purchase for this checkout session is already recorded.
    #[error("checkout session already recorded: {0}")]
    DuplicateSession(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("purchase log error: {0}")]
    Io(#[from] std::io::Error),

    #[error("purchase log entry error: {0}")]
    Entry(#[from] serde_json::Error),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Durable record of purchases.
#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    /// Store a new purchase.
    ///
    /// Fails with `DuplicateSession` if a purchase for the same checkout
    /// session exists.
    async fn record(&self, purchase: &Purchase) -> Result<(), LedgerError>;

    /// Move a purchase to `status`, replacing its detail.
    async fn mark_status(
        &self,
        id: PurchaseId,
        status: PurchaseStatus,
        detail: Option<&str>,
    ) -> Result<(), LedgerError>;

    /// Latest state of a purchase.
    async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, LedgerError>;

    /// Latest state of the purchase recorded for a checkout session.
    async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Purchase>, LedgerError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use ishop_core::{AccountId, ItemId};

    use super::{NewPurchase, Purchase};

    #[allow(clippy::unwrap_used)]
    pub fn purchase(item_id: &str) -> Purchase {
        Purchase::confirmed(NewPurchase {
            account_id: Some(AccountId::new(7)),
            item_id: ItemId::parse(item_id).unwrap(),
            item_name: "Sword".to_owned(),
            amount_minor: 999,
            currency: "usd".to_owned(),
            checkout_session_id: Some(format!("cs_test_{item_id}")),
        })
    }
}
