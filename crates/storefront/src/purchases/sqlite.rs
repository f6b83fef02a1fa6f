//! `SQLite` purchase ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use ishop_core::{AccountId, ItemId, PurchaseId, PurchaseStatus};

use super::{LedgerError, Purchase, PurchaseLedger};

type PurchaseRow = (
    String,
    Option<i64>,
    String,
    String,
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Ledger stored in the `purchases` table of the catalog database.
#[derive(Clone)]
pub struct SqlitePurchaseLedger {
    pool: SqlitePool,
}

impl SqlitePurchaseLedger {
    /// Create a ledger over an already migrated pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn purchase_from_row(row: PurchaseRow) -> Result<Purchase, LedgerError> {
    let (
        id,
        account_id,
        item_id,
        item_name,
        amount_minor,
        currency,
        checkout_session_id,
        status,
        detail,
        created_at,
        updated_at,
    ) = row;

    let id = id
        .parse::<PurchaseId>()
        .map_err(|e| LedgerError::DataCorruption(format!("invalid purchase id {id:?}: {e}")))?;
    let item_id = ItemId::parse(&item_id)
        .map_err(|e| LedgerError::DataCorruption(format!("purchase {id}: invalid item id: {e}")))?;
    let status = status
        .parse::<PurchaseStatus>()
        .map_err(|e| LedgerError::DataCorruption(format!("purchase {id}: {e}")))?;

    Ok(Purchase {
        id,
        account_id: account_id.map(AccountId::new),
        item_id,
        item_name,
        amount_minor,
        currency,
        checkout_session_id,
        status,
        detail,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl PurchaseLedger for SqlitePurchaseLedger {
    #[instrument(skip(self, purchase), fields(purchase_id = %purchase.id))]
    async fn record(&self, purchase: &Purchase) -> Result<(), LedgerError> {
        sqlx::query(
            r"
            INSERT INTO purchases (
                id, account_id, item_id, item_name, amount_minor, currency,
                checkout_session_id, status, detail, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(purchase.id.to_string())
        .bind(purchase.account_id.map(|id| id.as_i64()))
        .bind(purchase.item_id.as_str())
        .bind(&purchase.item_name)
        .bind(purchase.amount_minor)
        .bind(&purchase.currency)
        .bind(purchase.checkout_session_id.as_deref())
        .bind(purchase.status.as_str())
        .bind(purchase.detail.as_deref())
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
                && db_err.message().contains("checkout_session_id")
                && let Some(session_id) = &purchase.checkout_session_id
            {
                return LedgerError::DuplicateSession(session_id.clone());
            }
            LedgerError::Database(e)
        })?;

        Ok(())
    }

    #[instrument(skip(self, detail), fields(purchase_id = %id, status = %status))]
    async fn mark_status(
        &self,
        id: PurchaseId,
        status: PurchaseStatus,
        detail: Option<&str>,
    ) -> Result<(), LedgerError> {
        let result =
            sqlx::query("UPDATE purchases SET status = ?, detail = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(detail)
                .bind(Utc::now())
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(id));
        }

        Ok(())
    }

    async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, LedgerError> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, account_id, item_id, item_name, amount_minor, currency,
                   checkout_session_id, status, detail, created_at, updated_at
            FROM purchases
            WHERE id = ?
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(purchase_from_row).transpose()
    }

    async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Purchase>, LedgerError> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r"
            SELECT id, account_id, item_id, item_name, amount_minor, currency,
                   checkout_session_id, status, detail, created_at, updated_at
            FROM purchases
            WHERE checkout_session_id = ?
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(purchase_from_row).transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db;
    use crate::purchases::test_support::purchase;

    async fn ledger() -> SqlitePurchaseLedger {
        let pool = db::create_catalog_pool("sqlite::memory:").await.unwrap();
        db::migrate(&pool).await.unwrap();
        SqlitePurchaseLedger::new(pool)
    }

    #[tokio::test]
    async fn test_record_then_get() {
        let ledger = ledger().await;
        let purchase = purchase("sword1");

        ledger.record(&purchase).await.unwrap();

        let stored = ledger.get(purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Confirmed);
        assert_eq!(stored.amount_minor, 999);
        assert_eq!(stored.account_id, Some(AccountId::new(7)));
        assert_eq!(stored.checkout_session_id.as_deref(), Some("cs_test_sword1"));
    }

    #[tokio::test]
    async fn test_mark_status_records_detail() {
        let ledger = ledger().await;
        let purchase = purchase("sword1");
        ledger.record(&purchase).await.unwrap();

        ledger
            .mark_status(purchase.id, PurchaseStatus::GrantFailed, Some("connection refused"))
            .await
            .unwrap();

        let stored = ledger.get(purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::GrantFailed);
        assert_eq!(stored.detail.as_deref(), Some("connection refused"));
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_mark_status_unknown_purchase() {
        let ledger = ledger().await;
        let err = ledger
            .mark_status(PurchaseId::generate(), PurchaseStatus::Granted, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_record_is_rejected() {
        let ledger = ledger().await;
        let purchase = purchase("sword1");
        ledger.record(&purchase).await.unwrap();
        assert!(ledger.record(&purchase).await.is_err());
    }

    #[tokio::test]
    async fn test_checkout_session_is_recorded_once() {
        let ledger = ledger().await;
        let first = purchase("sword1");
        ledger.record(&first).await.unwrap();

        let mut replay = purchase("sword1");
        replay.account_id = Some(AccountId::new(99));
        let err = ledger.record(&replay).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSession(ref id) if id == "cs_test_sword1"));

        let found = ledger
            .find_by_checkout_session("cs_test_sword1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.account_id, Some(AccountId::new(7)));
        assert!(ledger.find_by_checkout_session("cs_other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purchases_without_session_are_unconstrained() {
        let ledger = ledger().await;
        for _ in 0..2 {
            let mut purchase = purchase("sword1");
            purchase.checkout_session_id = None;
            ledger.record(&purchase).await.unwrap();
        }
    }
}
