//! Relational catalog backed by the `items` table.

use std::path::Path;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use ishop_core::{ItemId, Price};

use super::{CatalogError, CatalogStore, Item, read_document};

type ItemRow = (String, Option<String>, Option<f64>);

/// Catalog stored in the `SQLite` `items` table.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

/// Outcome of importing a catalog document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Items inserted.
    pub inserted: usize,
    /// Items skipped because their id already existed.
    pub skipped: usize,
}

impl SqliteCatalog {
    /// Create a catalog over an already migrated pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Seed the table from a catalog document, but only if it is empty.
    ///
    /// This is a one-time import: once any item exists (including items
    /// added later through the admin panel) the document is ignored. A
    /// missing document is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the table cannot be read, the document is
    /// invalid, or an insert fails.
    #[instrument(skip(self))]
    pub async fn seed_if_empty(&self, document: &Path) -> Result<ImportSummary, CatalogError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(ImportSummary::default());
        }

        let items = read_document(document).await?;
        let summary = self.import(&items).await?;
        if summary.inserted > 0 {
            info!(inserted = summary.inserted, "Seeded empty catalog");
        }
        Ok(summary)
    }

    /// Insert every item whose id is not already present.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Database` if the transaction fails.
    pub async fn import(&self, items: &[Item]) -> Result<ImportSummary, CatalogError> {
        let mut summary = ImportSummary::default();
        let mut tx = self.pool.begin().await?;

        for item in items {
            let result =
                sqlx::query("INSERT OR IGNORE INTO items (id, name, price) VALUES (?, ?, ?)")
                    .bind(item.id.as_str())
                    .bind(&item.name)
                    .bind(item.price.to_f64())
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                summary.skipped += 1;
            } else {
                summary.inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(summary)
    }
}

fn item_from_row((id, name, price): ItemRow) -> Result<Item, CatalogError> {
    let id = ItemId::parse(&id)
        .map_err(|e| CatalogError::DataCorruption(format!("invalid item id {id:?}: {e}")))?;
    let price = price
        .ok_or_else(|| CatalogError::DataCorruption(format!("item {id} has no price")))
        .and_then(|p| {
            Price::from_f64(p).map_err(|e| {
                CatalogError::DataCorruption(format!("item {id} has invalid price: {e}"))
            })
        })?;

    Ok(Item {
        id,
        name: name.unwrap_or_default(),
        price,
    })
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn list(&self) -> Result<Vec<Item>, CatalogError> {
        let rows: Vec<ItemRow> = sqlx::query_as("SELECT id, name, price FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(item_from_row).collect()
    }

    async fn get(&self, id: &ItemId) -> Result<Option<Item>, CatalogError> {
        let row: Option<ItemRow> = sqlx::query_as("SELECT id, name, price FROM items WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(item_from_row).transpose()
    }

    async fn create(&self, item: &Item) -> Result<(), CatalogError> {
        sqlx::query("INSERT INTO items (id, name, price) VALUES (?, ?, ?)")
            .bind(item.id.as_str())
            .bind(&item.name)
            .bind(item.price.to_f64())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return CatalogError::AlreadyExists(item.id.clone());
                }
                CatalogError::Database(e)
            })?;

        Ok(())
    }

    async fn update(&self, id: &ItemId, name: &str, price: Price) -> Result<(), CatalogError> {
        let result = sqlx::query("UPDATE items SET name = ?, price = ? WHERE id = ?")
            .bind(name)
            .bind(price.to_f64())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id.clone()));
        }

        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{item, temp_path};
    use crate::db;

    async fn catalog() -> SqliteCatalog {
        let pool = db::create_catalog_pool("sqlite::memory:").await.unwrap();
        db::migrate(&pool).await.unwrap();
        SqliteCatalog::new(pool)
    }

    #[tokio::test]
    async fn test_create_then_get_returns_stored_values() {
        let catalog = catalog().await;
        let sword = item("sword1", "Sword", "9.99");

        catalog.create(&sword).await.unwrap();

        let stored = catalog.get(&sword.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Sword");
        assert_eq!(stored.price.minor_units().unwrap(), 999);
        assert_eq!(stored.price, sword.price);
    }

    #[tokio::test]
    async fn test_duplicate_create_keeps_existing_record() {
        let catalog = catalog().await;
        catalog.create(&item("sword1", "Sword", "9.99")).await.unwrap();

        let err = catalog
            .create(&item("sword1", "Other", "1.00"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(id) if id.as_str() == "sword1"));

        let stored = catalog
            .get(&ItemId::parse("sword1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Sword");
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let catalog = catalog().await;
        let err = catalog
            .update(&ItemId::parse("ghost").unwrap(), "Ghost", Price::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_changes_name_and_price() {
        let catalog = catalog().await;
        let sword = item("sword1", "Sword", "9.99");
        catalog.create(&sword).await.unwrap();

        catalog
            .update(&sword.id, "Great Sword", Price::parse("19.5").unwrap())
            .await
            .unwrap();

        let stored = catalog.get(&sword.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Great Sword");
        assert_eq!(stored.price.minor_units().unwrap(), 1950);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let catalog = catalog().await;
        let sword = item("sword1", "Sword", "9.99");
        catalog.create(&sword).await.unwrap();

        catalog.delete(&sword.id).await.unwrap();
        catalog.delete(&sword.id).await.unwrap();
        catalog.delete(&ItemId::parse("never").unwrap()).await.unwrap();

        assert!(catalog.get(&sword.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let catalog = catalog().await;
        catalog.create(&item("b", "B", "2")).await.unwrap();
        catalog.create(&item("a", "A", "1")).await.unwrap();

        let ids: Vec<String> = catalog
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id.into_inner())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let catalog = catalog().await;
        let seed = temp_path("seed.json");
        tokio::fs::write(
            &seed,
            r#"[{"id":"sword1","name":"Sword","price":9.99},{"id":"shield","name":"Shield","price":5}]"#,
        )
        .await
        .unwrap();

        let first = catalog.seed_if_empty(&seed).await.unwrap();
        assert_eq!(first.inserted, 2);

        catalog
            .delete(&ItemId::parse("shield").unwrap())
            .await
            .unwrap();

        // Not empty any more: the deleted item is not re-imported
        let second = catalog.seed_if_empty(&seed).await.unwrap();
        assert_eq!(second, ImportSummary::default());
        assert_eq!(catalog.list().await.unwrap().len(), 1);

        tokio::fs::remove_file(&seed).await.unwrap();
    }

    #[tokio::test]
    async fn test_seed_missing_document_is_noop() {
        let catalog = catalog().await;
        let summary = catalog
            .seed_if_empty(&temp_path("missing.json"))
            .await
            .unwrap();
        assert_eq!(summary.inserted, 0);
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_skips_existing_ids() {
        let catalog = catalog().await;
        catalog.create(&item("sword1", "Sword", "9.99")).await.unwrap();

        let summary = catalog
            .import(&[item("sword1", "Dup", "1"), item("axe", "Axe", "3")])
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { inserted: 1, skipped: 1 });
    }
}
