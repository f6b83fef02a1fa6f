//! Import catalog items from a JSON document.
//!
//! Unlike the storefront's startup seed, which only runs on an empty table,
//! this command imports into a populated catalog. Items whose id already
//! exists are skipped and left unchanged.

use std::path::Path;

use tracing::{info, warn};

use ishop_storefront::catalog::{self, ImportSummary, SqliteCatalog};
use ishop_storefront::db;

/// Import items from `file` into the catalog at `database_url`.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or database operations fail.
pub async fn run(database_url: &str, file: &Path) -> Result<ImportSummary, Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    info!(path = %file.display(), "Loading items from file");
    let items = catalog::read_document(file).await?;
    info!(items = items.len(), "Parsed document");

    let pool = db::create_catalog_pool(database_url).await?;
    db::migrate(&pool).await?;

    let summary = SqliteCatalog::new(pool.clone()).import(&items).await?;
    pool.close().await;

    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "Some items already existed and were skipped");
    }
    info!(inserted = summary.inserted, "Seeding complete");
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("ishop-cli-no-such-items.json");
        assert!(run("sqlite::memory:", &missing).await.is_err());
    }

    #[tokio::test]
    async fn test_imports_document() {
        let path = std::env::temp_dir().join(format!("ishop-cli-seed-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"[{"id": "sword1", "name": "Sword", "price": 9.99}]"#)
            .await
            .unwrap();

        let summary = run("sqlite::memory:", &path).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(summary, ImportSummary { inserted: 1, skipped: 0 });
    }
}
