//! Catalog migration command.
//!
//! # Usage
//!
//! ```bash
//! ishop-cli migrate
//! ishop-cli --database-url sqlite://data/items.db?mode=rwc migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `SQLite` connection string for the catalog and
//!   purchase ledger
//!
//! # Migration Files
//!
//! Embedded from `crates/storefront/migrations/`. The storefront applies the
//! same migrations when it opens the `SQLite` catalog.

use thiserror::Error;

use ishop_storefront::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply the catalog migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database cannot be opened or a migration fails.
pub async fn run(database_url: &str) -> Result<(), MigrationError> {
    tracing::info!(url = %database_url, "Connecting to catalog database...");
    let pool = db::create_catalog_pool(database_url).await?;

    tracing::info!("Running catalog migrations...");
    db::migrate(&pool).await?;
    pool.close().await;

    tracing::info!("Catalog migrations complete!");
    Ok(())
}
