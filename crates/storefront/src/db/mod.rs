//! Database connection pools.
//!
//! # Databases
//!
//! ## Catalog (`SQLite`, owned)
//!
//! - `items` - Purchasable items (relational catalog backend)
//! - `purchases` - Purchase ledger (written before every grant)
//!
//! ## Game (`MySQL`, external, not owned)
//!
//! - `account.account` - Login and password hash (read only)
//! - `player.player` - Characters linked to an account (read only)
//! - `player.item` - Character inventory (grants are inserted here)
//!
//! # Migrations
//!
//! Catalog migrations are embedded from `crates/storefront/migrations/` and
//! applied when the `SQLite` catalog is opened. They can also be run via:
//! ```bash
//! cargo run -p ishop-cli -- migrate
//! ```

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::GameDatabaseConfig;

/// Embedded catalog migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create the `SQLite` pool for the catalog and purchase ledger.
///
/// The database file (and its parent directory) is created if missing.
/// In-memory URLs get a single connection so every query sees the same
/// database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection fails.
pub async fn create_catalog_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    if !in_memory
        && let Some(parent) = options.get_filename().parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Apply the embedded catalog migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or was modified after being applied.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create the `MySQL` pool for the external game database.
///
/// Uses the full connection URL when configured, otherwise the individual
/// host/user/password/port/database settings. Connections are opened on
/// first use, so the storefront starts while the game database is down.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid.
pub fn create_game_pool(config: &GameDatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    let options = match &config.url {
        Some(url) => MySqlConnectOptions::from_str(url.expose_secret())?,
        None => {
            let options = MySqlConnectOptions::new()
                .host(&config.host)
                .username(&config.user)
                .password(config.password.expose_secret())
                .port(config.port);
            match &config.database {
                Some(name) => options.database(name),
                None => options,
            }
        }
    };

    Ok(MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options))
}
