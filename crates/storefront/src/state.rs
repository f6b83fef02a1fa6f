//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::{MySqlPool, SqlitePool};
use tracing::info;

use ishop_core::{GrantFailurePolicy, PurchaseMode};

use crate::accounts::{AccountStore, GameAccountStore};
use crate::catalog::{CatalogError, CatalogStore, FileCatalog, SqliteCatalog};
use crate::config::{CatalogBackend, StorefrontConfig};
use crate::db;
use crate::payments::{PaymentError, PaymentGateway, StripeClient};
use crate::purchases::{FilePurchaseLedger, PurchaseLedger, SqlitePurchaseLedger};
use crate::services::{AdminAuthError, AdminCredentials, CheckoutService, CheckoutSettings};

/// Errors opening the storefront's backends.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("catalog migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("catalog seed error: {0}")]
    Seed(#[from] CatalogError),

    #[error("payment client error: {0}")]
    Payment(#[from] PaymentError),

    #[error("admin credential error: {0}")]
    AdminAuth(#[from] AdminAuthError),
}

/// Store, gateway and pool handles selected by configuration.
pub struct Backends {
    pub catalog: Arc<dyn CatalogStore>,
    pub ledger: Arc<dyn PurchaseLedger>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Present in account purchase mode.
    pub accounts: Option<Arc<dyn AccountStore>>,
    /// Catalog/ledger pool (`SQLite` backend only), closed on shutdown.
    pub catalog_pool: Option<SqlitePool>,
    /// Game database pool (account mode only), closed on shutdown.
    pub game_pool: Option<MySqlPool>,
}

impl Backends {
    /// Open every backend the configuration asks for.
    ///
    /// The `SQLite` catalog is migrated and seeded here. The game database
    /// pool connects lazily, so startup does not wait for `MySQL`.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if a database cannot be opened or migrated,
    /// the seed document is invalid, or the payment client cannot be built.
    pub async fn open(config: &StorefrontConfig) -> Result<Self, StartupError> {
        let (catalog, ledger, catalog_pool): (Arc<dyn CatalogStore>, Arc<dyn PurchaseLedger>, _) =
            match config.catalog.backend {
                CatalogBackend::Sqlite => {
                    let pool = db::create_catalog_pool(&config.catalog.database_url).await?;
                    db::migrate(&pool).await?;
                    let catalog = SqliteCatalog::new(pool.clone());
                    catalog.seed_if_empty(&config.catalog.seed_file).await?;
                    info!(url = %config.catalog.database_url, "SQLite catalog opened");
                    (
                        Arc::new(catalog),
                        Arc::new(SqlitePurchaseLedger::new(pool.clone())),
                        Some(pool),
                    )
                }
                CatalogBackend::File => {
                    info!(path = %config.catalog.file.display(), "File catalog opened");
                    (
                        Arc::new(FileCatalog::new(&config.catalog.file)),
                        Arc::new(FilePurchaseLedger::new(&config.catalog.purchase_log)),
                        None,
                    )
                }
            };

        let (accounts, game_pool) = match config.purchase_mode {
            PurchaseMode::Account => {
                let pool = db::create_game_pool(&config.game_db)?;
                let store = GameAccountStore::new(pool.clone(), config.account_password_scheme);
                (Some(Arc::new(store) as Arc<dyn AccountStore>), Some(pool))
            }
            PurchaseMode::Anonymous => (None, None),
        };

        Ok(Self {
            catalog,
            ledger,
            gateway: Arc::new(StripeClient::new(&config.stripe)?),
            accounts,
            catalog_pool,
            game_pool,
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configured stores, the checkout service and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<dyn CatalogStore>,
    accounts: Option<Arc<dyn AccountStore>>,
    checkout: CheckoutService,
    admin: AdminCredentials,
    catalog_pool: Option<SqlitePool>,
    game_pool: Option<MySqlPool>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, backends: Backends, admin: AdminCredentials) -> Self {
        let checkout = CheckoutService::new(
            Arc::clone(&backends.catalog),
            backends.accounts.clone(),
            backends.gateway,
            backends.ledger,
            CheckoutSettings {
                mode: config.purchase_mode,
                base_url: config.base_url.clone(),
                currency: config.checkout.currency.clone(),
                verify_payments: config.checkout.verify_payments,
            },
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog: backends.catalog,
                accounts: backends.accounts,
                checkout,
                admin,
                catalog_pool: backends.catalog_pool,
                game_pool: backends.game_pool,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn purchase_mode(&self) -> PurchaseMode {
        self.inner.config.purchase_mode
    }

    #[must_use]
    pub fn grant_failure_policy(&self) -> GrantFailurePolicy {
        self.inner.config.grant_failure_policy
    }

    /// Get the catalog store.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }

    /// Get the account store (account mode only).
    #[must_use]
    pub fn accounts(&self) -> Option<&dyn AccountStore> {
        self.inner.accounts.as_deref()
    }

    /// Get the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get the admin credential verifier.
    #[must_use]
    pub fn admin(&self) -> &AdminCredentials {
        &self.inner.admin
    }

    /// Close database pools. Called once the server has stopped.
    pub async fn close(&self) {
        if let Some(pool) = &self.inner.catalog_pool {
            pool.close().await;
        }
        if let Some(pool) = &self.inner.game_pool {
            pool.close().await;
        }
        info!("Database pools closed");
    }
}
