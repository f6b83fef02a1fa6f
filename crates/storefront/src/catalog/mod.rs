//! Catalog of purchasable items.
//!
//! # Backends
//!
//! - [`SqliteCatalog`] - `items` table in the catalog database, seeded once
//!   from a bundled JSON document when empty
//! - [`FileCatalog`] - a JSON document re-read on every call and rewritten in
//!   full on every mutation
//!
//! Callers only see [`CatalogStore`], so routes and the checkout service are
//! backend-agnostic.

mod file;
mod sqlite;

pub use file::FileCatalog;
pub use sqlite::{ImportSummary, SqliteCatalog};

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ishop_core::{ItemId, Price};

/// A purchasable catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique id within the catalog (also the granted item's `vnum`).
    pub id: ItemId,
    /// Display name, used as the checkout line item label.
    pub name: String,
    /// Unit price in the reference currency.
    pub price: Price,
}

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An item with this id already exists.
    #[error("item already exists: {0}")]
    AlreadyExists(ItemId),

    /// No item with this id exists.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading or writing the catalog file failed.
    #[error("catalog file error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog document is not valid JSON.
    #[error("catalog document error: {0}")]
    Document(#[from] serde_json::Error),

    /// Stored data does not satisfy the item invariants.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Storage for catalog items.
///
/// Implementations must keep ids unique and return prices exactly as stored.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All items, ordered by id.
    async fn list(&self) -> Result<Vec<Item>, CatalogError>;

    /// A single item, or `None` if the id is unknown.
    async fn get(&self, id: &ItemId) -> Result<Option<Item>, CatalogError>;

    /// Insert a new item.
    ///
    /// Returns `CatalogError::AlreadyExists` without touching the stored
    /// record if the id is taken.
    async fn create(&self, item: &Item) -> Result<(), CatalogError>;

    /// Change the name and price of an existing item.
    ///
    /// Returns `CatalogError::NotFound` if the id is unknown.
    async fn update(&self, id: &ItemId, name: &str, price: Price) -> Result<(), CatalogError>;

    /// Remove an item. Deleting an unknown id succeeds.
    async fn delete(&self, id: &ItemId) -> Result<(), CatalogError>;
}

/// Read a catalog document (`[{"id", "name", "price"}, ...]`).
///
/// A missing file is an empty catalog.
///
/// # Errors
///
/// Returns `CatalogError::Io` if the file exists but cannot be read and
/// `CatalogError::Document` if it is not a valid item list.
pub async fn read_document(path: &Path) -> Result<Vec<Item>, CatalogError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}
