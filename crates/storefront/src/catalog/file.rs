//! Flat-file catalog.
//!
//! Every operation re-reads the whole JSON document and every mutation
//! rewrites it. There is no writer coordination: two overlapping mutations
//! each save their own snapshot and the later save wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use ishop_core::{ItemId, Price};

use super::{CatalogError, CatalogStore, Item, read_document};

/// Catalog stored as a single JSON array on disk.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    /// Create a catalog over `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Item>, CatalogError> {
        read_document(&self.path).await
    }

    async fn save(&self, items: &[Item]) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for FileCatalog {
    async fn list(&self) -> Result<Vec<Item>, CatalogError> {
        let mut items = self.load().await?;
        items.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(items)
    }

    async fn get(&self, id: &ItemId) -> Result<Option<Item>, CatalogError> {
        Ok(self.load().await?.into_iter().find(|i| &i.id == id))
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn create(&self, item: &Item) -> Result<(), CatalogError> {
        let mut items = self.load().await?;
        if items.iter().any(|i| i.id == item.id) {
            return Err(CatalogError::AlreadyExists(item.id.clone()));
        }
        items.push(item.clone());
        self.save(&items).await
    }

    #[instrument(skip(self, name, price))]
    async fn update(&self, id: &ItemId, name: &str, price: Price) -> Result<(), CatalogError> {
        let mut items = self.load().await?;
        let Some(existing) = items.iter_mut().find(|i| &i.id == id) else {
            return Err(CatalogError::NotFound(id.clone()));
        };
        existing.name = name.to_owned();
        existing.price = price;
        self.save(&items).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ItemId) -> Result<(), CatalogError> {
        let mut items = self.load().await?;
        let before = items.len();
        items.retain(|i| &i.id != id);
        if items.len() == before {
            return Ok(());
        }
        self.save(&items).await
    }
}
