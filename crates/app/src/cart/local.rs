//! Local storage for signed-out carts.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bookshelf::CartItem;
use mockall::automock;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cart::errors::LocalCartError;

#[automock]
#[async_trait]
pub trait LocalCartStore: Send + Sync {
    /// Stored lines, or an empty list when nothing has been stored.
    async fn load(&self) -> Result<Vec<CartItem>, LocalCartError>;

    async fn save(&self, items: Vec<CartItem>) -> Result<(), LocalCartError>;

    async fn clear(&self) -> Result<(), LocalCartError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCart {
    items: Vec<CartItem>,
}

/// Keeps the cart as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileCartStore {
    path: PathBuf,
}

impl JsonFileCartStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");

        PathBuf::from(staging)
    }
}

#[async_trait]
impl LocalCartStore for JsonFileCartStore {
    async fn load(&self) -> Result<Vec<CartItem>, LocalCartError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let stored: StoredCart = serde_json::from_slice(&bytes)?;

        Ok(stored.items)
    }

    async fn save(&self, items: Vec<CartItem>) -> Result<(), LocalCartError> {
        let bytes = serde_json::to_vec_pretty(&StoredCart { items })?;
        let staging = self.staging_path();

        // Write then rename so a crash never leaves a half-written cart behind.
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &self.path).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), LocalCartError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
