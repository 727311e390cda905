//! # Store Handle
//!
//! A [`Store`] binds a backend to one storage key and one schema version,
//! so callers only ever say `load()` and `save(doc)`.
//!
//! ```rust,ignore
//! let products = Store::new(backend.clone(), STORAGE_VERSION, STORAGE_KEY_PRODUCTS);
//! let doc = products.load().await?.unwrap_or_default();
//! products.save(&doc).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::{Document, DocumentBackend};
use crate::error::{StoreError, StoreResult};

/// One versioned document in a backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentBackend>,
    key: String,
    version: u32,
}

impl Store {
    /// Creates a store handle for `key` at schema `version`.
    pub fn new(backend: Arc<dyn DocumentBackend>, version: u32, key: impl Into<String>) -> Self {
        Store {
            backend,
            key: key.into(),
            version,
        }
    }

    /// Returns the storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the expected schema version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Loads the document.
    ///
    /// ## Returns
    /// * `Ok(Some(doc))` - Document found at the expected version
    /// * `Ok(None)` - Nothing stored yet
    /// * `Err(VersionMismatch)` - Stored with another version (no migration)
    pub async fn load(&self) -> StoreResult<Option<Document>> {
        let Some(stored) = self.backend.load(&self.key).await? else {
            debug!(key = %self.key, backend = self.backend.name(), "No stored document");
            return Ok(None);
        };

        if stored.version != self.version {
            return Err(StoreError::VersionMismatch {
                key: self.key.clone(),
                expected: self.version,
                found: stored.version,
            });
        }

        debug!(
            key = %self.key,
            entries = stored.data.len(),
            "Loaded document"
        );
        Ok(Some(stored.data))
    }

    /// Replaces the document.
    pub async fn save(&self, data: &Document) -> StoreResult<()> {
        self.backend.save(&self.key, self.version, data).await?;
        debug!(key = %self.key, entries = data.len(), "Saved document");
        Ok(())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_document() {
        let store = Store::new(Arc::new(MemoryBackend::new()), 1, "products");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = Store::new(Arc::new(MemoryBackend::new()), 1, "products");
        let data = doc(json!({ "milk": { "key": "milk", "name": "Milk" } }));

        store.save(&data).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        Store::new(backend.clone(), 2, "active")
            .save(&Document::new())
            .await
            .unwrap();

        let err = Store::new(backend, 1, "active").load().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionMismatch {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_stores_are_independent() {
        let backend = Arc::new(MemoryBackend::new());
        let products = Store::new(backend.clone(), 1, "products");
        let active = Store::new(backend, 1, "active");

        products.save(&doc(json!({ "a": {} }))).await.unwrap();
        assert!(active.load().await.unwrap().is_none());
    }
}
