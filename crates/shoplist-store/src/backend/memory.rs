//! # Memory Backend
//!
//! Keeps documents in a `HashMap`. Nothing survives a restart.
//!
//! Used by tests and by the `memory` storage option.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Document, DocumentBackend, StoredDocument};
use crate::error::{StoreError, StoreResult};

/// In-memory document backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: RwLock<HashMap<String, StoredDocument>>,
    read_only: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail (or succeed again).
    ///
    /// Simulates an unavailable disk.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Makes every subsequent `save` of `key` fail. Other keys are unaffected.
    pub fn fail_key(&self, key: &str) {
        self.failing_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }

    fn is_failing(&self, key: &str) -> bool {
        self.read_only.load(Ordering::SeqCst)
            || self
                .failing_keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(key)
    }

    /// Returns the keys currently stored.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.documents.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &str) -> StoreResult<Option<StoredDocument>> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, version: u32, data: &Document) -> StoreResult<()> {
        if self.is_failing(key) {
            return Err(StoreError::Internal(format!(
                "memory backend is read-only, cannot save '{key}'"
            )));
        }

        debug!(key = %key, version, "Storing document in memory");
        self.documents.write().await.insert(
            key.to_string(),
            StoredDocument {
                version,
                data: data.clone(),
            },
        );
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.read_only.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_overwrite_replaces_document() {
        let backend = MemoryBackend::new();
        let mut doc = Document::new();
        doc.insert("milk".into(), serde_json::json!({ "qty": 1 }));
        backend.save("active", 1, &doc).await.unwrap();

        backend.save("active", 1, &Document::new()).await.unwrap();
        let stored = backend.load("active").await.unwrap().unwrap();
        assert!(stored.data.is_empty());
        assert_eq!(backend.keys().await, vec!["active".to_string()]);
    }

    #[tokio::test]
    async fn test_read_only_rejects_saves() {
        let backend = MemoryBackend::new();
        backend.set_read_only(true);
        assert!(backend.save("active", 1, &Document::new()).await.is_err());
        assert!(backend.load("active").await.unwrap().is_none());
        assert!(!backend.health_check().await);

        backend.set_read_only(false);
        assert!(backend.health_check().await);
        assert!(backend.save("active", 1, &Document::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_key_rejects_only_that_key() {
        let backend = MemoryBackend::new();
        backend.fail_key("products");

        assert!(backend.save("products", 1, &Document::new()).await.is_err());
        assert!(backend.save("active", 1, &Document::new()).await.is_ok());
        assert_eq!(backend.keys().await, vec!["active".to_string()]);
    }
}
