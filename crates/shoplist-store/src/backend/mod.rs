//! # Backend Module
//!
//! Document backends for the shopping list.
//!
//! ## Backend Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Backend Pattern Explained                            │
//! │                                                                         │
//! │  State Manager                                                         │
//! │       │                                                                 │
//! │       │  products_store.save(&doc)                                     │
//! │       ▼                                                                 │
//! │  Store { key, version }   ← one handle per document                    │
//! │       │                                                                 │
//! │       │  backend.save(key, version, &doc)                              │
//! │       ▼                                                                 │
//! │  dyn DocumentBackend                                                   │
//! │  ├── SqliteBackend    → documents table, one row per key               │
//! │  ├── JsonFileBackend  → one file per key, atomic rename                │
//! │  └── MemoryBackend    → HashMap (tests, ephemeral mode)                │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • The manager never knows where documents live                        │
//! │  • Tests swap in the memory backend                                    │
//! │  • Version checks live in one place (Store)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

pub mod file;
pub mod memory;
pub mod sqlite;

/// A stored JSON object: field name → value.
pub type Document = serde_json::Map<String, Value>;

/// A document as it sits in the backend, with its schema version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Schema version the document was written with.
    pub version: u32,
    /// Document body.
    pub data: Document,
}

/// Key/document persistence.
///
/// Implementations must make `save` replace the whole document for a key;
/// partial updates are never issued.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Loads the document stored under `key`, or `None` if there is none.
    async fn load(&self, key: &str) -> StoreResult<Option<StoredDocument>>;

    /// Replaces the document stored under `key`.
    async fn save(&self, key: &str, version: u32, data: &Document) -> StoreResult<()>;

    /// Returns true while the backend can serve reads and writes.
    async fn health_check(&self) -> bool {
        true
    }

    /// Releases connections and handles. Nothing may be saved afterwards.
    async fn close(&self) {}
}

/// Turns a decoded JSON value into a document, rejecting non-objects.
pub(crate) fn into_document(key: &str, value: Value) -> StoreResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::malformed(
            key,
            format!("expected a JSON object, got {}", json_type(&other)),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_document_accepts_objects() {
        let doc = into_document("k", json!({ "milk": { "qty": 1 } })).unwrap();
        assert!(doc.contains_key("milk"));
    }

    #[test]
    fn test_into_document_rejects_arrays() {
        let err = into_document("k", json!([1, 2])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed document 'k': expected a JSON object, got array"
        );
    }
}
