//! # SQLite Backend
//!
//! Stores each document as one row of the `documents` table:
//!
//! ```text
//! ┌──────────────────────────────────┬─────────┬──────────────────┬────────────┐
//! │ key (PK)                         │ version │ data (JSON text) │ updated_at │
//! ├──────────────────────────────────┼─────────┼──────────────────┼────────────┤
//! │ shopping_list_manager.products   │ 1       │ {"milk": {...}}  │ 2026-...   │
//! │ shopping_list_manager.active     │ 1       │ {"milk": {...}}  │ 2026-...   │
//! └──────────────────────────────────┴─────────┴──────────────────┴────────────┘
//! ```
//!
//! A save is a single UPSERT, so each document write is atomic on its own.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use super::{into_document, Document, DocumentBackend, StoredDocument};
use crate::error::{StoreError, StoreResult};
use crate::pool::SqliteBackend;

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    version: i64,
    data: String,
}

#[async_trait]
impl DocumentBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self, key: &str) -> StoreResult<Option<StoredDocument>> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT version, data FROM documents WHERE key = ?1")
                .bind(key)
                .fetch_optional(self.pool())
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let version = u32::try_from(row.version)
            .map_err(|_| StoreError::malformed(key, format!("invalid version {}", row.version)))?;
        let value: Value = serde_json::from_str(&row.data)?;

        Ok(Some(StoredDocument {
            version,
            data: into_document(key, value)?,
        }))
    }

    async fn save(&self, key: &str, version: u32, data: &Document) -> StoreResult<()> {
        let json = serde_json::to_string(data)?;
        let now = Utc::now().to_rfc3339();

        debug!(key = %key, version, bytes = json.len(), "Upserting document");

        sqlx::query(
            r#"
            INSERT INTO documents (key, version, data, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                version = excluded.version,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(i64::from(version))
        .bind(json)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(self.pool()).await.is_ok()
    }

    async fn close(&self) {
        info!("Closing database connection pool");
        self.pool().close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use serde_json::json;

    async fn backend() -> SqliteBackend {
        SqliteBackend::connect(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_key() {
        let backend = backend().await;
        assert!(backend.load("shopping_list_manager.products").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_document() {
        let backend = backend().await;
        let first = json!({ "milk": { "qty": 1 } }).as_object().cloned().unwrap();
        let second = json!({ "bread": { "qty": 2 } }).as_object().cloned().unwrap();

        backend.save("active", 1, &first).await.unwrap();
        backend.save("active", 1, &second).await.unwrap();

        let stored = backend.load("active").await.unwrap().unwrap();
        assert_eq!(stored, StoredDocument { version: 1, data: second });
    }

    #[tokio::test]
    async fn test_documents_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shoplist.db");
        let data = json!({ "milk": { "key": "milk", "name": "Milk" } })
            .as_object()
            .cloned()
            .unwrap();

        let backend = SqliteBackend::connect(DbConfig::new(&path)).await.unwrap();
        backend.save("products", 1, &data).await.unwrap();
        backend.close().await;

        let reopened = SqliteBackend::connect(DbConfig::new(&path)).await.unwrap();
        let stored = reopened.load("products").await.unwrap().unwrap();
        assert_eq!(stored.data, data);
    }

    #[tokio::test]
    async fn test_non_object_row_is_malformed() {
        let backend = backend().await;
        sqlx::query("INSERT INTO documents (key, version, data, updated_at) VALUES ('x', 1, '42', '')")
            .execute(backend.pool())
            .await
            .unwrap();

        assert!(matches!(
            backend.load("x").await,
            Err(StoreError::MalformedDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::connect(DbConfig::new(dir.path().join("shoplist.db")))
            .await
            .unwrap();
        assert!(backend.health_check().await);

        backend.close().await;
        assert!(!backend.health_check().await);
        assert!(backend.save("active", 1, &Document::new()).await.is_err());
    }
}
