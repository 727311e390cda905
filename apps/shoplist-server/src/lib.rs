//! # Shopping List Server
//!
//! Process wiring for the shopping list: storage, manager, WebSocket server.
//!
//! ## Module Organization
//! ```text
//! shoplist_server/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── main.rs         ◄─── Binary entry: logging, config, run
//! ├── config.rs       ◄─── ServerConfig (TOML + env)
//! ├── protocol.rs     ◄─── Request / OutgoingMessage wire types
//! ├── commands.rs     ◄─── Command dispatcher
//! ├── server.rs       ◄─── axum /ws and /health
//! └── error.rs        ◄─── ApiError (wire) and ServerError (process)
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

use std::path::Path;
use std::sync::Arc;

use shoplist_manager::{EventBus, ShoppingListManager};
use shoplist_store::{DbConfig, DocumentBackend, JsonFileBackend, MemoryBackend, SqliteBackend};
use tracing::info;

use config::{ServerConfig, StorageBackend};
use error::{ServerError, ServerResult};

/// SQLite file name inside the storage directory.
pub const DATABASE_FILE: &str = "shoplist.db";

/// Runs the server until Ctrl+C / SIGTERM.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Open Storage ─────────── sqlite / json / memory per config          │
/// │  2. Build Manager ────────── Arc<ShoppingListManager> + EventBus        │
/// │  3. Load Lists ───────────── read both documents, repair orphans        │
/// │  4. Bind ─────────────────── TcpListener on server.bind_addr:port       │
/// │  5. Serve ────────────────── until shutdown signal                      │
/// │  6. Close Storage ────────── after in-flight commands finish            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let backend = open_backend(&config).await?;
    info!(backend = backend.name(), "Storage opened");

    let manager = Arc::new(ShoppingListManager::new(backend, EventBus::default()));
    manager.load().await?;

    let listener = server::bind(&config.server).await?;
    let served = server::serve(listener, manager.clone(), shutdown_signal()).await;

    manager.close().await;
    served
}

/// Opens the configured document backend.
pub async fn open_backend(config: &ServerConfig) -> ServerResult<Arc<dyn DocumentBackend>> {
    let backend: Arc<dyn DocumentBackend> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryBackend::new()),
        StorageBackend::Json => {
            let dir = storage_dir(config)?;
            tokio::fs::create_dir_all(dir).await?;
            Arc::new(JsonFileBackend::new(dir))
        }
        StorageBackend::Sqlite => {
            let dir = storage_dir(config)?;
            tokio::fs::create_dir_all(dir).await?;
            Arc::new(SqliteBackend::connect(DbConfig::new(dir.join(DATABASE_FILE))).await?)
        }
    };
    Ok(backend)
}

fn storage_dir(config: &ServerConfig) -> ServerResult<&Path> {
    config.storage.path.as_deref().ok_or_else(|| {
        ServerError::InvalidConfig(format!(
            "storage.path is required for the {} backend",
            config.storage.backend
        ))
    })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_manager::STORAGE_KEY_PRODUCTS;

    fn config(backend: StorageBackend, path: Option<&Path>) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.storage.backend = backend;
        config.storage.path = path.map(Path::to_path_buf);
        config
    }

    #[tokio::test]
    async fn test_open_each_backend() {
        let dir = tempfile::tempdir().unwrap();

        let memory = open_backend(&config(StorageBackend::Memory, None)).await.unwrap();
        assert_eq!(memory.name(), "memory");

        let json = open_backend(&config(StorageBackend::Json, Some(&dir.path().join("json"))))
            .await
            .unwrap();
        assert_eq!(json.name(), "json");

        let sqlite = open_backend(&config(StorageBackend::Sqlite, Some(&dir.path().join("db"))))
            .await
            .unwrap();
        assert_eq!(sqlite.name(), "sqlite");
        assert!(dir.path().join("db").join(DATABASE_FILE).exists());
    }

    #[tokio::test]
    async fn test_persistent_backend_without_path_fails() {
        let result = open_backend(&config(StorageBackend::Json, None)).await;
        assert!(matches!(result, Err(ServerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_lists_survive_restart_on_json_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(StorageBackend::Json, Some(dir.path()));

        let manager = ShoppingListManager::new(open_backend(&config).await.unwrap(), EventBus::default());
        manager.load().await.unwrap();
        manager.upsert_product("milk", "Milk", "dairy", "l", "").await.unwrap();
        manager.set_qty("milk", 2).await.unwrap();
        assert!(dir.path().join(STORAGE_KEY_PRODUCTS).exists());

        let restarted = ShoppingListManager::new(open_backend(&config).await.unwrap(), EventBus::default());
        restarted.load().await.unwrap();
        assert_eq!(restarted.get_active_qty("milk"), 2);
        assert_eq!(restarted.get_product("milk").map(|p| p.unit), Some("l".to_string()));
    }

    #[tokio::test]
    async fn test_close_shuts_sqlite_storage() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(StorageBackend::Sqlite, Some(dir.path()));

        let manager = ShoppingListManager::new(open_backend(&config).await.unwrap(), EventBus::default());
        manager.load().await.unwrap();
        assert!(manager.storage_healthy().await);

        manager.close().await;
        assert!(!manager.storage_healthy().await);
        assert!(manager.upsert_product("milk", "Milk", "other", "pcs", "").await.is_err());
    }
}
