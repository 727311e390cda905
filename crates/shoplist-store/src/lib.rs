//! # shoplist-store: Document Persistence for the Shopping List
//!
//! This crate persists the product catalog and the active list as two
//! independent, versioned JSON documents. It knows nothing about what is
//! inside them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Shopping List Data Flow                             │
//! │                                                                         │
//! │  ShoppingListManager (set_qty, delete_product, ...)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shoplist-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐    ┌────────────┐  │   │
//! │  │   │    Store      │    │ DocumentBackend  │    │ Migrations │  │   │
//! │  │   │  (store.rs)   │    │   (backend/)     │    │ (embedded) │  │   │
//! │  │   │               │    │                  │    │            │  │   │
//! │  │   │ key + version │───►│ SqliteBackend    │    │ 001_docs   │  │   │
//! │  │   │ load / save   │    │ JsonFileBackend  │    │            │  │   │
//! │  │   │               │    │ MemoryBackend    │    │            │  │   │
//! │  │   └───────────────┘    └──────────────────┘    └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   shoplist.db  (or one JSON file per key)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - SQLite connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//! - [`backend`] - Backend trait and implementations
//! - [`store`] - Versioned handle for one document
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shoplist_store::{DbConfig, SqliteBackend, Store};
//!
//! let backend = Arc::new(SqliteBackend::connect(DbConfig::new("shoplist.db")).await?);
//! let products = Store::new(backend, 1, "shopping_list_manager.products");
//!
//! let doc = products.load().await?.unwrap_or_default();
//! products.save(&doc).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::file::JsonFileBackend;
pub use backend::memory::MemoryBackend;
pub use backend::{Document, DocumentBackend, StoredDocument};
pub use error::{StoreError, StoreResult};
pub use pool::{DbConfig, SqliteBackend};
pub use store::Store;
