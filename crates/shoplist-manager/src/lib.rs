//! # shoplist-manager: The State Manager
//!
//! Holds the catalog and the active list in memory and guarantees that
//! every active key names a catalog product, across concurrent callers and
//! across restarts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Command dispatcher (shoplist-server)                                   │
//! │       │  Arc<ShoppingListManager>                                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 shoplist-manager (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ShoppingListManager ──── op lock + tables + repair            │   │
//! │  │          │                                                      │   │
//! │  │          ├──► Store ×2 (shoplist-store)                         │   │
//! │  │          └──► EventBus ──► "shopping_list_manager_updated"      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shoplist_manager::{EventBus, ShoppingListManager};
//! use shoplist_store::MemoryBackend;
//!
//! let manager = ShoppingListManager::new(Arc::new(MemoryBackend::new()), EventBus::default());
//! manager.load().await?;
//!
//! manager.upsert_product("milk", "Milk", "dairy", "l", "").await?;
//! manager.set_qty("milk", 2).await?;
//! assert_eq!(manager.get_active_qty("milk"), 2);
//! ```

pub mod error;
pub mod events;
pub mod manager;

pub use error::{ErrorKind, ManagerError, ManagerResult};
pub use events::{EventBus, ListEvent, EVENT_SHOPPING_LIST_UPDATED};
pub use manager::{
    FullState, ShoppingListManager, STORAGE_KEY_ACTIVE, STORAGE_KEY_PRODUCTS, STORAGE_VERSION,
};
