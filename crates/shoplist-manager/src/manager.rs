//! # Shopping List Manager
//!
//! Owns the catalog and the active list and keeps the active list's keys a
//! subset of the catalog's keys.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Two Locks, Two Jobs                              │
//! │                                                                         │
//! │  op_lock: tokio::sync::Mutex<()>                                        │
//! │    held for the WHOLE of load / upsert / set_qty / delete /             │
//! │    get_products / get_active / get_full_state, across awaits            │
//! │                                                                         │
//! │  tables: std::sync::RwLock<Tables>                                      │
//! │    held only for a clone or a swap, never across an await               │
//! │                                                                         │
//! │  get_product / get_active_qty take the tables guard only               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mutation Flow
//! ```text
//! lock op_lock
//!   ├── clone table(s)               (tables read guard)
//!   ├── apply change to the clone
//!   ├── persist the clone            (await)  ── Err ──► memory untouched
//!   ├── swap clone into memory       (tables write guard)
//!   └── publish ListEvent::Updated
//! unlock
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;
use shoplist_core::validation::validate_quantity;
use shoplist_core::{find_orphans, validate_invariant, ActiveItem, CoreError, InvariantViolation, Product};
use shoplist_store::{Document, DocumentBackend, Store};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::ManagerResult;
use crate::events::{EventBus, ListEvent};

/// Storage key of the product catalog document.
pub const STORAGE_KEY_PRODUCTS: &str = "shopping_list_manager.products";

/// Storage key of the active list document.
pub const STORAGE_KEY_ACTIVE: &str = "shopping_list_manager.active";

/// Schema version of both documents.
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<String, Product>,
    active: HashMap<String, ActiveItem>,
}

/// Combined snapshot returned by [`ShoppingListManager::get_full_state`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullState {
    pub products: Document,
    pub active_list: Document,
}

/// The invariant-enforcing state manager.
///
/// Shared with the command layer through an `Arc`.
pub struct ShoppingListManager {
    backend: Arc<dyn DocumentBackend>,
    products_store: Store,
    active_store: Store,
    events: EventBus,
    op_lock: Mutex<()>,
    tables: RwLock<Tables>,
}

impl ShoppingListManager {
    /// Creates a manager with empty tables. Call [`load`](Self::load) before use.
    pub fn new(backend: Arc<dyn DocumentBackend>, events: EventBus) -> Self {
        ShoppingListManager {
            products_store: Store::new(backend.clone(), STORAGE_VERSION, STORAGE_KEY_PRODUCTS),
            active_store: Store::new(backend.clone(), STORAGE_VERSION, STORAGE_KEY_ACTIVE),
            backend,
            events,
            op_lock: Mutex::new(()),
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Returns the event bus the manager publishes on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns true while the storage backend is usable.
    pub async fn storage_healthy(&self) -> bool {
        self.backend.health_check().await
    }

    /// Waits for the running operation, then closes the storage backend.
    pub async fn close(&self) {
        let _guard = self.op_lock.lock().await;
        info!(backend = self.backend.name(), "Closing storage");
        self.backend.close().await;
    }

    // =========================================================================
    // Table access
    // =========================================================================

    fn with_tables<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Tables) -> R,
    {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        f(&tables)
    }

    fn with_tables_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Tables) -> R,
    {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }

    // =========================================================================
    // Locked operations
    // =========================================================================

    /// Loads both tables from storage and repairs orphaned active items.
    ///
    /// Missing documents load as empty tables. Orphans are dropped and the
    /// active table is re-saved; a failure of that save is logged only.
    pub async fn load(&self) -> ManagerResult<()> {
        let _guard = self.op_lock.lock().await;

        let products = match self.products_store.load().await? {
            Some(doc) => decode_products(&doc)?,
            None => HashMap::new(),
        };
        let mut active = match self.active_store.load().await? {
            Some(doc) => decode_active(&doc)?,
            None => HashMap::new(),
        };

        let orphans = find_orphans(&products, &active);
        if !orphans.is_empty() {
            warn!(
                count = orphans.len(),
                keys = ?orphans,
                "Removing active items without a catalog product"
            );
            for key in &orphans {
                active.remove(key);
            }
            if let Err(e) = self.active_store.save(&encode_active(&active)).await {
                error!(error = %e, "Failed to persist repaired active list");
            }
        }

        info!(
            products = products.len(),
            active = active.len(),
            "Shopping list loaded"
        );

        self.with_tables_mut(|tables| {
            tables.products = products;
            tables.active = active;
        });
        Ok(())
    }

    /// Creates or replaces the product at `key`. Never touches the active list.
    pub async fn upsert_product(
        &self,
        key: &str,
        name: &str,
        category: &str,
        unit: &str,
        image: &str,
    ) -> ManagerResult<Product> {
        let product = Product::new(key, name)
            .with_category(category)
            .with_unit(unit)
            .with_image(image);

        let _guard = self.op_lock.lock().await;

        let mut products = self.with_tables(|tables| tables.products.clone());
        products.insert(key.to_string(), product.clone());

        self.products_store.save(&encode_products(&products)).await?;
        self.with_tables_mut(|tables| tables.products = products);

        debug!(key = %key, name = %name, "Upserted product");
        self.events.publish(ListEvent::Updated);
        Ok(product)
    }

    /// Sets the wanted quantity of a catalog product. Zero removes the entry.
    ///
    /// ## Errors
    /// * `InvalidArgument` - `qty` is negative
    /// * `InvariantViolation` - `key` is not in the catalog
    pub async fn set_qty(&self, key: &str, qty: i64) -> ManagerResult<()> {
        validate_quantity(qty)?;

        let _guard = self.op_lock.lock().await;

        let (known, mut active) =
            self.with_tables(|tables| (tables.products.contains_key(key), tables.active.clone()));
        if !known {
            warn!(key = %key, qty, "Rejected quantity for unknown product");
            return Err(InvariantViolation::UnknownProduct(key.to_string()).into());
        }

        if qty > 0 {
            active.insert(key.to_string(), ActiveItem::new(qty)?);
        } else {
            active.remove(key);
        }

        self.active_store.save(&encode_active(&active)).await?;
        self.with_tables_mut(|tables| tables.active = active);

        debug!(key = %key, qty, "Set quantity");
        self.events.publish(ListEvent::Updated);
        Ok(())
    }

    /// Removes a product and its active entry. A missing key is a no-op.
    ///
    /// The active table is saved before the catalog, so a failure between
    /// the two writes never leaves an orphan in storage.
    pub async fn delete_product(&self, key: &str) -> ManagerResult<()> {
        let _guard = self.op_lock.lock().await;

        let tables = self.with_tables(|tables| {
            tables
                .products
                .contains_key(key)
                .then(|| (tables.products.clone(), tables.active.clone()))
        });
        let Some((mut products, mut active)) = tables else {
            warn!(key = %key, "Delete requested for unknown product");
            return Ok(());
        };

        products.remove(key);
        let was_active = active.remove(key).is_some();

        self.active_store.save(&encode_active(&active)).await?;
        self.with_tables_mut(|tables| tables.active = active);

        if let Err(e) = self.products_store.save(&encode_products(&products)).await {
            error!(key = %key, error = %e, "Active entry removed but catalog save failed");
            if was_active {
                self.events.publish(ListEvent::Updated);
            }
            return Err(e.into());
        }
        self.with_tables_mut(|tables| tables.products = products);

        debug!(key = %key, was_active, "Deleted product");
        self.events.publish(ListEvent::Updated);
        Ok(())
    }

    /// Returns a snapshot of the catalog: key → product record.
    pub async fn get_products(&self) -> Document {
        let _guard = self.op_lock.lock().await;
        self.with_tables(|tables| encode_products(&tables.products))
    }

    /// Returns a snapshot of the active list: key → `{"qty": n}`.
    pub async fn get_active(&self) -> Document {
        let _guard = self.op_lock.lock().await;
        self.with_tables(|tables| encode_active(&tables.active))
    }

    /// Returns both snapshots after checking the invariant.
    pub async fn get_full_state(&self) -> ManagerResult<FullState> {
        let _guard = self.op_lock.lock().await;
        self.with_tables(|tables| -> ManagerResult<FullState> {
            validate_invariant(&tables.products, &tables.active).map_err(|violation| {
                error!(keys = ?violation.keys(), "Invariant broken in memory");
                violation
            })?;
            Ok(FullState {
                products: encode_products(&tables.products),
                active_list: encode_active(&tables.active),
            })
        })
    }

    // =========================================================================
    // Point reads (no operation lock)
    // =========================================================================

    /// Returns a copy of one product.
    pub fn get_product(&self, key: &str) -> Option<Product> {
        self.with_tables(|tables| tables.products.get(key).cloned())
    }

    /// Returns the wanted quantity of one product, zero when not on the list.
    pub fn get_active_qty(&self, key: &str) -> i64 {
        self.with_tables(|tables| tables.active.get(key).map_or(0, ActiveItem::qty))
    }
}

impl fmt::Debug for ShoppingListManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShoppingListManager")
            .field("backend", &self.backend.name())
            .field("products_store", &self.products_store)
            .field("active_store", &self.active_store)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Document encoding
// =============================================================================

fn encode_products(products: &HashMap<String, Product>) -> Document {
    products
        .iter()
        .map(|(key, product)| (key.clone(), Value::Object(product.to_map())))
        .collect()
}

fn encode_active(active: &HashMap<String, ActiveItem>) -> Document {
    active
        .iter()
        .map(|(key, item)| (key.clone(), Value::Object(item.to_map())))
        .collect()
}

fn decode_products(doc: &Document) -> Result<HashMap<String, Product>, CoreError> {
    doc.iter()
        .map(|(key, value)| {
            let map = value
                .as_object()
                .ok_or_else(|| CoreError::malformed("product", key, "record is not an object"))?;
            let product = Product::from_map(map)?;
            if product.key != *key {
                return Err(CoreError::malformed(
                    "product",
                    key,
                    format!("record is stored under '{key}' but names key '{}'", product.key),
                ));
            }
            Ok((key.clone(), product))
        })
        .collect()
}

fn decode_active(doc: &Document) -> Result<HashMap<String, ActiveItem>, CoreError> {
    doc.iter()
        .map(|(key, value)| {
            let map = value
                .as_object()
                .ok_or_else(|| CoreError::malformed("active item", key, "record is not an object"))?;
            Ok((key.clone(), ActiveItem::from_map(key, map)?))
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
