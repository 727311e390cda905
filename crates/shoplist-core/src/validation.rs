//! # Validation Module
//!
//! Input validation and the catalog/active invariant.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: WebSocket command (shoplist-server)                          │
//! │  ├── Message shape (required fields, types, qty >= 0)                  │
//! │  └── Answers invalid_format without touching the manager               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: State manager                                                │
//! │  ├── THIS MODULE: quantity check                                       │
//! │  └── THIS MODULE: active keys ⊆ product keys                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage                                                      │
//! │  └── No foreign keys: the invariant lives in application logic only    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shoplist_core::validation::validate_quantity;
//!
//! assert!(validate_quantity(0).is_ok());
//! assert!(validate_quantity(-1).is_err());
//! ```

use std::collections::HashMap;

use crate::error::{InvariantViolation, ValidationError};
use crate::types::{ActiveItem, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested quantity.
///
/// Zero is allowed: it removes the item from the active list.
///
/// ```text
/// set_qty(key, qty)
///      │
///      ├── qty < 0  → Error: "qty cannot be negative"
///      ├── qty == 0 → remove from active list
///      └── qty > 0  → insert / replace
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::Negative {
            field: "qty".to_string(),
            value: qty,
        });
    }

    Ok(())
}

// =============================================================================
// Invariant
// =============================================================================

/// Returns the active keys that have no catalog product, sorted.
pub fn find_orphans(
    products: &HashMap<String, Product>,
    active: &HashMap<String, ActiveItem>,
) -> Vec<String> {
    let mut orphans: Vec<String> = active
        .keys()
        .filter(|key| !products.contains_key(*key))
        .cloned()
        .collect();
    orphans.sort();
    orphans
}

/// Checks that every active key is a product key.
///
/// ## Returns
/// * `Ok(())` - Invariant holds
/// * `Err(InvariantViolation::OrphanedItems)` - Lists every orphaned key
pub fn validate_invariant(
    products: &HashMap<String, Product>,
    active: &HashMap<String, ActiveItem>,
) -> Result<(), InvariantViolation> {
    let orphans = find_orphans(products, active);
    if orphans.is_empty() {
        Ok(())
    } else {
        Err(InvariantViolation::OrphanedItems(orphans))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
