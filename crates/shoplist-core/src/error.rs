//! # Error Types
//!
//! Domain-specific error types for shoplist-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shoplist-core errors (this file)                                      │
//! │  ├── CoreError           - General domain errors                       │
//! │  ├── ValidationError     - Caller input rejected before any change     │
//! │  └── InvariantViolation  - Active list would reference unknown product │
//! │                                                                         │
//! │  shoplist-store errors (separate crate)                                │
//! │  └── StoreError          - Persistence failures                        │
//! │                                                                         │
//! │  shoplist-server errors (in app)                                       │
//! │  └── ApiError            - What WebSocket clients see (serialized)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ManagerError → ApiError → Client  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the offending key(s) in every message
//! 3. Errors are enum variants, never String
//! 4. The invariant gets its own type so callers can tell it apart

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Caller input is malformed (negative or zero quantity).
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// The catalog/active invariant would be, or already is, broken.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// A stored record could not be turned back into an entity.
    ///
    /// ## When This Occurs
    /// - Storage document edited by hand with a missing field
    /// - A field has the wrong primitive type
    /// - An active item was stored with a non-positive quantity
    #[error("Malformed {entity} record '{key}': {reason}")]
    MalformedRecord {
        entity: &'static str,
        key: String,
        reason: String,
    },
}

impl CoreError {
    /// Creates a MalformedRecord error.
    pub fn malformed(entity: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::MalformedRecord {
            entity,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Invariant Violation
// =============================================================================

/// The active list references products that are not in the catalog.
///
/// ## Two Faces of the Same Rule
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Write path: set_qty("ghost", 3)                                        │
/// │       └── UnknownProduct("ghost")  → expected, shown to the user       │
/// │           ("add the product first")                                     │
/// │                                                                         │
/// │  Read path: get_full_state()                                            │
/// │       └── OrphanedItems([...])     → internal corruption               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A quantity was requested for a key that is not in the catalog.
    #[error("Cannot set quantity for unknown product '{0}'. Product must be created first with add_product.")]
    UnknownProduct(String),

    /// Active entries whose keys have no catalog product (sorted).
    #[error("Active list references {} unknown product(s): {}", .0.len(), .0.join(", "))]
    OrphanedItems(Vec<String>),
}

impl InvariantViolation {
    /// Returns the offending key(s).
    pub fn keys(&self) -> Vec<&str> {
        match self {
            InvariantViolation::UnknownProduct(key) => vec![key.as_str()],
            InvariantViolation::OrphanedItems(keys) => keys.iter().map(String::as_str).collect(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Value must not be negative.
    #[error("{field} cannot be negative: {value}")]
    Negative { field: String, value: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
