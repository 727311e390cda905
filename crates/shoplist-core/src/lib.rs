//! # shoplist-core: Domain Model for the Shopping List
//!
//! This crate holds the two entity types of the shopping list and the rule
//! that ties them together. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Shopping List Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Dashboard card / WebSocket clients                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ shopping_list_manager/* commands       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shoplist-manager (State Manager)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ shoplist-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐      ┌─────────────┐      ┌──────────────┐     │   │
//! │  │   │   types   │      │  validation │      │    error     │     │   │
//! │  │   │  Product  │      │  invariant  │      │  CoreError   │     │   │
//! │  │   │ ActiveItem│      │  qty check  │      │              │     │   │
//! │  │   └───────────┘      └─────────────┘      └──────────────┘     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, ActiveItem and their flat record form
//! - [`error`] - Domain error types
//! - [`validation`] - Input checks and the catalog/active invariant
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use shoplist_core::{validate_invariant, ActiveItem, Product};
//!
//! let mut products = HashMap::new();
//! products.insert("milk".to_string(), Product::new("milk", "Milk"));
//!
//! let mut active = HashMap::new();
//! active.insert("milk".to_string(), ActiveItem::new(2).unwrap());
//! assert!(validate_invariant(&products, &active).is_ok());
//!
//! active.insert("ghost".to_string(), ActiveItem::new(1).unwrap());
//! assert!(validate_invariant(&products, &active).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, InvariantViolation, ValidationError};
pub use types::*;
pub use validation::{find_orphans, validate_invariant};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category assigned when the caller does not provide one.
pub const DEFAULT_CATEGORY: &str = "other";

/// Unit of measure assigned when the caller does not provide one.
pub const DEFAULT_UNIT: &str = "pcs";
