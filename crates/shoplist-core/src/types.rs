//! # Domain Types
//!
//! The two entities of the shopping list.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐          ┌─────────────────────┐              │
//! │  │      Product        │          │     ActiveItem      │              │
//! │  │  ─────────────────  │  1 ── 0..1  ─────────────────  │              │
//! │  │  key (immutable)    │◄─────────│  qty (> 0)          │              │
//! │  │  name               │  same key│                     │              │
//! │  │  category ("other") │          │  keyed by product   │              │
//! │  │  unit ("pcs")       │          │  key in the active  │              │
//! │  │  image ("")         │          │  table              │              │
//! │  └─────────────────────┘          └─────────────────────┘              │
//! │     catalog: persistent              active list: ephemeral            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Record Form
//! Both entities convert to and from a flat [`RecordMap`] of primitive
//! fields. The same form is written to storage and sent to clients:
//! ```json
//! { "key": "milk", "name": "Milk", "category": "dairy", "unit": "pcs", "image": "" }
//! { "qty": 2 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{DEFAULT_CATEGORY, DEFAULT_UNIT};

/// Flat mapping of field name to primitive value.
pub type RecordMap = serde_json::Map<String, Value>;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique, caller-chosen identifier. Never changes once created.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Free-form classification (e.g. "dairy").
    #[serde(default = "default_category")]
    pub category: String,

    /// Unit of measure (e.g. "pcs", "kg").
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Image URL or reference; empty when unset.
    #[serde(default)]
    pub image: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

impl Product {
    /// Creates a product with default category, unit and image.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Product {
            key: key.into(),
            name: name.into(),
            category: default_category(),
            unit: default_unit(),
            image: String::new(),
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the unit of measure.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets the image reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Converts the product to its flat record form.
    pub fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("key".into(), Value::String(self.key.clone()));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("category".into(), Value::String(self.category.clone()));
        map.insert("unit".into(), Value::String(self.unit.clone()));
        map.insert("image".into(), Value::String(self.image.clone()));
        map
    }

    /// Rebuilds a product from its flat record form.
    ///
    /// ## Rules
    /// - `key` and `name` are required strings
    /// - `category`, `unit`, `image` fall back to their defaults when absent
    /// - Any present field with a non-string value is rejected
    pub fn from_map(map: &RecordMap) -> CoreResult<Self> {
        let label = match map.get("key") {
            Some(Value::String(key)) => key.clone(),
            _ => "<unknown>".to_string(),
        };

        let key = string_field(map, "product", &label, "key")?
            .ok_or_else(|| CoreError::malformed("product", &label, "missing field 'key'"))?;
        let name = string_field(map, "product", &label, "name")?
            .ok_or_else(|| CoreError::malformed("product", &label, "missing field 'name'"))?;

        Ok(Product {
            key,
            name,
            category: string_field(map, "product", &label, "category")?
                .unwrap_or_else(default_category),
            unit: string_field(map, "product", &label, "unit")?.unwrap_or_else(default_unit),
            image: string_field(map, "product", &label, "image")?.unwrap_or_default(),
        })
    }
}

// =============================================================================
// Active Item
// =============================================================================

/// An entry on the active shopping list.
///
/// The key lives in the active table, not in the item. The quantity is
/// always positive: a quantity of zero means the entry does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ActiveItem {
    qty: i64,
}

impl ActiveItem {
    /// Creates an active item, rejecting non-positive quantities.
    pub fn new(qty: i64) -> Result<Self, ValidationError> {
        if qty <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "qty".to_string(),
            });
        }
        Ok(ActiveItem { qty })
    }

    /// Returns the quantity.
    #[inline]
    pub const fn qty(&self) -> i64 {
        self.qty
    }

    /// Converts the item to its flat record form (`{"qty": n}`).
    pub fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("qty".into(), Value::from(self.qty));
        map
    }

    /// Rebuilds an item from its flat record form.
    ///
    /// `key` is only used to give context in errors.
    pub fn from_map(key: &str, map: &RecordMap) -> CoreResult<Self> {
        let qty = match map.get("qty") {
            Some(value) => value.as_i64().ok_or_else(|| {
                CoreError::malformed("active item", key, format!("field 'qty' must be an integer, got {value}"))
            })?,
            None => return Err(CoreError::malformed("active item", key, "missing field 'qty'")),
        };

        ActiveItem::new(qty).map_err(|e| CoreError::malformed("active item", key, e.to_string()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Reads an optional string field, rejecting other value types.
fn string_field(
    map: &RecordMap,
    entity: &'static str,
    key: &str,
    field: &str,
) -> CoreResult<Option<String>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CoreError::malformed(
            entity,
            key,
            format!("field '{field}' must be a string, got {other}"),
        )),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> RecordMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_product_defaults() {
        let product = Product::new("milk", "Milk");
        assert_eq!(product.category, "other");
        assert_eq!(product.unit, "pcs");
        assert_eq!(product.image, "");
    }

    #[test]
    fn test_product_round_trip() {
        let product = Product::new("milk", "Milk")
            .with_category("dairy")
            .with_unit("l")
            .with_image("/local/milk.png");

        let map = product.to_map();
        assert_eq!(map.get("category"), Some(&json!("dairy")));
        assert_eq!(Product::from_map(&map).unwrap(), product);
    }

    #[test]
    fn test_product_from_map_fills_defaults() {
        let map = as_map(json!({ "key": "bread", "name": "Bread" }));
        let product = Product::from_map(&map).unwrap();
        assert_eq!(product, Product::new("bread", "Bread"));
    }

    #[test]
    fn test_product_from_map_rejects_missing_name() {
        let map = as_map(json!({ "key": "bread" }));
        let err = Product::from_map(&map).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Malformed product record 'bread': missing field 'name'"
        );
    }

    #[test]
    fn test_product_from_map_rejects_wrong_type() {
        let map = as_map(json!({ "key": "bread", "name": "Bread", "unit": 5 }));
        assert!(matches!(
            Product::from_map(&map),
            Err(CoreError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_product_serde_matches_record_form() {
        let product = Product::new("eggs", "Eggs").with_category("dairy");
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(Value::Object(product.to_map()), value);
    }

    #[test]
    fn test_active_item_round_trip() {
        let item = ActiveItem::new(3).unwrap();
        let map = item.to_map();
        assert_eq!(Value::Object(map.clone()), json!({ "qty": 3 }));
        assert_eq!(ActiveItem::from_map("milk", &map).unwrap(), item);
    }

    #[test]
    fn test_active_item_rejects_non_positive() {
        assert!(ActiveItem::new(0).is_err());
        assert!(ActiveItem::new(-2).is_err());

        let map = as_map(json!({ "qty": 0 }));
        assert!(ActiveItem::from_map("milk", &map).is_err());
    }

    #[test]
    fn test_active_item_rejects_non_integer() {
        let map = as_map(json!({ "qty": "two" }));
        let err = ActiveItem::from_map("milk", &map).unwrap_err();
        assert!(err.to_string().contains("must be an integer"));

        let map = as_map(json!({}));
        assert!(ActiveItem::from_map("milk", &map).is_err());
    }
}
