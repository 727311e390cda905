//! # Command Dispatcher
//!
//! Turns one parsed [`Command`] into one manager call and the manager's
//! answer into a JSON payload or an [`ApiError`].
//!
//! ## Command Table
//! ```text
//! ┌──────────────────┬──────────────────────────────┬───────────────────────────┐
//! │ Command          │ Manager call                 │ Success payload           │
//! ├──────────────────┼──────────────────────────────┼───────────────────────────┤
//! │ add_product      │ upsert_product(..)           │ product record            │
//! │ set_qty          │ set_qty(key, qty)            │ {"success": true}         │
//! │ get_products     │ get_products()               │ key → product record      │
//! │ get_active       │ get_active()                 │ key → {"qty": n}          │
//! │ delete_product   │ delete_product(key)          │ {"success": true}         │
//! │ get_state        │ get_full_state()             │ {products, active_list}   │
//! │ subscribe        │ (connection keeps a receiver)│ {"success": true}         │
//! └──────────────────┴──────────────────────────────┴───────────────────────────┘
//! ```

use serde_json::{json, Value};
use shoplist_manager::ShoppingListManager;
use tracing::debug;

use crate::error::ApiError;
use crate::protocol::{Command, OutgoingMessage, Request};

/// Result of handling one incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
    /// Message to send back.
    pub reply: OutgoingMessage,

    /// Set when the frame was a successful subscribe: the request id to tag
    /// events with.
    pub subscription: Option<u64>,
}

/// Runs one command against the manager.
pub async fn dispatch(manager: &ShoppingListManager, command: &Command) -> Result<Value, ApiError> {
    let outcome = match command {
        Command::AddProduct {
            key,
            name,
            category,
            unit,
            image,
        } => manager
            .upsert_product(key, name, category, unit, image)
            .await
            .map(|product| Value::Object(product.to_map())),

        Command::SetQty { key, qty } => manager
            .set_qty(key, *qty)
            .await
            .map(|()| json!({ "success": true })),

        Command::GetProducts => Ok(Value::Object(manager.get_products().await)),

        Command::GetActive => Ok(Value::Object(manager.get_active().await)),

        Command::DeleteProduct { key } => manager
            .delete_product(key)
            .await
            .map(|()| json!({ "success": true })),

        Command::GetState => manager.get_full_state().await.map(|state| {
            json!({
                "products": state.products,
                "active_list": state.active_list,
            })
        }),

        Command::Subscribe => Ok(json!({ "success": true })),
    };

    outcome.map_err(|e| ApiError::from_manager(command, e))
}

/// Parses, dispatches and wraps one text frame.
pub async fn handle_message(manager: &ShoppingListManager, text: &str) -> Handled {
    let request = match Request::parse(text) {
        Ok(request) => request,
        Err(rejected) => {
            debug!(id = ?rejected.id, code = ?rejected.error.code, "Rejected request");
            return Handled {
                reply: OutgoingMessage::failure(rejected.id, rejected.error),
                subscription: None,
            };
        }
    };

    debug!(id = request.id, command = request.command.name(), "Dispatching command");

    match dispatch(manager, &request.command).await {
        Ok(result) => Handled {
            reply: OutgoingMessage::success(request.id, result),
            subscription: matches!(request.command, Command::Subscribe).then_some(request.id),
        },
        Err(error) => Handled {
            reply: OutgoingMessage::failure(Some(request.id), error),
            subscription: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use shoplist_manager::EventBus;
    use shoplist_store::MemoryBackend;
    use std::sync::Arc;

    async fn manager() -> (Arc<MemoryBackend>, ShoppingListManager) {
        let backend = Arc::new(MemoryBackend::new());
        let manager = ShoppingListManager::new(backend.clone(), EventBus::default());
        manager.load().await.unwrap();
        (backend, manager)
    }

    async fn send(manager: &ShoppingListManager, request: Value) -> Value {
        let handled = handle_message(manager, &request.to_string()).await;
        serde_json::to_value(handled.reply).unwrap()
    }

    #[tokio::test]
    async fn test_guarded_quantity_flow() {
        let (_, manager) = manager().await;

        let reply = send(
            &manager,
            json!({ "id": 1, "type": "shopping_list_manager/set_qty", "key": "ghost", "qty": 3 }),
        )
        .await;
        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"]["code"], "invariant_violation");

        let reply = send(
            &manager,
            json!({ "id": 2, "type": "shopping_list_manager/add_product", "key": "milk", "name": "Milk" }),
        )
        .await;
        assert_eq!(
            reply,
            json!({
                "id": 2,
                "type": "result",
                "success": true,
                "result": { "key": "milk", "name": "Milk", "category": "other", "unit": "pcs", "image": "" }
            })
        );

        let reply = send(
            &manager,
            json!({ "id": 3, "type": "shopping_list_manager/set_qty", "key": "milk", "qty": 3 }),
        )
        .await;
        assert_eq!(reply["result"], json!({ "success": true }));

        let reply = send(&manager, json!({ "id": 4, "type": "shopping_list_manager/get_active" })).await;
        assert_eq!(reply["result"], json!({ "milk": { "qty": 3 } }));
    }

    #[tokio::test]
    async fn test_get_state_and_delete() {
        let (_, manager) = manager().await;
        manager.upsert_product("milk", "Milk", "dairy", "l", "").await.unwrap();
        manager.set_qty("milk", 1).await.unwrap();

        let reply = send(&manager, json!({ "id": 1, "type": "shopping_list_manager/get_state" })).await;
        assert_eq!(reply["result"]["active_list"], json!({ "milk": { "qty": 1 } }));
        assert_eq!(reply["result"]["products"]["milk"]["category"], "dairy");

        let reply = send(
            &manager,
            json!({ "id": 2, "type": "shopping_list_manager/delete_product", "key": "milk" }),
        )
        .await;
        assert_eq!(reply["result"], json!({ "success": true }));

        let reply = send(&manager, json!({ "id": 3, "type": "shopping_list_manager/get_products" })).await;
        assert_eq!(reply["result"], json!({}));

        // Deleting again is still a success.
        let reply = send(
            &manager,
            json!({ "id": 4, "type": "shopping_list_manager/delete_product", "key": "milk" }),
        )
        .await;
        assert_eq!(reply["success"], true);
    }

    #[tokio::test]
    async fn test_negative_qty_never_reaches_manager() {
        let (_, manager) = manager().await;
        manager.upsert_product("milk", "Milk", "other", "pcs", "").await.unwrap();
        manager.set_qty("milk", 2).await.unwrap();

        let reply = send(
            &manager,
            json!({ "id": 1, "type": "shopping_list_manager/set_qty", "key": "milk", "qty": -4 }),
        )
        .await;
        assert_eq!(reply["error"]["code"], "invalid_format");
        assert_eq!(manager.get_active_qty("milk"), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_command_failed() {
        let (backend, manager) = manager().await;
        backend.set_read_only(true);

        let reply = send(
            &manager,
            json!({ "id": 1, "type": "shopping_list_manager/add_product", "key": "milk", "name": "Milk" }),
        )
        .await;
        assert_eq!(reply["error"]["code"], "add_product_failed");
        assert!(reply["error"]["message"].as_str().unwrap().contains("read-only"));
    }

    #[tokio::test]
    async fn test_empty_name_is_stored_as_given() {
        let (_, manager) = manager().await;
        let reply = send(
            &manager,
            json!({ "id": 1, "type": "shopping_list_manager/add_product", "key": "milk", "name": "" }),
        )
        .await;
        assert_eq!(reply["success"], true);
        assert_eq!(reply["result"]["name"], "");
        assert_eq!(manager.get_product("milk").map(|p| p.name), Some(String::new()));
    }

    #[tokio::test]
    async fn test_subscribe_reports_subscription_id() {
        let (_, manager) = manager().await;

        let handled =
            handle_message(&manager, r#"{"id": 42, "type": "shopping_list_manager/subscribe"}"#).await;
        assert_eq!(handled.subscription, Some(42));

        let handled =
            handle_message(&manager, r#"{"id": 43, "type": "shopping_list_manager/get_active"}"#).await;
        assert_eq!(handled.subscription, None);
    }

    #[tokio::test]
    async fn test_unparseable_frame_is_answered() {
        let (_, manager) = manager().await;
        let handled = handle_message(&manager, "{").await;
        assert!(matches!(
            handled.reply,
            OutgoingMessage::Result { id: None, success: false, error: Some(ApiError { code: ErrorCode::InvalidFormat, .. }), .. }
        ));
    }
}
