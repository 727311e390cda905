//! # WebSocket Protocol Messages
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CLIENT ───► { "id": 7, "type": "shopping_list_manager/set_qty",       │
//! │                "key": "milk", "qty": 3 }                                │
//! │  SERVER ◄─── { "id": 7, "type": "result", "success": true,             │
//! │                "result": { "success": true } }                          │
//! │                                                                         │
//! │  CLIENT ───► { "id": 8, "type": "shopping_list_manager/set_qty",       │
//! │                "key": "ghost", "qty": 1 }                               │
//! │  SERVER ◄─── { "id": 8, "type": "result", "success": false,            │
//! │                "error": { "code": "invariant_violation", ... } }        │
//! │                                                                         │
//! │  CLIENT ───► { "id": 9, "type": "shopping_list_manager/subscribe" }    │
//! │  SERVER ◄─── { "id": 9, "type": "result", "success": true, ... }       │
//! │  SERVER ◄─── { "id": 9, "type": "event",                               │
//! │                "event": { "event_type": "shopping_list_manager_updated" } }
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are parsed in two steps so that an unknown `type` and a known
//! `type` with bad fields get different error codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shoplist_core::{DEFAULT_CATEGORY, DEFAULT_UNIT};
use shoplist_manager::ListEvent;

use crate::error::{ApiError, ErrorCode};

/// Prefix shared by every command type.
pub const COMMAND_PREFIX: &str = "shopping_list_manager/";

/// Every accepted `type` value.
pub const COMMAND_TYPES: [&str; 7] = [
    "shopping_list_manager/add_product",
    "shopping_list_manager/set_qty",
    "shopping_list_manager/get_products",
    "shopping_list_manager/get_active",
    "shopping_list_manager/delete_product",
    "shopping_list_manager/get_state",
    "shopping_list_manager/subscribe",
];

// =============================================================================
// Requests
// =============================================================================

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// A command, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "shopping_list_manager/add_product")]
    AddProduct {
        key: String,
        name: String,
        #[serde(default = "default_category")]
        category: String,
        #[serde(default = "default_unit")]
        unit: String,
        #[serde(default)]
        image: String,
    },

    #[serde(rename = "shopping_list_manager/set_qty")]
    SetQty { key: String, qty: i64 },

    #[serde(rename = "shopping_list_manager/get_products")]
    GetProducts,

    #[serde(rename = "shopping_list_manager/get_active")]
    GetActive,

    #[serde(rename = "shopping_list_manager/delete_product")]
    DeleteProduct { key: String },

    #[serde(rename = "shopping_list_manager/get_state")]
    GetState,

    #[serde(rename = "shopping_list_manager/subscribe")]
    Subscribe,
}

impl Command {
    /// Short command name, as used in `<name>_failed` codes and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddProduct { .. } => "add_product",
            Command::SetQty { .. } => "set_qty",
            Command::GetProducts => "get_products",
            Command::GetActive => "get_active",
            Command::DeleteProduct { .. } => "delete_product",
            Command::GetState => "get_state",
            Command::Subscribe => "subscribe",
        }
    }

    /// Error code used when the manager fails this command.
    pub fn failure_code(&self) -> ErrorCode {
        match self {
            Command::AddProduct { .. } => ErrorCode::AddProductFailed,
            Command::SetQty { .. } => ErrorCode::SetQtyFailed,
            Command::GetProducts => ErrorCode::GetProductsFailed,
            Command::GetActive => ErrorCode::GetActiveFailed,
            Command::DeleteProduct { .. } => ErrorCode::DeleteProductFailed,
            Command::GetState => ErrorCode::GetStateFailed,
            Command::Subscribe => ErrorCode::SubscribeFailed,
        }
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: u64,
    pub command: Command,
}

/// A request that could not be parsed, with its id when one was readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub id: Option<u64>,
    pub error: ApiError,
}

impl Request {
    /// Parses and shape-checks one incoming text frame.
    pub fn parse(text: &str) -> Result<Request, Rejected> {
        let value: Value = serde_json::from_str(text).map_err(|e| Rejected {
            id: None,
            error: ApiError::invalid_format(format!("Invalid JSON: {e}")),
        })?;

        let Some(object) = value.as_object() else {
            return Err(Rejected {
                id: None,
                error: ApiError::invalid_format("Message must be a JSON object"),
            });
        };

        let id = object.get("id").and_then(Value::as_u64);
        let reject = |error: ApiError| Rejected { id, error };

        let Some(id) = id else {
            return Err(reject(ApiError::invalid_format("Missing or invalid field 'id'")));
        };

        let command_type = match object.get("type") {
            Some(Value::String(command_type)) => command_type.as_str(),
            _ => return Err(reject(ApiError::invalid_format("Missing or invalid field 'type'"))),
        };
        if !COMMAND_TYPES.contains(&command_type) {
            return Err(reject(ApiError::unknown_command(command_type)));
        }

        let command: Command = serde_json::from_value(value)
            .map_err(|e| reject(ApiError::invalid_format(e.to_string())))?;

        if let Command::SetQty { qty, .. } = &command {
            if *qty < 0 {
                return Err(reject(ApiError::invalid_format(format!(
                    "qty cannot be negative: {qty}"
                ))));
            }
        }

        Ok(Request { id, command })
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Payload of an event message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    pub event_type: &'static str,
}

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Answer to one request.
    Result {
        id: Option<u64>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ApiError>,
    },

    /// Pushed to subscribers, tagged with the subscribe request's id.
    Event { id: u64, event: EventPayload },
}

impl OutgoingMessage {
    /// Creates a successful result.
    pub fn success(id: u64, result: Value) -> Self {
        OutgoingMessage::Result {
            id: Some(id),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(id: Option<u64>, error: ApiError) -> Self {
        OutgoingMessage::Result {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    /// Creates an event message for a subscription.
    pub fn event(id: u64, event: ListEvent) -> Self {
        OutgoingMessage::Event {
            id,
            event: EventPayload {
                event_type: event.event_type(),
            },
        }
    }
}
