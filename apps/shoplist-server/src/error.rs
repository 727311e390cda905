//! # Server Error Types
//!
//! Two kinds of failure live here:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ApiError     → goes over the wire inside a "result" message           │
//! │                 { "code": "set_qty_failed", "message": "..." }         │
//! │                                                                         │
//! │  ServerError  → stops the process (bad config, port taken, storage     │
//! │                 cannot be opened, lists cannot be loaded)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io;

use serde::Serialize;
use shoplist_manager::{ErrorKind, ManagerError};
use shoplist_store::StoreError;
use thiserror::Error;
use tracing::error;

use crate::protocol::Command;

// =============================================================================
// Wire Errors
// =============================================================================

/// Error returned to a client in a failed result message.
///
/// ## Serialization
/// ```json
/// { "code": "invariant_violation", "message": "Cannot set quantity for unknown product 'ghost'. ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for result messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request is not valid JSON, lacks `id`/`type`, or has ill-typed fields
    InvalidFormat,

    /// `type` names no known command
    UnknownCommand,

    /// The active list would reference, or references, an unknown product
    InvariantViolation,

    AddProductFailed,
    SetQtyFailed,
    GetProductsFailed,
    GetActiveFailed,
    DeleteProductFailed,
    GetStateFailed,
    SubscribeFailed,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidFormat, message)
    }

    /// Creates an unknown command error.
    pub fn unknown_command(command_type: &str) -> Self {
        ApiError::new(
            ErrorCode::UnknownCommand,
            format!("Unknown command: {command_type}"),
        )
    }

    /// Maps a manager error raised while running `command`.
    ///
    /// Invariant violations keep their own code; everything else becomes
    /// `<command>_failed` with the error's text.
    pub fn from_manager(command: &Command, err: ManagerError) -> Self {
        match err.kind() {
            ErrorKind::InvariantViolation => {
                ApiError::new(ErrorCode::InvariantViolation, err.to_string())
            }
            ErrorKind::InvalidArgument => ApiError::new(command.failure_code(), err.to_string()),
            ErrorKind::Failure => {
                error!(command = command.name(), error = %err, "Command failed");
                ApiError::new(command.failure_code(), err.to_string())
            }
        }
    }
}

// =============================================================================
// Process Errors
// =============================================================================

/// Errors that prevent the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file is not valid TOML for [`ServerConfig`](crate::config::ServerConfig).
    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Could not listen on the configured address.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to load shopping list: {0}")]
    Manager(#[from] ManagerError),
}

/// Result type alias for server startup and serving.
pub type ServerResult<T> = Result<T, ServerError>;
