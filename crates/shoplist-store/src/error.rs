//! # Store Error Types
//!
//! Error types for document persistence.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / std::io::Error / serde_json::Error                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ManagerError::Store ← Reported as a generic failure                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError "<command>_failed" ← Serialized for the client               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Reading or writing a document file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded or decoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored document was written with another schema version.
    ///
    /// There is no migration path between versions.
    #[error("Document '{key}' has version {found}, expected {expected}")]
    VersionMismatch {
        key: String,
        expected: u32,
        found: u32,
    },

    /// The stored document is not shaped like a document.
    ///
    /// ## When This Occurs
    /// - `data` is not a JSON object
    /// - The file envelope lacks `version` or `data`
    #[error("Malformed document '{key}': {reason}")]
    MalformedDocument { key: String, reason: String },

    /// The storage key cannot be used by this backend.
    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a MalformedDocument error.
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::MalformedDocument {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
/// sqlx::Error::PoolClosed     → StoreError::ConnectionFailed
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
