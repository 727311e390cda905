//! # Manager Errors
//!
//! Everything the manager can fail with, plus a flat [`ErrorKind`] the
//! transport matches on.
//!
//! ```text
//! ManagerError
//! ├── Core(CoreError)
//! │   ├── InvalidArgument(..)   → ErrorKind::InvalidArgument
//! │   ├── Invariant(..)         → ErrorKind::InvariantViolation
//! │   └── MalformedRecord{..}   → ErrorKind::Failure
//! └── Store(StoreError)         → ErrorKind::Failure
//! ```

use shoplist_core::{CoreError, InvariantViolation, ValidationError};
use shoplist_store::StoreError;
use thiserror::Error;

/// State manager errors.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Domain rule failure (bad input, invariant, malformed stored record).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification used by the command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input rejected before any state change.
    InvalidArgument,
    /// The active list would reference (or references) an unknown product.
    InvariantViolation,
    /// Anything else: storage unavailable, bad stored data, version mismatch.
    Failure,
}

impl ManagerError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagerError::Core(CoreError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            ManagerError::Core(CoreError::Invariant(_)) => ErrorKind::InvariantViolation,
            ManagerError::Core(CoreError::MalformedRecord { .. }) => ErrorKind::Failure,
            ManagerError::Store(_) => ErrorKind::Failure,
        }
    }

    /// Returns the invariant violation, if that is what this error is.
    pub fn as_invariant(&self) -> Option<&InvariantViolation> {
        match self {
            ManagerError::Core(CoreError::Invariant(violation)) => Some(violation),
            _ => None,
        }
    }
}

impl From<ValidationError> for ManagerError {
    fn from(err: ValidationError) -> Self {
        ManagerError::Core(err.into())
    }
}

impl From<InvariantViolation> for ManagerError {
    fn from(err: InvariantViolation) -> Self {
        ManagerError::Core(err.into())
    }
}

/// Result type alias for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;
