//! Unified error type for the idb-explorer library.
//!
//! [`Error`] wraps engine failures and argument validation failures, and
//! classifies every error into an [`ErrorKind`] so callers (the request
//! dispatcher, the HTTP server, the CLI) can react to the class of failure
//! without matching on engine internals.

use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;

/// Unified error type for all explorer operations.
///
/// # Example
///
/// ```ignore
/// use idb_explorer::{Explorer, FjallEngine, Result};
///
/// fn count(explorer: &Explorer<FjallEngine>) -> Result<u64> {
///     Ok(explorer.store_schema("app", "users")?.record_count)
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was missing or empty.
    #[error("{0}")]
    InvalidArgument(String),

    /// Error reported by the object-store engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    StoreNotFound,
    DatabaseBlocked,
    ConstraintViolation,
    DataError,
    EngineIo,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::StoreNotFound => "STORE_NOT_FOUND",
            Self::DatabaseBlocked => "DATABASE_BLOCKED",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::DataError => "DATA_ERROR",
            Self::EngineIo => "ENGINE_IO",
        }
    }
}

impl Error {
    /// Create an invalid argument error from a message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Engine(err) => match err {
                EngineError::StoreNotFound { .. }
                | EngineError::IndexNotFound { .. }
                | EngineError::DatabaseNotFound(_) => ErrorKind::StoreNotFound,
                EngineError::Blocked(_) => ErrorKind::DatabaseBlocked,
                EngineError::Constraint(_) => ErrorKind::ConstraintViolation,
                EngineError::Data(_) | EngineError::ReadOnly(_) => ErrorKind::DataError,
                _ => ErrorKind::EngineIo,
            },
            Self::Json(_) => ErrorKind::DataError,
            Self::Io(_) => ErrorKind::EngineIo,
        }
    }

    /// Returns `true` if a required argument was missing.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// Returns `true` if the named store (or database) does not exist.
    pub fn is_store_not_found(&self) -> bool {
        self.kind() == ErrorKind::StoreNotFound
    }

    /// Returns `true` if a key or unique index constraint was violated.
    pub fn is_constraint_violation(&self) -> bool {
        self.kind() == ErrorKind::ConstraintViolation
    }

    /// Returns `true` if the record or key was malformed.
    pub fn is_data_error(&self) -> bool {
        self.kind() == ErrorKind::DataError
    }

    /// Returns `true` if the database is blocked by open connections.
    pub fn is_blocked(&self) -> bool {
        self.kind() == ErrorKind::DatabaseBlocked
    }
}
