//! Error types for the object-store engine.

use thiserror::Error;

/// Errors reported by an object-store engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "kv")]
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Object store '{store}' not found in database '{database}'")]
    StoreNotFound { database: String, store: String },

    #[error("Index '{index}' not found on object store '{store}'")]
    IndexNotFound { store: String, index: String },

    #[error("Database '{0}' is blocked by open connections")]
    Blocked(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Transaction is read-only: {0}")]
    ReadOnly(String),

    #[error("Connection to database '{0}' is closed")]
    Closed(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl EngineError {
    pub(crate) fn store_not_found(database: &str, store: &str) -> Self {
        Self::StoreNotFound {
            database: database.to_string(),
            store: store.to_string(),
        }
    }
}
