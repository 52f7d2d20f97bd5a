//! Convenient re-exports for common usage patterns.
//!
//! ```ignore
//! use idb_explorer::prelude::*;
//!
//! let explorer = Explorer::new(FjallEngine::init(Path::new(".idb-explorer"))?);
//! for database in explorer.list_databases() {
//!     println!("{} ({} stores)", database.name, database.store_count);
//! }
//! ```

// Unified error handling
pub use crate::error::{Error, ErrorKind, Result};

// Engine seams
pub use crate::engine::{
    Connection, DatabaseInfo, Engine, EngineError, IndexDefinition, StoreDefinition,
    StoreTransaction, TransactionMode,
};

// Persistent engine (requires "kv" feature)
#[cfg(feature = "kv")]
pub use crate::engine::FjallEngine;

// Data-access layer
pub use crate::explorer::{
    DatabaseDescriptor, Direction, Explorer, ExplorerConfig, PageInfo, QueryOptions, QueryResult,
    StoreSchema,
};
pub use crate::protocol::{Request, Response};
pub use crate::value::{Key, KeyPath, Record, ValueKind};

// Dependency re-exports
pub use serde_json::{Value, json};
pub use std::path::Path;
