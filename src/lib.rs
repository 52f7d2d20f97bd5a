//! Browse, search, sort, paginate and edit object-store databases.
//!
//! The crate is a data-access layer for an inspection UI. It discovers the
//! databases and stores an object-store engine holds, reads their schemas,
//! runs filtered/sorted/paginated reads and performs single-record
//! mutations, all behind a small request/response contract.
//!
//! # Quick Start
//!
//! ```ignore
//! use idb_explorer::prelude::*;
//!
//! let engine = FjallEngine::init(Path::new(".idb-explorer"))?;
//! engine.create_store(
//!     "app",
//!     StoreDefinition::new("users")
//!         .key_path(KeyPath::Single("id".into()))
//!         .auto_increment(),
//! )?;
//!
//! let explorer = Explorer::new(engine);
//! explorer.create("app", "users", json!({"name": "Ada"}), None)?;
//! let page = explorer.query("app", "users", &QueryOptions::new().search("ada"))?;
//! ```
//!
//! # Modules
//!
//! - [`value`] - Keys, key paths and value classification (always available)
//! - [`engine`] - Engine traits, plus the fjall-backed engine (requires `kv` feature)
//! - [`explorer`] - Enumeration, schema reading, queries and mutations
//! - [`protocol`] - The request/response contract
//! - [`server`] - HTTP API server (requires `server` feature)
//!
//! # Feature Flags
//!
//! - `kv` - Enable the fjall-backed engine (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the command-line interface binary
//! - `server` - Enable the HTTP API server
//! - `full` - Enable all features

pub mod engine;
mod error;
pub mod explorer;
mod logging;
pub mod prelude;
pub mod protocol;
#[cfg(feature = "server")]
pub mod server;
pub mod value;

// Re-export the unified error type
pub use error::{Error, ErrorKind, Result};

pub use engine::{
    Connection, DatabaseInfo, Engine, EngineError, IndexDefinition, StoreDefinition,
    StoreTransaction, TransactionMode,
};
#[cfg(feature = "kv")]
pub use engine::{FjallConnection, FjallEngine, FjallTransaction};
pub use explorer::{
    DatabaseDescriptor, Direction, Explorer, ExplorerConfig, PageInfo, QueryOptions, QueryResult,
    StoreSchema,
};
pub use protocol::{Request, Response};
pub use value::{Key, KeyPath, Record, ValueKind};
