//! Data-access layer between an inspection UI and an object-store engine.
//!
//! [`Explorer`] discovers databases and stores, reads schemas, runs
//! filtered, sorted and paginated reads, and performs single-record
//! mutations. It owns no data: every call goes to the engine, through a
//! [`ConnectionCache`] for queries and mutations, or through short-lived
//! connections for enumeration and schema listing.

mod cache;
mod enumerate;
mod mutate;
mod query;
mod schema;
pub mod search;
pub mod sort;
mod types;

use std::sync::Arc;

pub use cache::ConnectionCache;
pub use mutate::derive_key;
pub use query::paginate;
pub use types::{
    DEFAULT_LIMIT, DEFAULT_SAMPLE_SIZE, DatabaseDescriptor, Direction, IndexDescriptor, PageInfo,
    QueryOptions, QueryResult, StoreSchema,
};

use serde_json::Value;

use crate::engine::Engine;
use crate::error::{Error, Result};

/// Tunables of an [`Explorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Page size when a query names none.
    pub default_limit: usize,
    /// Sample size when a sample request names none.
    pub sample_size: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Browse and edit the databases of an engine.
pub struct Explorer<E: Engine> {
    engine: Arc<E>,
    cache: ConnectionCache<E::Connection>,
    config: ExplorerConfig,
}

impl<E: Engine> Explorer<E> {
    pub fn new(engine: E) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<E>) -> Self {
        Self {
            engine,
            cache: ConnectionCache::new(),
            config: ExplorerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExplorerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn config(&self) -> ExplorerConfig {
        self.config
    }

    /// Number of databases with a cached open connection.
    pub fn cached_connections(&self) -> usize {
        self.cache.len()
    }

    /// Close every cached connection.
    pub fn close_all(&self) {
        self.cache.close_all();
    }

    fn connection(&self, database: &str) -> Result<Arc<E::Connection>> {
        Ok(self
            .cache
            .open(database, |name| self.engine.open_database(name))?)
    }
}

impl<E: Engine> Drop for Explorer<E> {
    fn drop(&mut self) {
        self.cache.close_all();
    }
}

pub(crate) fn require_database(database: &str) -> Result<()> {
    if database.is_empty() {
        return Err(Error::invalid_argument("Database name is required"));
    }
    Ok(())
}

pub(crate) fn require_store(database: &str, store: &str) -> Result<()> {
    if database.is_empty() || store.is_empty() {
        return Err(Error::invalid_argument(
            "Database name and store name are required",
        ));
    }
    Ok(())
}

pub(crate) fn require_record(database: &str, store: &str, record: &Value) -> Result<()> {
    if database.is_empty() || store.is_empty() || record.is_null() {
        return Err(Error::invalid_argument(
            "Database name, store name, and record are required",
        ));
    }
    Ok(())
}

pub(crate) fn require_key(database: &str, store: &str) -> Result<()> {
    if database.is_empty() || store.is_empty() {
        return Err(Error::invalid_argument(
            "Database name, store name, and key are required",
        ));
    }
    Ok(())
}
