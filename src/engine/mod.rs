//! Object-store engine abstraction.
//!
//! The explorer never owns data. It talks to an engine that exposes named
//! databases, each holding object stores with an optional key path, an
//! optional key generator and secondary indexes. [`Engine`], [`Connection`]
//! and [`StoreTransaction`] are the seams; [`FjallEngine`] is the persistent
//! implementation shipped with the crate.

pub mod codec;
mod error;
#[cfg(feature = "kv")]
mod catalog;
#[cfg(feature = "kv")]
mod fjall_store;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{Key, KeyPath};

pub use error::EngineError;
#[cfg(feature = "kv")]
pub use fjall_store::{FjallConnection, FjallEngine, FjallTransaction};

/// Name and version of a database as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: u64,
}

/// Declared shape of an object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDefinition {
    pub name: String,
    pub key_path: Option<KeyPath>,
    pub auto_increment: bool,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl StoreDefinition {
    /// A store with out-of-line keys and no key generator.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            auto_increment: false,
            indexes: Vec::new(),
        }
    }

    pub fn key_path(mut self, key_path: KeyPath) -> Self {
        self.key_path = Some(key_path);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Declared secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub key_path: KeyPath,
    pub unique: bool,
    pub multi_entry: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, key_path: KeyPath) -> Self {
        Self {
            name: name.into(),
            key_path,
            unique: false,
            multi_entry: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn multi_entry(mut self) -> Self {
        self.multi_entry = true;
        self
    }

    /// Keys this index holds for `record`.
    ///
    /// A multi-entry index over an array contributes one key per distinct
    /// valid element; otherwise the evaluated value must itself be a key.
    pub fn keys_for(&self, record: &Value) -> Vec<Key> {
        let Some(value) = self.key_path.evaluate(record) else {
            return Vec::new();
        };
        match (&value, self.multi_entry, &self.key_path) {
            (Value::Array(items), true, KeyPath::Single(_)) => {
                let mut keys: Vec<Key> = items.iter().filter_map(Key::from_value).collect();
                keys.sort();
                keys.dedup();
                keys
            }
            _ => Key::from_value(&value).into_iter().collect(),
        }
    }
}

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// Entry point of an object-store engine.
pub trait Engine: Send + Sync {
    type Connection: Connection;

    /// Enumerate databases. Engines without an enumeration capability
    /// return [`EngineError::Unsupported`].
    fn databases(&self) -> Result<Vec<DatabaseInfo>, EngineError>;

    /// Open a database at its current version.
    fn open_database(&self, name: &str) -> Result<Self::Connection, EngineError>;
}

/// An open database handle.
pub trait Connection: Send + Sync {
    type Transaction<'a>: StoreTransaction
    where
        Self: 'a;

    fn name(&self) -> &str;

    fn version(&self) -> Result<u64, EngineError>;

    /// Store names in ascending order.
    fn store_names(&self) -> Result<Vec<String>, EngineError>;

    /// Start a transaction scoped to one store.
    fn transaction(
        &self,
        store: &str,
        mode: TransactionMode,
    ) -> Result<Self::Transaction<'_>, EngineError>;

    /// Close the handle. Closing twice is a no-op.
    fn close(&self) -> Result<(), EngineError>;
}

/// A transaction over a single object store.
///
/// Dropping a transaction releases it.
pub trait StoreTransaction {
    fn definition(&self) -> &StoreDefinition;

    fn count(&self) -> Result<u64, EngineError>;

    /// All records in primary-key order.
    fn get_all(&self) -> Result<Vec<Value>, EngineError>;

    /// All records reachable through an index, in index order.
    fn get_all_by_index(&self, index: &str) -> Result<Vec<Value>, EngineError>;

    fn get(&self, key: &Key) -> Result<Option<Value>, EngineError>;

    /// Insert a record; fails if the key is taken.
    fn add(&mut self, record: Value, key: Option<Key>) -> Result<Key, EngineError>;

    /// Insert or replace a record.
    fn put(&mut self, record: Value, key: Option<Key>) -> Result<Key, EngineError>;

    /// Delete the record under `key`. Deleting a missing key succeeds.
    fn delete(&mut self, key: &Key) -> Result<(), EngineError>;

    /// Make the transaction's writes durable.
    fn commit(self) -> Result<(), EngineError>
    where
        Self: Sized;
}
