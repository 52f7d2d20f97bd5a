//! Single-record create, read, update and delete.

use serde_json::Value;

use super::{Explorer, require_key, require_record};
use crate::engine::{
    Connection, Engine, EngineError, StoreDefinition, StoreTransaction, TransactionMode,
};
use crate::error::Result;
use crate::logging::debug;
use crate::value::Key;

/// The primary key identifying `record` in a store.
///
/// With a single key path the key is read from the record; with a compound
/// key path it is the ordered array of the component values; without a key
/// path the record itself is the key.
pub fn derive_key(definition: &StoreDefinition, record: &Value) -> std::result::Result<Key, EngineError> {
    match &definition.key_path {
        Some(path) => path.extract_key(record).ok_or_else(|| {
            EngineError::Data(format!("Record has no valid key at key path {}", path))
        }),
        None => Key::from_value(record)
            .ok_or_else(|| EngineError::Data(format!("{} is not a valid key", record))),
    }
}

impl<E: Engine> Explorer<E> {
    /// Insert a record and return its key.
    ///
    /// `key` is only accepted by stores with out-of-line keys.
    pub fn create(
        &self,
        database: &str,
        store: &str,
        record: Value,
        key: Option<Key>,
    ) -> Result<Key> {
        require_record(database, store, &record)?;
        let connection = self.connection(database)?;
        let mut tx = connection.transaction(store, TransactionMode::ReadWrite)?;
        let key = tx.add(record, key)?;
        tx.commit()?;
        debug!(database, store, %key, "created record");
        Ok(key)
    }

    /// Insert or replace a record.
    pub fn update(
        &self,
        database: &str,
        store: &str,
        record: Value,
        key: Option<Key>,
    ) -> Result<Key> {
        require_record(database, store, &record)?;
        let connection = self.connection(database)?;
        let mut tx = connection.transaction(store, TransactionMode::ReadWrite)?;
        let key = tx.put(record, key)?;
        tx.commit()?;
        debug!(database, store, %key, "updated record");
        Ok(key)
    }

    /// Delete the record identified by `record`'s key (see [`derive_key`]).
    pub fn delete(&self, database: &str, store: &str, record: &Value) -> Result<()> {
        require_record(database, store, record)?;
        let connection = self.connection(database)?;
        let mut tx = connection.transaction(store, TransactionMode::ReadWrite)?;
        let key = derive_key(tx.definition(), record)?;
        tx.delete(&key)?;
        tx.commit()?;
        debug!(database, store, %key, "deleted record");
        Ok(())
    }

    /// Fetch one record by key.
    pub fn get_one(&self, database: &str, store: &str, key: &Key) -> Result<Option<Value>> {
        require_key(database, store)?;
        let connection = self.connection(database)?;
        let tx = connection.transaction(store, TransactionMode::ReadOnly)?;
        Ok(tx.get(key)?)
    }
}
