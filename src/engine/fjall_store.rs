//! Object-store engine backed by fjall.
//!
//! Layout:
//!
//! - `_catalog`: format version, id allocator and one checksummed entry per
//!   database (see [`super::catalog`])
//! - `s{id}`: records of one object store, keyed by [`codec::encode`] of the
//!   primary key, valued by the record's JSON bytes
//! - `x{id}`: entries of one index, keyed by index key followed by primary
//!   key, valued by the encoded primary key

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use fjall::{Keyspace, KeyspaceCreateOptions, OwnedWriteBatch, PersistMode, Readable, Snapshot};
use serde_json::Value;

use super::catalog::{
    self, CONFIG_KEY, DATABASE_PREFIX, DatabaseEntry, FORMAT_VERSION, MAX_GENERATED_KEY,
    NEXT_ID_KEY, StoreEntry,
};
use super::codec;
use super::error::EngineError;
use super::{
    Connection, DatabaseInfo, Engine, IndexDefinition, StoreDefinition, StoreTransaction,
    TransactionMode,
};
use crate::logging::{debug, info, trace};
use crate::value::{Key, KeyPath};

const CATALOG_KEYSPACE: &str = "_catalog";

/// Persistent object-store engine.
///
/// Cloning is cheap; clones share the same database.
#[derive(Clone)]
pub struct FjallEngine {
    shared: Arc<Shared>,
}

struct Shared {
    db: fjall::Database,
    catalog: Keyspace,
    state: RwLock<CatalogState>,
    /// Open connection count per database name.
    connections: Mutex<HashMap<String, usize>>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

struct CatalogState {
    databases: BTreeMap<String, DatabaseEntry>,
    next_id: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FjallEngine {
    /// Open the engine at `path`, initializing a fresh catalog if needed.
    pub fn init(path: &Path) -> Result<Self, EngineError> {
        let db = fjall::Database::builder(path).open()?;
        let catalog = db.keyspace(CATALOG_KEYSPACE, KeyspaceCreateOptions::default)?;

        if let Some(config) = catalog.get(CONFIG_KEY)? {
            let version = u32::from_le_bytes(
                config
                    .as_ref()
                    .try_into()
                    .map_err(|_| EngineError::InvalidFormat("Invalid config format".to_string()))?,
            );
            if version != FORMAT_VERSION {
                return Err(EngineError::InvalidFormat(format!(
                    "Catalog version mismatch: expected {}, got {}",
                    FORMAT_VERSION, version
                )));
            }
        } else {
            catalog.insert(CONFIG_KEY, FORMAT_VERSION.to_le_bytes())?;
            db.persist(PersistMode::SyncAll)?;
        }

        let next_id = match catalog.get(NEXT_ID_KEY)? {
            Some(bytes) => u64::from_le_bytes(
                bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| EngineError::InvalidFormat("Invalid id allocator".to_string()))?,
            ),
            None => 1,
        };

        let mut databases = BTreeMap::new();
        for kv in catalog.prefix(DATABASE_PREFIX) {
            let (_, value) = kv.into_inner()?;
            let entry = catalog::decode(&value)?;
            databases.insert(entry.name.clone(), entry);
        }

        info!(path = %path.display(), databases = databases.len(), "opened object-store engine");

        Ok(Self {
            shared: Arc::new(Shared {
                db,
                catalog,
                state: RwLock::new(CatalogState { databases, next_id }),
                connections: Mutex::new(HashMap::new()),
                write_locks: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Create an object store, creating the database at version 1 when it
    /// does not exist yet. Bumps the version of an existing database.
    ///
    /// Fails with [`EngineError::Blocked`] while connections are open.
    pub fn create_store(
        &self,
        database: &str,
        definition: StoreDefinition,
    ) -> Result<DatabaseInfo, EngineError> {
        validate_definition(&definition)?;

        let connections = lock(&self.shared.connections);
        if connections.get(database).copied().unwrap_or(0) > 0 {
            return Err(EngineError::Blocked(database.to_string()));
        }

        let mut state = self.shared.write_state();
        let mut entry = match state.databases.get(database) {
            Some(existing) => {
                let mut entry = existing.clone();
                entry.version += 1;
                entry
            }
            None => DatabaseEntry::new(database),
        };
        if entry.store(&definition.name).is_some() {
            return Err(EngineError::Constraint(format!(
                "Object store '{}' already exists in database '{}'",
                definition.name, database
            )));
        }

        let store_id = state.next_id;
        let index_ids: Vec<u64> = (1..=definition.indexes.len() as u64)
            .map(|offset| store_id + offset)
            .collect();
        let next_id = store_id + 1 + definition.indexes.len() as u64;

        self.shared
            .db
            .keyspace(&catalog::data_keyspace_name(store_id), KeyspaceCreateOptions::default)?;
        for id in &index_ids {
            self.shared
                .db
                .keyspace(&catalog::index_keyspace_name(*id), KeyspaceCreateOptions::default)?;
        }

        debug!(database, store = %definition.name, version = entry.version, "creating object store");
        entry.stores.push(StoreEntry::new(store_id, definition, index_ids));
        entry.stores.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));

        self.shared
            .catalog
            .insert(NEXT_ID_KEY, next_id.to_le_bytes())?;
        self.shared.catalog.insert(entry.key(), catalog::encode(&entry)?)?;
        self.shared.db.persist(PersistMode::SyncAll)?;

        state.next_id = next_id;
        let info = entry.info();
        state.databases.insert(database.to_string(), entry);
        drop(connections);
        Ok(info)
    }

    /// Delete a database and all of its records. Returns whether it existed.
    ///
    /// Fails with [`EngineError::Blocked`] while connections are open.
    pub fn delete_database(&self, database: &str) -> Result<bool, EngineError> {
        let connections = lock(&self.shared.connections);
        if connections.get(database).copied().unwrap_or(0) > 0 {
            return Err(EngineError::Blocked(database.to_string()));
        }

        let mut state = self.shared.write_state();
        let Some(entry) = state.databases.get(database).cloned() else {
            return Ok(false);
        };

        for store in &entry.stores {
            self.clear_keyspace(&catalog::data_keyspace_name(store.id))?;
            for id in &store.index_ids {
                self.clear_keyspace(&catalog::index_keyspace_name(*id))?;
            }
        }
        self.shared.catalog.remove(entry.key())?;
        self.shared.db.persist(PersistMode::SyncAll)?;

        state.databases.remove(database);
        info!(database, "deleted database");
        drop(connections);
        Ok(true)
    }

    fn clear_keyspace(&self, name: &str) -> Result<(), EngineError> {
        let keyspace = self.shared.db.keyspace(name, KeyspaceCreateOptions::default)?;
        let keys: Vec<Vec<u8>> = keyspace
            .iter()
            .filter_map(|kv| kv.key().ok().map(|k| k.to_vec()))
            .collect();
        for k in keys {
            keyspace.remove(&k)?;
        }
        Ok(())
    }
}

fn validate_definition(definition: &StoreDefinition) -> Result<(), EngineError> {
    if definition.name.is_empty() {
        return Err(EngineError::Data("Object store name must not be empty".to_string()));
    }
    if definition.auto_increment
        && matches!(&definition.key_path, Some(KeyPath::Compound(_)))
    {
        return Err(EngineError::Data(format!(
            "Object store '{}' cannot combine a key generator with a compound key path",
            definition.name
        )));
    }
    for (position, index) in definition.indexes.iter().enumerate() {
        if index.multi_entry && matches!(index.key_path, KeyPath::Compound(_)) {
            return Err(EngineError::Data(format!(
                "Index '{}' cannot be multi-entry over a compound key path",
                index.name
            )));
        }
        if definition.indexes.iter().take(position).any(|other| other.name == index.name) {
            return Err(EngineError::Constraint(format!(
                "Index '{}' already exists on object store '{}'",
                index.name, definition.name
            )));
        }
    }
    Ok(())
}

impl Shared {
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, database: &str) -> Result<DatabaseEntry, EngineError> {
        self.read_state()
            .databases
            .get(database)
            .cloned()
            .ok_or_else(|| EngineError::DatabaseNotFound(database.to_string()))
    }
}

impl Engine for FjallEngine {
    type Connection = FjallConnection;

    fn databases(&self) -> Result<Vec<DatabaseInfo>, EngineError> {
        Ok(self
            .shared
            .read_state()
            .databases
            .values()
            .map(DatabaseEntry::info)
            .collect())
    }

    fn open_database(&self, name: &str) -> Result<FjallConnection, EngineError> {
        if name.is_empty() {
            return Err(EngineError::Data("Database name must not be empty".to_string()));
        }

        let mut connections = lock(&self.shared.connections);
        let exists = self.shared.read_state().databases.contains_key(name);
        if !exists {
            let entry = DatabaseEntry::new(name);
            self.shared.catalog.insert(entry.key(), catalog::encode(&entry)?)?;
            self.shared.db.persist(PersistMode::SyncAll)?;
            self.shared
                .write_state()
                .databases
                .insert(name.to_string(), entry);
            debug!(database = name, "created database");
        }
        *connections.entry(name.to_string()).or_insert(0) += 1;
        drop(connections);

        let write_lock = lock(&self.shared.write_locks)
            .entry(name.to_string())
            .or_default()
            .clone();

        trace!(database = name, "opened connection");
        Ok(FjallConnection {
            shared: Arc::clone(&self.shared),
            name: name.to_string(),
            write_lock,
            closed: AtomicBool::new(false),
        })
    }
}

/// Open handle to one database of a [`FjallEngine`].
pub struct FjallConnection {
    shared: Arc<Shared>,
    name: String,
    write_lock: Arc<Mutex<()>>,
    closed: AtomicBool,
}

impl FjallConnection {
    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed(self.name.clone()));
        }
        Ok(())
    }

    fn release(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut connections = lock(&self.shared.connections);
        if let Some(count) = connections.get_mut(&self.name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                connections.remove(&self.name);
            }
        }
        trace!(database = %self.name, "closed connection");
    }
}

impl Connection for FjallConnection {
    type Transaction<'a> = FjallTransaction<'a>;

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Result<u64, EngineError> {
        self.ensure_open()?;
        Ok(self.shared.entry(&self.name)?.version)
    }

    fn store_names(&self) -> Result<Vec<String>, EngineError> {
        self.ensure_open()?;
        Ok(self.shared.entry(&self.name)?.store_names())
    }

    fn transaction(
        &self,
        store: &str,
        mode: TransactionMode,
    ) -> Result<FjallTransaction<'_>, EngineError> {
        self.ensure_open()?;

        // Writers read the catalog only once they hold the lock, so the key
        // generator position they start from is the committed one.
        let guard = match mode {
            TransactionMode::ReadOnly => None,
            TransactionMode::ReadWrite => Some(lock(&self.write_lock)),
        };

        let entry = self.shared.entry(&self.name)?;
        let store_entry = entry
            .store(store)
            .cloned()
            .ok_or_else(|| EngineError::store_not_found(&self.name, store))?;

        let data = self.shared.db.keyspace(
            &catalog::data_keyspace_name(store_entry.id),
            KeyspaceCreateOptions::default,
        )?;
        let mut indexes = Vec::with_capacity(store_entry.index_ids.len());
        for (id, index) in store_entry.indexes() {
            let keyspace = self
                .shared
                .db
                .keyspace(&catalog::index_keyspace_name(id), KeyspaceCreateOptions::default)?;
            indexes.push(IndexSpace {
                definition: index.clone(),
                keyspace,
                staged: Staged::new(),
            });
        }

        Ok(FjallTransaction {
            shared: &self.shared,
            database: &self.name,
            mode,
            snapshot: self.shared.db.snapshot(),
            committed_next_key: store_entry.next_key,
            store: store_entry,
            data,
            records: Staged::new(),
            indexes,
            _guard: guard,
        })
    }

    fn close(&self) -> Result<(), EngineError> {
        self.release();
        Ok(())
    }
}

impl Drop for FjallConnection {
    fn drop(&mut self) {
        self.release();
    }
}

/// Pending writes to one keyspace: `Some` inserts, `None` removes.
type Staged = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

struct IndexSpace {
    definition: IndexDefinition,
    keyspace: Keyspace,
    staged: Staged,
}

/// Entries of `keyspace` starting with `prefix` as of `snapshot`, with
/// `staged` applied on top. Ordered by key.
fn scan(
    snapshot: &Snapshot,
    keyspace: &Keyspace,
    staged: &Staged,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
    let iter = if prefix.is_empty() {
        snapshot.iter(keyspace)
    } else {
        snapshot.prefix(keyspace, prefix)
    };
    let mut entries = BTreeMap::new();
    for kv in iter {
        let (key, value) = kv.into_inner()?;
        entries.insert(key.to_vec(), value.to_vec());
    }
    for (key, value) in staged.range(prefix.to_vec()..) {
        if !key.starts_with(prefix) {
            break;
        }
        match value {
            Some(value) => entries.insert(key.clone(), value.clone()),
            None => entries.remove(key),
        };
    }
    Ok(entries.into_iter().collect())
}

fn apply(batch: &mut OwnedWriteBatch, keyspace: &Keyspace, staged: Staged) {
    for (key, value) in staged {
        match value {
            Some(value) => batch.insert(keyspace, key, value),
            None => batch.remove(keyspace, key),
        }
    }
}

/// Transaction over one object store of a [`FjallConnection`].
///
/// Reads see the store as of the moment the transaction started, plus the
/// transaction's own writes. Writes are staged in memory and applied in one
/// atomic batch by [`StoreTransaction::commit`]; dropping the transaction
/// discards them. Read-write transactions hold the database's write lock
/// until dropped.
pub struct FjallTransaction<'a> {
    shared: &'a Shared,
    database: &'a str,
    mode: TransactionMode,
    snapshot: Snapshot,
    store: StoreEntry,
    /// Generator position in the catalog when the transaction started.
    committed_next_key: u64,
    data: Keyspace,
    records: Staged,
    indexes: Vec<IndexSpace>,
    _guard: Option<MutexGuard<'a, ()>>,
}

impl FjallTransaction<'_> {
    fn ensure_writable(&self) -> Result<(), EngineError> {
        match self.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(EngineError::ReadOnly(format!(
                "cannot write to '{}' in a read-only transaction",
                self.store.definition.name
            ))),
        }
    }

    fn load(&self, primary_key: &[u8]) -> Result<Option<Value>, EngineError> {
        match self.records.get(primary_key) {
            Some(Some(bytes)) => Ok(Some(serde_json::from_slice(bytes)?)),
            Some(None) => Ok(None),
            None => match self.snapshot.get(&self.data, primary_key)? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            },
        }
    }

    fn generate_key(&mut self) -> Result<Key, EngineError> {
        let current = self.store.next_key;
        if current > MAX_GENERATED_KEY {
            return Err(EngineError::Constraint(format!(
                "Key generator of '{}' is exhausted",
                self.store.definition.name
            )));
        }
        self.store.next_key = current + 1;
        Ok(Key::Number(current as f64))
    }

    /// Move the key generator past an explicitly supplied numeric key.
    fn observe_key(&mut self, key: &Key) {
        let Key::Number(n) = key else {
            return;
        };
        if !self.store.definition.auto_increment || *n < self.store.next_key as f64 {
            return;
        }
        self.store.next_key = if *n >= MAX_GENERATED_KEY as f64 {
            MAX_GENERATED_KEY + 1
        } else {
            n.floor() as u64 + 1
        };
    }

    /// Determine the primary key of `record`, injecting a generated key
    /// into in-line records when needed.
    fn resolve_key(&mut self, record: &mut Value, key: Option<Key>) -> Result<Key, EngineError> {
        let auto_increment = self.store.definition.auto_increment;
        match (self.store.definition.key_path.clone(), key) {
            (Some(path), Some(_)) => Err(EngineError::Data(format!(
                "Object store '{}' uses in-line keys at {}; an explicit key is not allowed",
                self.store.definition.name, path
            ))),
            (Some(path), None) => match path.evaluate(record) {
                Some(value) => Key::from_value(&value).ok_or_else(|| {
                    EngineError::Data(format!("Value at key path {} is not a valid key", path))
                }),
                None if auto_increment => {
                    let key = self.generate_key()?;
                    if !path.inject(record, &key) {
                        return Err(EngineError::Data(format!(
                            "Cannot write generated key at key path {}",
                            path
                        )));
                    }
                    Ok(key)
                }
                None => Err(EngineError::Data(format!(
                    "Record has no value at key path {}",
                    path
                ))),
            },
            (None, Some(key)) => Ok(key),
            (None, None) if auto_increment => self.generate_key(),
            (None, None) => Err(EngineError::Data(format!(
                "Object store '{}' uses out-of-line keys and has no key generator; a key is required",
                self.store.definition.name
            ))),
        }
    }

    fn check_unique(&self, record: &Value, primary_key: &[u8]) -> Result<(), EngineError> {
        for index in self.indexes.iter().filter(|index| index.definition.unique) {
            for index_key in index.definition.keys_for(record) {
                let entries = scan(
                    &self.snapshot,
                    &index.keyspace,
                    &index.staged,
                    &codec::encode(&index_key),
                )?;
                if entries.iter().any(|(_, owner)| owner.as_slice() != primary_key) {
                    return Err(EngineError::Constraint(format!(
                        "Unique index '{}' already contains key {}",
                        index.definition.name, index_key
                    )));
                }
            }
        }
        Ok(())
    }

    fn unstage_index_entries(&mut self, record: &Value, primary_key: &[u8]) {
        for index in &mut self.indexes {
            for index_key in index.definition.keys_for(record) {
                index
                    .staged
                    .insert(codec::encode_index_entry(&index_key, primary_key), None);
            }
        }
    }

    fn write(&mut self, record: Value, key: Option<Key>, overwrite: bool) -> Result<Key, EngineError> {
        self.ensure_writable()?;
        let next_key = self.store.next_key;
        let result = self.stage_write(record, key, overwrite);
        if result.is_err() {
            // A failed write hands its generated key back.
            self.store.next_key = next_key;
        }
        result
    }

    /// Validate `record` and stage it with its index entries. Nothing is
    /// staged unless every check passes.
    fn stage_write(
        &mut self,
        mut record: Value,
        key: Option<Key>,
        overwrite: bool,
    ) -> Result<Key, EngineError> {
        let key = self.resolve_key(&mut record, key)?;
        let primary_key = codec::encode(&key);

        let existing = self.load(&primary_key)?;
        if existing.is_some() && !overwrite {
            return Err(EngineError::Constraint(format!(
                "Key {} already exists in object store '{}'",
                key, self.store.definition.name
            )));
        }
        self.check_unique(&record, &primary_key)?;
        let bytes = serde_json::to_vec(&record)?;

        if let Some(old) = &existing {
            self.unstage_index_entries(old, &primary_key);
        }
        for index in &mut self.indexes {
            for index_key in index.definition.keys_for(&record) {
                index.staged.insert(
                    codec::encode_index_entry(&index_key, &primary_key),
                    Some(primary_key.clone()),
                );
            }
        }
        self.records.insert(primary_key, Some(bytes));
        self.observe_key(&key);
        trace!(store = %self.store.definition.name, %key, overwrite, "staged record");
        Ok(key)
    }

    fn has_staged_writes(&self) -> bool {
        !self.records.is_empty() || self.indexes.iter().any(|index| !index.staged.is_empty())
    }
}

impl StoreTransaction for FjallTransaction<'_> {
    fn definition(&self) -> &StoreDefinition {
        &self.store.definition
    }

    fn count(&self) -> Result<u64, EngineError> {
        if self.records.is_empty() {
            return Ok(self.snapshot.len(&self.data)? as u64);
        }
        Ok(scan(&self.snapshot, &self.data, &self.records, &[])?.len() as u64)
    }

    fn get_all(&self) -> Result<Vec<Value>, EngineError> {
        let mut records = Vec::new();
        for (_, value) in scan(&self.snapshot, &self.data, &self.records, &[])? {
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    fn get_all_by_index(&self, index: &str) -> Result<Vec<Value>, EngineError> {
        let index = self
            .indexes
            .iter()
            .find(|space| space.definition.name == index)
            .ok_or_else(|| {
                EngineError::IndexNotFound {
                    store: self.store.definition.name.clone(),
                    index: index.to_string(),
                }
            })?;
        let mut records = Vec::new();
        for (_, primary_key) in scan(&self.snapshot, &index.keyspace, &index.staged, &[])? {
            if let Some(record) = self.load(&primary_key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, EngineError> {
        self.load(&codec::encode(key))
    }

    fn add(&mut self, record: Value, key: Option<Key>) -> Result<Key, EngineError> {
        self.write(record, key, false)
    }

    fn put(&mut self, record: Value, key: Option<Key>) -> Result<Key, EngineError> {
        self.write(record, key, true)
    }

    fn delete(&mut self, key: &Key) -> Result<(), EngineError> {
        self.ensure_writable()?;
        let primary_key = codec::encode(key);
        let Some(existing) = self.load(&primary_key)? else {
            return Ok(());
        };
        self.unstage_index_entries(&existing, &primary_key);
        self.records.insert(primary_key, None);
        Ok(())
    }

    fn commit(self) -> Result<(), EngineError> {
        let generator_moved = self.store.next_key != self.committed_next_key;
        if !generator_moved && !self.has_staged_writes() {
            return Ok(());
        }

        let mut batch = self.shared.db.batch();
        apply(&mut batch, &self.data, self.records);
        for index in self.indexes {
            apply(&mut batch, &index.keyspace, index.staged);
        }

        let catalog_entry = if generator_moved {
            let mut entry = self.shared.entry(self.database)?;
            let store = entry
                .store_mut(&self.store.definition.name)
                .ok_or_else(|| {
                    EngineError::store_not_found(self.database, &self.store.definition.name)
                })?;
            store.next_key = self.store.next_key;
            batch.insert(&self.shared.catalog, entry.key(), catalog::encode(&entry)?);
            Some(entry)
        } else {
            None
        };

        batch.commit()?;
        self.shared.db.persist(PersistMode::SyncAll)?;
        if let Some(entry) = catalog_entry {
            self.shared
                .write_state()
                .databases
                .insert(self.database.to_string(), entry);
        }
        trace!(database = self.database, store = %self.store.definition.name, "committed transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> (TempDir, FjallEngine) {
        let dir = TempDir::new().unwrap();
        let engine = FjallEngine::init(dir.path()).unwrap();
        (dir, engine)
    }

    fn users() -> StoreDefinition {
        StoreDefinition::new("users")
            .key_path(KeyPath::Single("id".into()))
            .auto_increment()
            .index(IndexDefinition::new("by_email", KeyPath::Single("email".into())).unique())
            .index(IndexDefinition::new("by_age", KeyPath::Single("age".into())))
    }

    #[test]
    fn test_open_missing_database_creates_it() {
        let (_dir, engine) = engine();
        let conn = engine.open_database("fresh").unwrap();
        assert_eq!(conn.version().unwrap(), 1);
        assert!(conn.store_names().unwrap().is_empty());
        conn.close().unwrap();
        assert_eq!(
            engine.databases().unwrap(),
            vec![DatabaseInfo { name: "fresh".into(), version: 1 }]
        );
    }

    #[test]
    fn test_create_store_bumps_version_and_blocks_on_open_connection() {
        let (_dir, engine) = engine();
        assert_eq!(engine.create_store("app", users()).unwrap().version, 1);
        let info = engine
            .create_store("app", StoreDefinition::new("logs").auto_increment())
            .unwrap();
        assert_eq!(info.version, 2);

        let conn = engine.open_database("app").unwrap();
        assert_eq!(conn.store_names().unwrap(), vec!["logs".to_string(), "users".to_string()]);
        assert!(matches!(
            engine.create_store("app", StoreDefinition::new("more")),
            Err(EngineError::Blocked(_))
        ));
        drop(conn);
        assert!(engine.create_store("app", StoreDefinition::new("more")).is_ok());
        assert!(matches!(
            engine.create_store("app", StoreDefinition::new("more")),
            Err(EngineError::Constraint(_))
        ));
    }

    #[test]
    fn test_generated_keys_are_injected() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        let first = tx.add(json!({"email": "a@x", "age": 30}), None).unwrap();
        let explicit = tx.add(json!({"id": 10, "email": "b@x", "age": 20}), None).unwrap();
        let next = tx.add(json!({"email": "c@x", "age": 25}), None).unwrap();
        tx.commit().unwrap();

        assert_eq!(first, Key::Number(1.0));
        assert_eq!(explicit, Key::Number(10.0));
        assert_eq!(next, Key::Number(11.0));

        let tx = conn.transaction("users", TransactionMode::ReadOnly).unwrap();
        assert_eq!(tx.count().unwrap(), 3);
        assert_eq!(
            tx.get(&Key::Number(1.0)).unwrap(),
            Some(json!({"id": 1, "email": "a@x", "age": 30}))
        );
        let ages: Vec<Value> = tx
            .get_all_by_index("by_age")
            .unwrap()
            .into_iter()
            .map(|r| r["age"].clone())
            .collect();
        assert_eq!(ages, vec![json!(20), json!(25), json!(30)]);
    }

    #[test]
    fn test_constraints() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        tx.add(json!({"id": 1, "email": "a@x"}), None).unwrap();

        assert!(matches!(
            tx.add(json!({"id": 1, "email": "other@x"}), None),
            Err(EngineError::Constraint(_))
        ));
        assert!(matches!(
            tx.add(json!({"id": 2, "email": "a@x"}), None),
            Err(EngineError::Constraint(_))
        ));
        // Replacing a record keeps its own unique index entry.
        tx.put(json!({"id": 1, "email": "a@x", "age": 5}), None).unwrap();
        assert!(matches!(
            tx.put(json!({"email": "z@x"}), Some(Key::Number(3.0))),
            Err(EngineError::Data(_))
        ));
    }

    #[test]
    fn test_read_only_transaction_rejects_writes() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("users", TransactionMode::ReadOnly).unwrap();
        assert!(matches!(
            tx.add(json!({"email": "a@x"}), None),
            Err(EngineError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_out_of_line_store_requires_key() {
        let (_dir, engine) = engine();
        engine.create_store("app", StoreDefinition::new("kv")).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("kv", TransactionMode::ReadWrite).unwrap();
        assert!(matches!(tx.add(json!("v"), None), Err(EngineError::Data(_))));
        let key = Key::String("k".into());
        tx.add(json!("v"), Some(key.clone())).unwrap();
        assert_eq!(tx.get(&key).unwrap(), Some(json!("v")));
        tx.delete(&key).unwrap();
        tx.delete(&key).unwrap();
        assert_eq!(tx.get(&key).unwrap(), None);
    }

    #[test]
    fn test_delete_removes_index_entries() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        tx.add(json!({"id": 1, "email": "a@x"}), None).unwrap();
        tx.delete(&Key::Number(1.0)).unwrap();
        tx.add(json!({"id": 2, "email": "a@x"}), None).unwrap();
        assert_eq!(tx.get_all_by_index("by_email").unwrap().len(), 1);
    }

    fn notes() -> StoreDefinition {
        StoreDefinition::new("notes")
            .key_path(KeyPath::Single("id".into()))
            .auto_increment()
            .index(IndexDefinition::new("by_age", KeyPath::Single("age".into())))
    }

    #[test]
    fn test_concurrent_writers_get_distinct_generated_keys() {
        let (_dir, engine) = engine();
        engine.create_store("app", notes()).unwrap();
        let first_conn = engine.open_database("app").unwrap();
        let second_conn = engine.open_database("app").unwrap();

        let mut first = first_conn.transaction("notes", TransactionMode::ReadWrite).unwrap();
        let second_key = std::thread::scope(|s| {
            let handle = s.spawn(move || {
                // Blocks until `first` is committed.
                let mut tx = second_conn.transaction("notes", TransactionMode::ReadWrite).unwrap();
                let key = tx.put(json!({"text": "second"}), None).unwrap();
                tx.commit().unwrap();
                key
            });
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert_eq!(first.add(json!({"text": "first"}), None).unwrap(), Key::Number(1.0));
            first.commit().unwrap();
            handle.join().unwrap()
        });
        assert_eq!(second_key, Key::Number(2.0));

        let tx = first_conn.transaction("notes", TransactionMode::ReadOnly).unwrap();
        assert_eq!(
            tx.get_all().unwrap(),
            vec![json!({"text": "first", "id": 1}), json!({"text": "second", "id": 2})]
        );
    }

    #[test]
    fn test_read_only_transaction_sees_a_stable_snapshot() {
        let (_dir, engine) = engine();
        engine.create_store("app", notes()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("notes", TransactionMode::ReadWrite).unwrap();
        tx.add(json!({"id": 1, "age": 30}), None).unwrap();
        tx.add(json!({"id": 2}), None).unwrap();
        tx.commit().unwrap();

        let reader = conn.transaction("notes", TransactionMode::ReadOnly).unwrap();
        let before = reader.get_all().unwrap();

        let mut writer = conn.transaction("notes", TransactionMode::ReadWrite).unwrap();
        writer.put(json!({"id": 2, "age": 10}), None).unwrap();
        writer.add(json!({"id": 3, "age": 20}), None).unwrap();
        writer.commit().unwrap();

        assert_eq!(reader.get_all().unwrap(), before);
        assert_eq!(reader.count().unwrap(), 2);
        assert_eq!(reader.get(&Key::Number(3.0)).unwrap(), None);
        assert_eq!(
            reader.get_all_by_index("by_age").unwrap(),
            vec![json!({"id": 1, "age": 30})]
        );

        let fresh = conn.transaction("notes", TransactionMode::ReadOnly).unwrap();
        assert_eq!(fresh.count().unwrap(), 3);
        assert_eq!(fresh.get_all_by_index("by_age").unwrap().len(), 3);
    }

    #[test]
    fn test_uncommitted_writes_are_discarded() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let other = engine.open_database("app").unwrap();
        {
            let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
            assert_eq!(tx.add(json!({"email": "a@x", "age": 1}), None).unwrap(), Key::Number(1.0));
            assert_eq!(tx.count().unwrap(), 1);

            let reader = other.transaction("users", TransactionMode::ReadOnly).unwrap();
            assert_eq!(reader.count().unwrap(), 0);
            assert!(reader.get_all_by_index("by_email").unwrap().is_empty());
        }

        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        assert_eq!(tx.count().unwrap(), 0);
        assert!(tx.get_all_by_index("by_age").unwrap().is_empty());
        // The generator did not move either.
        assert_eq!(tx.add(json!({"email": "a@x"}), None).unwrap(), Key::Number(1.0));
    }

    #[test]
    fn test_failed_add_hands_its_key_back() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        tx.add(json!({"email": "a@x"}), None).unwrap();
        tx.commit().unwrap();

        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        assert!(matches!(
            tx.add(json!({"email": "a@x"}), None),
            Err(EngineError::Constraint(_))
        ));
        assert_eq!(tx.add(json!({"email": "b@x"}), None).unwrap(), Key::Number(2.0));
        tx.commit().unwrap();

        let tx = conn.transaction("users", TransactionMode::ReadOnly).unwrap();
        assert_eq!(tx.count().unwrap(), 2);
        assert_eq!(tx.get_all_by_index("by_email").unwrap().len(), 2);
    }

    #[test]
    fn test_catalog_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let engine = FjallEngine::init(dir.path()).unwrap();
            engine.create_store("app", users()).unwrap();
            let conn = engine.open_database("app").unwrap();
            let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
            tx.add(json!({"email": "a@x"}), None).unwrap();
            tx.commit().unwrap();
        }
        let engine = FjallEngine::init(dir.path()).unwrap();
        let conn = engine.open_database("app").unwrap();
        let mut tx = conn.transaction("users", TransactionMode::ReadWrite).unwrap();
        assert_eq!(tx.count().unwrap(), 1);
        assert_eq!(tx.add(json!({"email": "b@x"}), None).unwrap(), Key::Number(2.0));
    }

    #[test]
    fn test_delete_database() {
        let (_dir, engine) = engine();
        engine.create_store("app", users()).unwrap();
        assert!(engine.delete_database("app").unwrap());
        assert!(!engine.delete_database("app").unwrap());
        assert!(engine.databases().unwrap().is_empty());
    }

    #[test]
    fn test_closed_connection_rejects_use() {
        let (_dir, engine) = engine();
        let conn = engine.open_database("app").unwrap();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(matches!(conn.store_names(), Err(EngineError::Closed(_))));
    }
}
