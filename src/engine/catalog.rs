//! Catalog entries describing the databases held by the fjall engine.
//!
//! Each database is stored as one checksummed JSON entry in the catalog
//! keyspace: a little-endian CRC32 of the payload followed by the payload.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::{DatabaseInfo, IndexDefinition, StoreDefinition};

/// Catalog layout version. Bump when the on-disk layout changes; the engine
/// refuses to open a catalog written with a different version.
pub(crate) const FORMAT_VERSION: u32 = 1;

/// Key of the format version entry.
pub(crate) const CONFIG_KEY: &str = "config";

/// Key of the id allocator entry.
pub(crate) const NEXT_ID_KEY: &str = "next_id";

/// Prefix of database entries.
pub(crate) const DATABASE_PREFIX: &str = "db/";

/// First value handed out by a key generator.
const FIRST_GENERATED_KEY: u64 = 1;

/// Largest key a generator may hand out (2^53).
pub(crate) const MAX_GENERATED_KEY: u64 = 9_007_199_254_740_992;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DatabaseEntry {
    pub name: String,
    pub version: u64,
    pub stores: Vec<StoreEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreEntry {
    pub id: u64,
    pub definition: StoreDefinition,
    /// Keyspace ids of `definition.indexes`, in the same order.
    pub index_ids: Vec<u64>,
    pub next_key: u64,
}

impl DatabaseEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: 1,
            stores: Vec::new(),
        }
    }

    pub fn info(&self) -> DatabaseInfo {
        DatabaseInfo {
            name: self.name.clone(),
            version: self.version,
        }
    }

    pub fn store(&self, name: &str) -> Option<&StoreEntry> {
        self.stores.iter().find(|s| s.definition.name == name)
    }

    pub fn store_mut(&mut self, name: &str) -> Option<&mut StoreEntry> {
        self.stores.iter_mut().find(|s| s.definition.name == name)
    }

    pub fn store_names(&self) -> Vec<String> {
        self.stores.iter().map(|s| s.definition.name.clone()).collect()
    }

    pub fn key(&self) -> String {
        database_key(&self.name)
    }
}

impl StoreEntry {
    pub fn new(id: u64, definition: StoreDefinition, index_ids: Vec<u64>) -> Self {
        Self {
            id,
            definition,
            index_ids,
            next_key: FIRST_GENERATED_KEY,
        }
    }

    /// Indexes paired with their keyspace ids.
    pub fn indexes(&self) -> impl Iterator<Item = (u64, &IndexDefinition)> {
        self.index_ids
            .iter()
            .copied()
            .zip(self.definition.indexes.iter())
    }
}

pub(crate) fn database_key(name: &str) -> String {
    format!("{}{}", DATABASE_PREFIX, name)
}

pub(crate) fn data_keyspace_name(store_id: u64) -> String {
    format!("s{}", store_id)
}

pub(crate) fn index_keyspace_name(index_id: u64) -> String {
    format!("x{}", index_id)
}

/// Encode an entry with its checksum header.
pub(crate) fn encode(entry: &DatabaseEntry) -> Result<Vec<u8>, EngineError> {
    let payload = serde_json::to_vec(entry)?;
    let checksum = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&checksum.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode an entry, verifying its checksum.
pub(crate) fn decode(bytes: &[u8]) -> Result<DatabaseEntry, EngineError> {
    let (header, payload) = bytes
        .split_at_checked(4)
        .ok_or_else(|| EngineError::InvalidFormat("catalog entry too short".to_string()))?;
    let expected = u32::from_le_bytes(
        header
            .try_into()
            .map_err(|_| EngineError::InvalidFormat("invalid catalog header".to_string()))?,
    );
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(EngineError::InvalidFormat(format!(
            "catalog checksum mismatch: expected {:08x}, got {:08x}",
            expected, actual
        )));
    }
    Ok(serde_json::from_slice(payload)?)
}
