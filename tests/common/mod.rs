//! Common test utilities and fixtures.
//!
//! Engines backed by a temporary directory, seeding helpers, and engine
//! wrappers that inject failures or count opens.

#![cfg(feature = "kv")]
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use idb_explorer::{
    Connection, DatabaseInfo, Engine, EngineError, FjallConnection, FjallEngine, FjallTransaction,
    IndexDefinition, KeyPath, StoreDefinition, StoreTransaction, TransactionMode,
};
use serde_json::{Value, json};
use tempfile::TempDir;

// =============================================================================
// Engine Fixtures
// =============================================================================

/// A fjall engine living in a temporary directory.
pub struct TempEngine {
    pub engine: FjallEngine,
    _temp_dir: TempDir, // Keep alive for test duration
}

impl TempEngine {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let engine = FjallEngine::init(&temp_dir.path().join("engine"))?;
        Ok(Self {
            engine,
            _temp_dir: temp_dir,
        })
    }
}

/// `users` store: in-line `id` key, generated keys, indexes on `age` and
/// `email` (unique).
pub fn users_store() -> StoreDefinition {
    StoreDefinition::new("users")
        .key_path(KeyPath::Single("id".into()))
        .auto_increment()
        .index(IndexDefinition::new("by_age", KeyPath::Single("age".into())))
        .index(IndexDefinition::new("by_email", KeyPath::Single("email".into())).unique())
}

/// The `n`-th seeded user (1-based).
pub fn user(n: usize) -> Value {
    let city = if n % 2 == 0 { "Lisbon" } else { "Oslo" };
    json!({
        "name": format!("user-{:03}", n),
        "email": format!("user{}@example.com", n),
        "age": 20 + (n % 40),
        "address": { "city": city },
    })
}

/// Write records into `store` of `database` in one transaction.
pub fn seed(
    engine: &FjallEngine,
    database: &str,
    store: &str,
    records: impl IntoIterator<Item = Value>,
) -> anyhow::Result<()> {
    let connection = engine.open_database(database)?;
    {
        let mut tx = connection.transaction(store, TransactionMode::ReadWrite)?;
        for record in records {
            tx.add(record, None)?;
        }
        tx.commit()?;
    }
    connection.close()?;
    Ok(())
}

/// Create the `users` store in `database` and seed `count` users.
pub fn seed_users(engine: &FjallEngine, database: &str, count: usize) -> anyhow::Result<()> {
    engine.create_store(database, users_store())?;
    seed(engine, database, "users", (1..=count).map(user))
}

// =============================================================================
// Failure Injection
// =============================================================================

fn injected(what: &str) -> EngineError {
    EngineError::Io(std::io::Error::other(format!("injected failure: {}", what)))
}

/// Engine wrapper that fails on chosen databases and stores.
pub struct FlakyEngine {
    inner: FjallEngine,
    enumeration_fails: bool,
    failing_databases: HashSet<String>,
    failing_stores: HashSet<String>,
}

impl FlakyEngine {
    pub fn new(inner: FjallEngine) -> Self {
        Self {
            inner,
            enumeration_fails: false,
            failing_databases: HashSet::new(),
            failing_stores: HashSet::new(),
        }
    }

    pub fn fail_enumeration(mut self) -> Self {
        self.enumeration_fails = true;
        self
    }

    /// Opening `database` fails.
    pub fn fail_database(mut self, database: &str) -> Self {
        self.failing_databases.insert(database.to_string());
        self
    }

    /// Transactions on `store` fail, in any database.
    pub fn fail_store(mut self, store: &str) -> Self {
        self.failing_stores.insert(store.to_string());
        self
    }
}

impl Engine for FlakyEngine {
    type Connection = FlakyConnection;

    fn databases(&self) -> Result<Vec<DatabaseInfo>, EngineError> {
        if self.enumeration_fails {
            return Err(EngineError::Unsupported("database enumeration".into()));
        }
        self.inner.databases()
    }

    fn open_database(&self, name: &str) -> Result<FlakyConnection, EngineError> {
        if self.failing_databases.contains(name) {
            return Err(injected(name));
        }
        Ok(FlakyConnection {
            inner: self.inner.open_database(name)?,
            failing_stores: self.failing_stores.clone(),
        })
    }
}

pub struct FlakyConnection {
    inner: FjallConnection,
    failing_stores: HashSet<String>,
}

impl Connection for FlakyConnection {
    type Transaction<'a> = FjallTransaction<'a>;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> Result<u64, EngineError> {
        self.inner.version()
    }

    fn store_names(&self) -> Result<Vec<String>, EngineError> {
        self.inner.store_names()
    }

    fn transaction(
        &self,
        store: &str,
        mode: TransactionMode,
    ) -> Result<FjallTransaction<'_>, EngineError> {
        if self.failing_stores.contains(store) {
            return Err(injected(store));
        }
        self.inner.transaction(store, mode)
    }

    fn close(&self) -> Result<(), EngineError> {
        self.inner.close()
    }
}

// =============================================================================
// Open Counting
// =============================================================================

/// Engine wrapper that counts `open_database` calls. Each open is slowed
/// down so concurrent callers overlap.
pub struct CountingEngine {
    inner: FjallEngine,
    opens: AtomicUsize,
    delay: Duration,
}

impl CountingEngine {
    pub fn new(inner: FjallEngine, delay: Duration) -> Self {
        Self {
            inner,
            opens: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Engine for CountingEngine {
    type Connection = FjallConnection;

    fn databases(&self) -> Result<Vec<DatabaseInfo>, EngineError> {
        self.inner.databases()
    }

    fn open_database(&self, name: &str) -> Result<FjallConnection, EngineError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.open_database(name)
    }
}

// =============================================================================
// Assertion Helpers
// =============================================================================

/// The `field` of each record, as f64.
pub fn numbers(records: &[Value], field: &str) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| r.get(field).and_then(Value::as_f64))
        .collect()
}

/// The `name` of each record.
pub fn names(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

// =============================================================================
// Test Application
// =============================================================================

#[cfg(feature = "server")]
pub use app::TestApp;

#[cfg(feature = "server")]
mod app {
    use axum_test::TestServer;
    use idb_explorer::server::{
        AppState, Config, CorsConfig, LoggingConfig, QueryConfig, ServerConfig, StorageConfig,
        router,
    };
    use tempfile::TempDir;

    use super::seed_users;

    /// Test application wrapper that manages a temporary engine.
    pub struct TestApp {
        pub server: TestServer,
        pub state: AppState,
        _temp_dir: TempDir, // Keep alive for test duration
    }

    impl TestApp {
        /// A server over an engine holding database `app` with `users`
        /// users.
        pub fn with_users(users: usize) -> anyhow::Result<Self> {
            let temp_dir = TempDir::new()?;
            let path = temp_dir.path().join("engine");
            let config = Config {
                server: ServerConfig {
                    bind: "127.0.0.1".into(),
                    port: 0,
                    static_path: None,
                },
                storage: StorageConfig {
                    path: path.to_string_lossy().into(),
                },
                query: QueryConfig::default(),
                cors: CorsConfig::default(),
                logging: LoggingConfig::default(),
            };
            let state = AppState::from_config(&config)?;
            seed_users(state.explorer().engine(), "app", users)?;
            let server = TestServer::new(router(state.clone()))?;
            Ok(Self {
                server,
                state,
                _temp_dir: temp_dir,
            })
        }
    }
}
