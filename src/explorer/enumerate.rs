//! Database enumeration.

use super::{DatabaseDescriptor, Explorer};
use crate::engine::{Connection, DatabaseInfo, Engine, EngineError};
use crate::logging::{debug, warn};

impl<E: Engine> Explorer<E> {
    /// List every database the engine reports.
    ///
    /// Never fails: a database that cannot be inspected is listed with no
    /// stores, and an engine that cannot enumerate yields an empty list.
    pub fn list_databases(&self) -> Vec<DatabaseDescriptor> {
        let databases = match self.engine.databases() {
            Ok(databases) => databases,
            Err(err) => {
                warn!(error = %err, "database enumeration unavailable");
                return Vec::new();
            }
        };
        debug!(count = databases.len(), "listing databases");
        databases
            .into_iter()
            .map(|info| self.describe_database(info))
            .collect()
    }

    fn describe_database(&self, info: DatabaseInfo) -> DatabaseDescriptor {
        let store_names = match self.inspect_store_names(&info.name) {
            Ok(names) => names,
            Err(err) => {
                warn!(database = %info.name, error = %err, "failed to inspect database");
                Vec::new()
            }
        };
        DatabaseDescriptor {
            name: info.name,
            version: info.version.max(1),
            store_count: store_names.len(),
            store_names,
        }
    }

    /// Read store names through a short-lived connection.
    fn inspect_store_names(&self, database: &str) -> Result<Vec<String>, EngineError> {
        let connection = self.engine.open_database(database)?;
        let names = connection.store_names();
        if let Err(err) = connection.close() {
            warn!(database, error = %err, "failed to close inspection connection");
        }
        names
    }
}
