//! Store schema reading.

use super::{Explorer, StoreSchema, require_database, require_store};
use crate::engine::{Connection, Engine, EngineError, StoreTransaction, TransactionMode};
use crate::error::Result;
use crate::logging::{debug, warn};

/// Read one store's schema and record count.
pub(crate) fn read_schema<C: Connection>(
    connection: &C,
    store: &str,
) -> std::result::Result<StoreSchema, EngineError> {
    let tx = connection.transaction(store, TransactionMode::ReadOnly)?;
    let count = tx.count()?;
    Ok(StoreSchema::from_definition(tx.definition(), count))
}

impl<E: Engine> Explorer<E> {
    /// Schemas of every store in `database`, in store-name order.
    ///
    /// A store that cannot be inspected is reported with a degraded schema.
    /// A database that cannot be opened yields an empty list.
    pub fn list_stores(&self, database: &str) -> Result<Vec<StoreSchema>> {
        require_database(database)?;

        let connection = match self.engine.open_database(database) {
            Ok(connection) => connection,
            Err(err) => {
                warn!(database, error = %err, "failed to open database");
                return Ok(Vec::new());
            }
        };

        let schemas = match connection.store_names() {
            Ok(names) => names
                .into_iter()
                .map(|name| {
                    read_schema(&connection, &name).unwrap_or_else(|err| {
                        warn!(database, store = %name, error = %err, "failed to inspect store");
                        StoreSchema::degraded(name)
                    })
                })
                .collect(),
            Err(err) => {
                warn!(database, error = %err, "failed to list stores");
                Vec::new()
            }
        };

        if let Err(err) = connection.close() {
            warn!(database, error = %err, "failed to close inspection connection");
        }
        debug!(database, stores = schemas.len(), "listed stores");
        Ok(schemas)
    }

    /// Schema of a single store. Fails if the store does not exist.
    pub fn store_schema(&self, database: &str, store: &str) -> Result<StoreSchema> {
        require_store(database, store)?;
        let connection = self.connection(database)?;
        Ok(read_schema(connection.as_ref(), store)?)
    }
}
