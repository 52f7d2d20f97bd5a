//! One open connection per database name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::engine::{Connection, EngineError};
use crate::logging::{error, trace};

type Slot<C> = Arc<Mutex<Option<Arc<C>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache of open connections keyed by database name.
///
/// Each name owns a slot mutex: concurrent opens of one name wait for the
/// first and share its connection, while other names proceed independently.
/// A failed open leaves the slot empty. Connections stay open until
/// [`ConnectionCache::close_all`].
pub struct ConnectionCache<C> {
    slots: Mutex<HashMap<String, Slot<C>>>,
}

impl<C> Default for ConnectionCache<C> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<C: Connection> ConnectionCache<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached connection for `name`, opening it with `open` when
    /// there is none.
    pub fn open<F>(&self, name: &str, open: F) -> Result<Arc<C>, EngineError>
    where
        F: FnOnce(&str) -> Result<C, EngineError>,
    {
        let slot = Arc::clone(lock(&self.slots).entry(name.to_string()).or_default());

        let mut cached = lock(&slot);
        if let Some(connection) = cached.as_ref() {
            trace!(database = name, "reusing cached connection");
            return Ok(Arc::clone(connection));
        }

        let connection = Arc::new(open(name)?);
        *cached = Some(Arc::clone(&connection));
        trace!(database = name, "cached new connection");
        Ok(connection)
    }

    /// Number of databases with an open cached connection.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<C>> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every cached connection and clear the cache.
    ///
    /// Close failures are logged and otherwise ignored.
    pub fn close_all(&self) {
        let slots: Vec<(String, Slot<C>)> = lock(&self.slots).drain().collect();
        for (name, slot) in slots {
            let Some(connection) = lock(&slot).take() else {
                continue;
            };
            if let Err(err) = connection.close() {
                error!(database = %name, error = %err, "failed to close connection");
                continue;
            }
            trace!(database = %name, "closed cached connection");
        }
    }
}
