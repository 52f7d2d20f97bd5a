//! Application state management.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;

use crate::engine::{EngineError, FjallEngine};
use crate::explorer::Explorer;

use super::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    explorer: Arc<Explorer<FjallEngine>>,
}

impl AppState {
    /// Open the engine named by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let path = Path::new(&config.storage.path);
        let engine = FjallEngine::init(path).map_err(|source| StateError::OpenEngine {
            path: config.storage.path.clone(),
            source,
        })?;
        Ok(Self::new(
            Explorer::new(engine).with_config(config.query.explorer_config()),
        ))
    }

    pub fn new(explorer: Explorer<FjallEngine>) -> Self {
        Self {
            explorer: Arc::new(explorer),
        }
    }

    pub fn explorer(&self) -> &Explorer<FjallEngine> {
        &self.explorer
    }

    /// Run `f` against the explorer on the blocking thread pool.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, JoinError>
    where
        T: Send + 'static,
        F: FnOnce(&Explorer<FjallEngine>) -> T + Send + 'static,
    {
        let explorer = Arc::clone(&self.explorer);
        tokio::task::spawn_blocking(move || f(&explorer)).await
    }

    /// Close cached connections; run after the server stops accepting
    /// requests.
    pub fn shutdown(&self) {
        self.explorer.close_all();
    }
}

/// Errors that can occur when setting up application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to open object-store engine at '{path}': {source}")]
    OpenEngine {
        path: String,
        #[source]
        source: EngineError,
    },
}
