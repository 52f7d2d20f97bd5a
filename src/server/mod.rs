//! HTTP API server for idb-explorer.
//!
//! Exposes the request/response contract at `POST /api/v1/requests`, plus
//! read-only REST views of databases, stores and records.

mod config;
mod error;
mod logging;
mod routes;
mod state;

pub use config::{
    Config, ConfigError, CorsConfig, LogFormat, LoggingConfig, QueryConfig, ServerConfig,
    StorageConfig,
};
pub use error::{ApiError, status_for};
pub use logging::{LoggingError, init as init_logging};
pub use routes::router;
pub use state::{AppState, StateError};
