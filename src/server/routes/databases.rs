//! Read-only REST views over databases, stores and records.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::Value;

use crate::engine::EngineError;
use crate::error::Error;
use crate::explorer::{DatabaseDescriptor, QueryOptions, QueryResult, StoreSchema};
use crate::value::Key;

use super::super::{error::ApiError, state::AppState};

/// List all databases.
pub async fn list_databases(
    State(state): State<AppState>,
) -> Result<Json<Vec<DatabaseDescriptor>>, ApiError> {
    Ok(Json(state.blocking(|explorer| explorer.list_databases()).await?))
}

/// List the stores of a database.
pub async fn list_stores(
    State(state): State<AppState>,
    Path(database): Path<String>,
) -> Result<Json<Vec<StoreSchema>>, ApiError> {
    let stores = state
        .blocking(move |explorer| explorer.list_stores(&database))
        .await??;
    Ok(Json(stores))
}

/// Schema of one store.
pub async fn store_schema(
    State(state): State<AppState>,
    Path((database, store)): Path<(String, String)>,
) -> Result<Json<StoreSchema>, ApiError> {
    let schema = state
        .blocking(move |explorer| explorer.store_schema(&database, &store))
        .await??;
    Ok(Json(schema))
}

/// One page of records.
pub async fn query_records(
    State(state): State<AppState>,
    Path((database, store)): Path<(String, String)>,
    Query(options): Query<QueryOptions>,
) -> Result<Json<QueryResult>, ApiError> {
    let page = state
        .blocking(move |explorer| explorer.query(&database, &store, &options))
        .await??;
    Ok(Json(page))
}

/// One record by key. The key is JSON text; text that is not JSON is taken
/// as a string key.
pub async fn get_record(
    State(state): State<AppState>,
    Path((database, store, key)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let parsed = parse_key(&key)?;
    let (db, name) = (database.clone(), store.clone());
    state
        .blocking(move |explorer| explorer.get_one(&db, &name, &parsed))
        .await??
        .map(Json)
        .ok_or_else(|| ApiError::record_not_found(&database, &store, &key))
}

fn parse_key(text: &str) -> Result<Key, ApiError> {
    let value = serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
    Key::from_value(&value).ok_or_else(|| {
        Error::from(EngineError::Data(format!("{} is not a valid key", value))).into()
    })
}
