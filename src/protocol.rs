//! Request/response contract spoken with the inspection UI.
//!
//! Requests are JSON objects tagged by `action`:
//!
//! ```json
//! { "action": "GET_TABLE_DATA", "dbName": "app", "storeName": "users",
//!   "options": { "search": "ada", "orderBy": "name", "limit": 25 } }
//! ```
//!
//! Every response is `{ "success": true, "data": ... }` or
//! `{ "success": false, "error": "..." }`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::engine::{Engine, EngineError};
use crate::error::{Error, ErrorKind, Result};
use crate::explorer::{Explorer, QueryOptions, require_database, require_key, require_record, require_store};
use crate::logging::debug;
use crate::value::Key;

/// Every action understood by [`Request`].
pub const ACTIONS: &[&str] = &[
    "GET_DATABASES",
    "GET_DATABASE_STORES",
    "GET_TABLE_DATA",
    "GET_TABLE_SCHEMA",
    "GET_SAMPLE_DATA",
    "CREATE_RECORD",
    "UPDATE_RECORD",
    "DELETE_RECORD",
    "GET_RECORD",
];

/// A request from the UI.
///
/// Fields are optional on the wire; missing required fields are reported
/// before the engine is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    GetDatabases,
    #[serde(rename_all = "camelCase")]
    GetDatabaseStores { db_name: Option<String> },
    #[serde(rename_all = "camelCase")]
    GetTableData {
        db_name: Option<String>,
        store_name: Option<String>,
        options: Option<QueryOptions>,
    },
    #[serde(rename_all = "camelCase")]
    GetTableSchema {
        db_name: Option<String>,
        store_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GetSampleData {
        db_name: Option<String>,
        store_name: Option<String>,
        sample_size: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    CreateRecord {
        db_name: Option<String>,
        store_name: Option<String>,
        record: Option<Value>,
        key: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateRecord {
        db_name: Option<String>,
        store_name: Option<String>,
        record: Option<Value>,
        key: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    DeleteRecord {
        db_name: Option<String>,
        store_name: Option<String>,
        record: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    GetRecord {
        db_name: Option<String>,
        store_name: Option<String>,
        key: Option<Value>,
    },
}

impl Request {
    /// The wire name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetDatabases => "GET_DATABASES",
            Self::GetDatabaseStores { .. } => "GET_DATABASE_STORES",
            Self::GetTableData { .. } => "GET_TABLE_DATA",
            Self::GetTableSchema { .. } => "GET_TABLE_SCHEMA",
            Self::GetSampleData { .. } => "GET_SAMPLE_DATA",
            Self::CreateRecord { .. } => "CREATE_RECORD",
            Self::UpdateRecord { .. } => "UPDATE_RECORD",
            Self::DeleteRecord { .. } => "DELETE_RECORD",
            Self::GetRecord { .. } => "GET_RECORD",
        }
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Class of the failure; not part of the wire format.
    #[serde(skip)]
    pub kind: Option<ErrorKind>,
}

impl Response {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            kind: None,
        }
    }

    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }

    /// A failure that is not tied to an operation (bad JSON, unknown action).
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            kind: Some(ErrorKind::InvalidArgument),
        }
    }
}

fn name(value: Option<String>) -> String {
    value.unwrap_or_default()
}

fn present(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}

fn to_key(value: Value) -> Result<Key> {
    Key::from_value(&value)
        .ok_or_else(|| EngineError::Data(format!("{} is not a valid key", value)).into())
}

fn optional_key(value: Option<Value>) -> Result<Option<Key>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => to_key(value).map(Some),
    }
}

impl<E: Engine> Explorer<E> {
    /// Answer a request.
    pub fn handle(&self, request: Request) -> Response {
        let action = request.action();
        match self.dispatch(request) {
            Ok(data) => Response::ok(data),
            Err(err) => {
                debug!(action, error = %err, "request failed");
                Response::failure(&err)
            }
        }
    }

    /// Answer a request given as JSON text.
    pub fn handle_json(&self, body: &str) -> Response {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(err) => return Response::rejected(err.to_string()),
        };
        self.handle_value(value)
    }

    /// Answer a request given as a JSON value.
    pub fn handle_value(&self, value: Value) -> Response {
        let action = match value.get("action") {
            Some(Value::String(action)) => action.clone(),
            Some(other) => return Response::rejected(format!("Unknown action: {}", other)),
            None => return Response::rejected("Unknown action: undefined"),
        };
        if !ACTIONS.contains(&action.as_str()) {
            return Response::rejected(format!("Unknown action: {}", action));
        }
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(request),
            Err(err) => Response::rejected(err.to_string()),
        }
    }

    fn dispatch(&self, request: Request) -> Result<Option<Value>> {
        let data = match request {
            Request::GetDatabases => serde_json::to_value(self.list_databases())?,
            Request::GetDatabaseStores { db_name } => {
                let db = name(db_name);
                require_database(&db)?;
                serde_json::to_value(self.list_stores(&db)?)?
            }
            Request::GetTableData {
                db_name,
                store_name,
                options,
            } => {
                let (db, store) = (name(db_name), name(store_name));
                require_store(&db, &store)?;
                serde_json::to_value(self.query(&db, &store, &options.unwrap_or_default())?)?
            }
            Request::GetTableSchema {
                db_name,
                store_name,
            } => {
                let (db, store) = (name(db_name), name(store_name));
                require_store(&db, &store)?;
                serde_json::to_value(self.store_schema(&db, &store)?)?
            }
            Request::GetSampleData {
                db_name,
                store_name,
                sample_size,
            } => {
                let (db, store) = (name(db_name), name(store_name));
                require_store(&db, &store)?;
                Value::Array(self.sample(&db, &store, sample_size)?)
            }
            Request::CreateRecord {
                db_name,
                store_name,
                record,
                key,
            } => {
                let (db, store, record) = (name(db_name), name(store_name), present(record));
                require_record(&db, &store, &record)?;
                let key = self.create(&db, &store, record, optional_key(key)?)?;
                json!({ "key": key })
            }
            Request::UpdateRecord {
                db_name,
                store_name,
                record,
                key,
            } => {
                let (db, store, record) = (name(db_name), name(store_name), present(record));
                require_record(&db, &store, &record)?;
                self.update(&db, &store, record, optional_key(key)?)?;
                json!({ "message": "Record updated successfully" })
            }
            Request::DeleteRecord {
                db_name,
                store_name,
                record,
            } => {
                let (db, store, record) = (name(db_name), name(store_name), present(record));
                require_record(&db, &store, &record)?;
                self.delete(&db, &store, &record)?;
                json!({ "message": "Record deleted successfully" })
            }
            Request::GetRecord {
                db_name,
                store_name,
                key,
            } => {
                let (db, store, key) = (name(db_name), name(store_name), present(key));
                if key.is_null() {
                    return Err(Error::invalid_argument(
                        "Database name, store name, and key are required",
                    ));
                }
                require_key(&db, &store)?;
                return Ok(self.get_one(&db, &store, &to_key(key)?)?);
            }
        };
        Ok(Some(data))
    }
}
