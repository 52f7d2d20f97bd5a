//! Integration tests for the idb-explorer HTTP API server.
//!
//! These tests use axum-test to make requests against the router without starting a real server.

#![cfg(feature = "server")]

mod common;

use axum::http::StatusCode;
use std::future::IntoFuture;

use common::{TestApp, user};
use serde_json::{Value, json};

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = TestApp::with_users(0)?;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("ok");
    Ok(())
}

// =============================================================================
// Request Contract Tests
// =============================================================================

#[tokio::test]
async fn test_request_get_databases() -> anyhow::Result<()> {
    let app = TestApp::with_users(2)?;

    let response = app
        .server
        .post("/api/v1/requests")
        .json(&json!({"action": "GET_DATABASES"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"][0]["name"], json!("app"));
    assert_eq!(body["data"][0]["storeCount"], json!(1));
    Ok(())
}

#[tokio::test]
async fn test_request_table_data() -> anyhow::Result<()> {
    let app = TestApp::with_users(12)?;

    let response = app
        .server
        .post("/api/v1/requests")
        .json(&json!({
            "action": "GET_TABLE_DATA",
            "dbName": "app",
            "storeName": "users",
            "options": {"orderBy": "age", "direction": "desc", "limit": 4}
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["totalCount"], json!(12));
    assert_eq!(body["data"]["data"].as_array().map(Vec::len), Some(4));
    assert_eq!(body["data"]["data"][0]["age"], json!(32));
    Ok(())
}

#[tokio::test]
async fn test_request_failures_map_to_status() -> anyhow::Result<()> {
    let app = TestApp::with_users(1)?;

    let cases = [
        (
            json!({"action": "GET_DATABASE_STORES"}),
            StatusCode::BAD_REQUEST,
            "Database name is required",
        ),
        (
            json!({"action": "SHUTDOWN"}),
            StatusCode::BAD_REQUEST,
            "Unknown action: SHUTDOWN",
        ),
    ];
    for (request, status, message) in cases {
        let response = app.server.post("/api/v1/requests").json(&request).await;
        response.assert_status(status);
        let body: Value = response.json();
        assert_eq!(body, json!({"success": false, "error": message}));
    }

    let response = app
        .server
        .post("/api/v1/requests")
        .json(&json!({"action": "GET_TABLE_SCHEMA", "dbName": "app", "storeName": "ghosts"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app
        .server
        .post("/api/v1/requests")
        .json(&json!({
            "action": "CREATE_RECORD",
            "dbName": "app",
            "storeName": "users",
            "record": {"id": 1, "name": "duplicate"}
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn test_request_malformed_body() -> anyhow::Result<()> {
    let app = TestApp::with_users(0)?;

    let response = app
        .server
        .post("/api/v1/requests")
        .text("{\"action\": ")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_request_record_roundtrip() -> anyhow::Result<()> {
    let app = TestApp::with_users(0)?;

    let response = app
        .server
        .post("/api/v1/requests")
        .json(&json!({
            "action": "CREATE_RECORD",
            "dbName": "app",
            "storeName": "users",
            "record": {"name": "Ada", "age": 36}
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], json!({"key": 1}));

    let response = app.server.get("/api/v1/databases/app/stores/users/records/1").await;
    response.assert_status_ok();
    let record: Value = response.json();
    assert_eq!(record, json!({"id": 1, "name": "Ada", "age": 36}));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_keys() -> anyhow::Result<()> {
    let app = TestApp::with_users(0)?;

    let create = |n: usize| {
        app.server
            .post("/api/v1/requests")
            .json(&json!({
                "action": "CREATE_RECORD",
                "dbName": "app",
                "storeName": "users",
                "record": user(n)
            }))
            .into_future()
    };
    let (a, b, c, d) = tokio::join!(create(1), create(2), create(3), create(4));

    let mut keys = Vec::new();
    for response in [a, b, c, d] {
        response.assert_status_ok();
        let body: Value = response.json();
        keys.push(body["data"]["key"].as_u64());
    }
    keys.sort();
    assert_eq!(keys, vec![Some(1), Some(2), Some(3), Some(4)]);

    let response = app.server.get("/api/v1/databases/app/stores/users/records").await;
    let page: Value = response.json();
    assert_eq!(page["totalCount"], json!(4));
    Ok(())
}

// =============================================================================
// REST View Tests
// =============================================================================

#[tokio::test]
async fn test_list_databases() -> anyhow::Result<()> {
    let app = TestApp::with_users(3)?;

    let response = app.server.get("/api/v1/databases").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!([{"name": "app", "version": 1, "storeNames": ["users"], "storeCount": 1}])
    );
    Ok(())
}

#[tokio::test]
async fn test_list_stores_and_schema() -> anyhow::Result<()> {
    let app = TestApp::with_users(5)?;

    let response = app.server.get("/api/v1/databases/app/stores").await;
    response.assert_status_ok();
    let stores: Value = response.json();
    assert_eq!(stores[0]["name"], json!("users"));
    assert_eq!(stores[0]["recordCount"], json!(5));

    let response = app.server.get("/api/v1/databases/app/stores/users/schema").await;
    response.assert_status_ok();
    let schema: Value = response.json();
    assert_eq!(schema["keyPath"], json!("id"));
    assert_eq!(schema["autoIncrement"], json!(true));

    let response = app.server.get("/api/v1/databases/app/stores/ghosts/schema").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"].as_str(), Some("STORE_NOT_FOUND"));
    Ok(())
}

#[tokio::test]
async fn test_query_records() -> anyhow::Result<()> {
    let app = TestApp::with_users(20)?;

    let response = app
        .server
        .get("/api/v1/databases/app/stores/users/records")
        .add_query_param("search", "lisbon")
        .add_query_param("orderBy", "name")
        .add_query_param("direction", "desc")
        .add_query_param("limit", "3")
        .add_query_param("offset", "1")
        .await;

    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["totalCount"], json!(20));
    assert_eq!(page["filteredCount"], json!(10));
    let names: Vec<_> = page["data"]
        .as_array()
        .map(|records| records.iter().map(|r| r["name"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec![json!("user-018"), json!("user-016"), json!("user-014")]);
    Ok(())
}

#[tokio::test]
async fn test_get_record_not_found() -> anyhow::Result<()> {
    let app = TestApp::with_users(2)?;

    let response = app.server.get("/api/v1/databases/app/stores/users/records/999").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"].as_str(), Some("RECORD_NOT_FOUND"));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_connections() -> anyhow::Result<()> {
    let app = TestApp::with_users(2)?;

    app.server
        .get("/api/v1/databases/app/stores/users/records")
        .await
        .assert_status_ok();
    assert_eq!(app.state.explorer().cached_connections(), 1);

    app.state.shutdown();
    assert_eq!(app.state.explorer().cached_connections(), 0);
    Ok(())
}
