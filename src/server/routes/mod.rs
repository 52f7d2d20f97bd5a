//! API routes and handlers.

mod databases;
mod requests;

use axum::{
    Router,
    routing::{get, post},
};

use super::state::AppState;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let store_routes = Router::new()
        .route("/schema", get(databases::store_schema))
        .route("/records", get(databases::query_records))
        .route("/records/{key}", get(databases::get_record));

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/requests", post(requests::handle_request))
        .route("/api/v1/databases", get(databases::list_databases))
        .route("/api/v1/databases/{database}/stores", get(databases::list_stores))
        .nest("/api/v1/databases/{database}/stores/{store}", store_routes)
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}
