//! The request/response contract over HTTP.

use axum::{Json, extract::State, http::StatusCode};

use crate::error::ErrorKind;
use crate::protocol::Response;

use super::super::{error::status_for, state::AppState};

/// Answer a contract request.
///
/// The body is always a contract response; the status code mirrors the
/// class of failure so HTTP tooling can tell outcomes apart.
pub async fn handle_request(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<Response>) {
    let response = match state.blocking(move |explorer| explorer.handle_json(&body)).await {
        Ok(response) => response,
        Err(err) => Response {
            success: false,
            data: None,
            error: Some(format!("Request task failed: {}", err)),
            kind: Some(ErrorKind::EngineIo),
        },
    };
    let status = match response.kind {
        Some(kind) if !response.success => status_for(kind),
        _ => StatusCode::OK,
    };
    (status, Json(response))
}
