//! HTTP route handlers: health, latest, status.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /favicon.ico
pub(crate) async fn handle_favicon() -> impl IntoResponse {
    Json(serde_json::json!({}))
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.health.check().await;
    let body = serde_json::to_value(state.envelope("/health", report));
    respond(body)
}

/// GET /latest
pub(crate) async fn handle_latest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.reporter.latest().await;
    let body = serde_json::to_value(state.envelope("/latest", report));
    respond(body)
}

/// GET /status
pub(crate) async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.reporter.status().await;
    let body = serde_json::to_value(state.envelope("/status", report));
    respond(body)
}

/// Every evaluation outcome, including `ERROR`, is a 200 with a JSON body.
fn respond(body: Result<serde_json::Value, serde_json::Error>) -> axum::response::Response {
    match body {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("serialization failed: {}", e),
        )
        .into_response(),
    }
}
