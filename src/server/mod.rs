//! `snapwatch serve` -- HTTP JSON API over the evidence reporter.
//!
//! Endpoints:
//! - GET /health       - Snapshot/audit/state checks plus uptime metrics
//! - GET /latest       - Snapshot passthrough
//! - GET /status       - Freshness evaluation with evidence
//! - GET /favicon.ico  - Empty object
//!
//! All responses use Content-Type: application/json and carry the
//! deployment identity header.

mod handlers;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ResolvedConfig;

use self::handlers::{
    handle_favicon, handle_health, handle_latest, handle_not_found, handle_status,
};
pub use self::state::{AppState, Envelope};

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/latest", get(handle_latest))
        .route("/status", get(handle_status))
        .route("/favicon.ico", get(handle_favicon))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured address
pub async fn start_server(config: &ResolvedConfig) -> Result<()> {
    let state = Arc::new(AppState::new(
        config.storage(),
        config.reporter_settings(),
        Utc::now(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    info!(
        bind = %config.bind,
        snapshot = %config.snapshot.display(),
        "snapwatch listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
