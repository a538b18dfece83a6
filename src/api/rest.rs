// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// `/` serves the dashboard page; JSON endpoints live under `/api/v1/`. None of
// the endpoints trigger a refresh: they only read what the refresh driver last
// published.
//
// CORS is configured permissively; the dashboard is read-only.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;
use crate::dashboard::dashboard_html;
use crate::types::DriverPhase;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(page))
        .route("/api/v1/health", get(health))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/errors", get(errors))
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Page
// =============================================================================

async fn page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(dashboard_html(
        &state.config.title,
        state.config.refresh_interval_ms,
    ))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    phase: DriverPhase,
    has_data: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        phase: state.current_phase(),
        has_data: state.published.read().is_some(),
    };
    Json(resp)
}

// =============================================================================
// Dashboard snapshot
// =============================================================================

async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Error log
// =============================================================================

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

// =============================================================================
// Tests
// =============================================================================
