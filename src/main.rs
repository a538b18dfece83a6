// =============================================================================
// Aggregate Dashboard — Main Entry Point
// =============================================================================
//
// Serves a periodically refreshed view of the producer's buy/sell minute
// aggregates. The store is only ever read; a missing or broken store fails
// individual ticks without taking the server down.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod dashboard;
mod refresh;
mod render;
mod store;
mod timestamp;
mod types;

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Aggregate dashboard starting up");

    let config = DashboardConfig::from_env();
    info!(
        db_path = %config.db_path.display(),
        bind_addr = %config.bind_addr,
        refresh_interval_ms = config.refresh_interval_ms,
        "Configuration resolved"
    );
    if !config.db_path.exists() {
        warn!(
            db_path = %config.db_path.display(),
            "Store not found (ticks fail until the producer creates it)"
        );
    }

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Refresh driver ────────────────────────────────────────────────
    let driver_state = state.clone();
    let driver = tokio::spawn(async move {
        refresh::run(driver_state).await;
    });

    // ── 4. HTTP server ───────────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening");

    tokio::select! {
        res = axum::serve(listener, app).into_future() => {
            if let Err(e) = res {
                error!(error = %e, "HTTP server failed");
                return Err(e.into());
            }
        }
        res = driver => {
            error!(result = ?res, "Refresh driver exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Aggregate dashboard stopped");
    Ok(())
}
