use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when push delivery is disabled.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether VAPID credentials are configured.
    pub push_enabled: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let push_enabled = state.push_enabled();

    Json(HealthResponse {
        status: if push_enabled { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        push_enabled,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
