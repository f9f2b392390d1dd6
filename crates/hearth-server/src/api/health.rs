//! Health Check Endpoints
//!
//! Liveness and readiness probe handlers.

use super::state::AppState;
use axum::{extract::State, http::StatusCode};

/// Liveness probe endpoint. The process answers, so it is alive.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe endpoint. Ready once this member is Active in its own
/// membership view, i.e. it may own grains.
#[tracing::instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    let view = state.node.membership().current();
    if view.is_active(state.node.member()) {
        Ok("READY")
    } else {
        tracing::debug!(version = view.version(), "Not active in current view");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
