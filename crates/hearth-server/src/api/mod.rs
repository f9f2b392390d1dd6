//! HTTP API Module
//!
//! REST API endpoints for the hearth server.
//!
//! This module contains:
//! - `state`: Shared application state
//! - `health`: Liveness and readiness probes
//! - `cluster`: Membership view and local activations
//! - `grains`: Location-transparent grain calls
//! - `internal`: Receive side of the member-to-member transport
//! - `metrics`: Prometheus metrics endpoint

mod cluster;
mod error;
mod grains;
mod health;
mod internal;
mod metrics;
mod state;

pub use error::{status_for, ApiError};
pub use state::AppState;

use crate::transport::INVOKE_PATH;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Observability
        .route("/metrics", get(metrics::get_metrics))
        // Cluster diagnostics
        .route("/cluster/members", get(cluster::get_members))
        .route("/cluster/activations", get(cluster::get_activations))
        // Grain calls
        .route("/grains/{kind}/{identity}/{method}", post(grains::call_grain))
        // Member-to-member transport
        .route(INVOKE_PATH, post(internal::invoke))
        .with_state(state)
}
