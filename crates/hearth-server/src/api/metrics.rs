//! GET /metrics
//!
//! Prometheus text for the runtime's activation, invocation and topology
//! metrics. Answers 503 when the server was built without a recorder.

use super::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[tracing::instrument(skip_all)]
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let Some(metrics) = state.metrics_state.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response();
    };
    ([(axum::http::header::CONTENT_TYPE, PROMETHEUS_TEXT)], metrics.render()).into_response()
}
