//! Transport Receive Endpoint
//!
//! `POST /internal/v1/invoke` serves invocations forwarded by peers'
//! `HttpTransport`.

use super::error::ApiError;
use super::state::AppState;
use axum::{extract::State, response::Json};
use hearth_core::RemoteInvocation;
use serde_json::Value;

#[tracing::instrument(skip_all, fields(grain = %invocation.identity, view_version = invocation.view_version))]
pub async fn invoke(
    State(state): State<AppState>,
    Json(invocation): Json<RemoteInvocation>,
) -> Result<Json<Value>, ApiError> {
    let reply = state.node.router().handle_remote(invocation).await?;
    Ok(Json(reply))
}
