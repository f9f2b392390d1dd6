//! Grain Call Endpoint
//!
//! `POST /grains/{kind}/{identity}/{method}` with an optional JSON body.
//! Any member accepts any call; the router forwards it to the owner.

use super::error::ApiError;
use super::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hearth_core::GrainMessage;
use serde_json::Value;

#[tracing::instrument(skip(state, body))]
pub async fn call_grain(
    State(state): State<AppState>,
    Path((kind, identity, method)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let payload = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => payload,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": "invalid_payload", "message": e.to_string() })),
                )
                    .into_response();
            }
        }
    };

    let grain = state.node.grain(kind, identity);
    match grain.send(GrainMessage::new(method, payload)).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
