//! Error Responses
//!
//! Maps the invocation error taxonomy onto HTTP. The body is always the
//! serialized `InvokeError`, which is also what `HttpTransport` decodes on
//! the calling member.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hearth_core::InvokeError;

#[derive(Debug)]
pub struct ApiError(pub InvokeError);

impl From<InvokeError> for ApiError {
    fn from(error: InvokeError) -> Self {
        Self(error)
    }
}

pub fn status_for(error: &InvokeError) -> StatusCode {
    match error {
        InvokeError::UnknownKind { .. } => StatusCode::NOT_FOUND,
        InvokeError::NotOwner { .. } => StatusCode::CONFLICT,
        InvokeError::GrainFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        InvokeError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
        InvokeError::Unresolvable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InvokeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::GrainIdentity;

    #[test]
    fn test_status_mapping() {
        let id = GrainIdentity::new("bulb", "kitchen");
        assert_eq!(status_for(&InvokeError::NotOwner { current_version: 3 }), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&InvokeError::Unresolvable { identity: id.clone() }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&InvokeError::Timeout { identity: id, after_ms: 5 }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&InvokeError::UnknownKind { kind: "lamp".into() }),
            StatusCode::NOT_FOUND
        );
    }
}
