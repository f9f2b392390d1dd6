//! Member-to-member Transport
//!
//! `HttpTransport` carries `RemoteInvocation`s as JSON to the peer's
//! `POST /internal/v1/invoke` endpoint. The receive side lives in
//! `api::internal`.

mod http;

pub use http::{HttpTransport, INVOKE_PATH};
