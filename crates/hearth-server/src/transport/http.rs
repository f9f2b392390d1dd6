//! HTTP Transport
//!
//! Client side of the member-to-member wire. A member id is the peer's
//! advertised `host:port`, so no address lookup is needed.
//!
//! Wire contract:
//! - request body: `RemoteInvocation` as JSON
//! - 2xx: the grain's reply value as JSON
//! - anything else: an `InvokeError` as JSON, passed back unchanged
//!
//! Connection failures, timeouts and bodies that are not an `InvokeError`
//! surface as `Unreachable`.

use async_trait::async_trait;
use hearth_core::{InvokeError, MemberId, RemoteInvocation, Transport};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Path of the receive endpoint on every member.
pub const INVOKE_PATH: &str = "/internal/v1/invoke";

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose connections give up after `connect_timeout`.
    ///
    /// The overall deadline is set per call from the caller's timeout.
    pub fn new(connect_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }

    fn invoke_url(target: &MemberId) -> String {
        format!("http://{target}{INVOKE_PATH}")
    }
}

fn unreachable(target: &MemberId, reason: impl Into<String>) -> InvokeError {
    InvokeError::Unreachable {
        member: target.clone(),
        reason: reason.into(),
    }
}

fn describe(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("no reply within {}ms", timeout.as_millis())
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        target: &MemberId,
        invocation: RemoteInvocation,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        trace!(
            target = %target,
            grain = %invocation.identity,
            method = %invocation.message.method,
            view_version = invocation.view_version,
            "Forwarding invocation"
        );

        let response = self
            .client
            .post(Self::invoke_url(target))
            .timeout(timeout)
            .json(&invocation)
            .send()
            .await
            .map_err(|e| unreachable(target, describe(&e, timeout)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| unreachable(target, describe(&e, timeout)))?;

        if status.is_success() {
            return serde_json::from_slice(&body)
                .map_err(|e| unreachable(target, format!("invalid reply body: {e}")));
        }

        match serde_json::from_slice::<InvokeError>(&body) {
            Ok(error) => {
                debug!(target = %target, status = %status, error = %error, "Peer rejected invocation");
                Err(error)
            }
            Err(_) => Err(unreachable(target, format!("unexpected status {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::{GrainIdentity, GrainMessage};

    fn invocation() -> RemoteInvocation {
        RemoteInvocation {
            identity: GrainIdentity::new("bulb", "kitchen"),
            message: GrainMessage::method("get_state"),
            view_version: 4,
            timeout_ms: 200,
        }
    }

    #[test]
    fn test_invoke_url_uses_member_address() {
        assert_eq!(
            HttpTransport::invoke_url(&MemberId::new("10.0.0.7:7000")),
            "http://10.0.0.7:7000/internal/v1/invoke"
        );
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let target = MemberId::new(addr.to_string());
        let err = transport
            .send(&target, invocation(), Duration::from_millis(300))
            .await
            .unwrap_err();

        match err {
            InvokeError::Unreachable { member, .. } => assert_eq!(member, target),
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }
}
