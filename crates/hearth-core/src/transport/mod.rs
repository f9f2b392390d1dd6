//! Transport Seam
//!
//! How one member hands an invocation to another. The runtime only needs
//! point-to-point request/response with a per-call timeout; the host picks
//! the wire (HTTP in `hearth-server`, in-process channels for tests).

mod memory;

pub use memory::InMemoryTransport;

use crate::error::InvokeError;
use crate::grain::GrainMessage;
use crate::identity::{GrainIdentity, MemberId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// An invocation forwarded to the member believed to own the grain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteInvocation {
    pub identity: GrainIdentity,
    pub message: GrainMessage,
    /// Version of the view the sender resolved the owner with
    pub view_version: u64,
    /// Time the sender is still willing to wait
    pub timeout_ms: u64,
}

impl RemoteInvocation {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Sends invocations to other members.
///
/// Implementations must give up after `timeout` and report `Unreachable`
/// for connection failures. Errors produced by the remote member (such as
/// `NotOwner` or `GrainFault`) are returned unchanged.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(
        &self,
        target: &MemberId,
        invocation: RemoteInvocation,
        timeout: Duration,
    ) -> Result<Value, InvokeError>;
}
