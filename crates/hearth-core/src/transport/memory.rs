//! In-process Transport
//!
//! Connects several `Router`s living in one process. Used by tests and by
//! single-process clusters. Members can be cut off to simulate a network
//! partition or a crashed process.

use super::{RemoteInvocation, Transport};
use crate::error::InvokeError;
use crate::identity::MemberId;
use crate::router::Router;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::trace;

#[derive(Default)]
pub struct InMemoryTransport {
    routers: RwLock<HashMap<MemberId, Weak<Router>>>,
    partitioned: RwLock<HashSet<MemberId>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `router` reachable as `member`.
    pub fn register(&self, member: MemberId, router: &Arc<Router>) {
        self.routers.write().insert(member, Arc::downgrade(router));
    }

    pub fn deregister(&self, member: &MemberId) {
        self.routers.write().remove(member);
    }

    /// Every call to `member` fails with `Unreachable` until [`heal`](Self::heal).
    pub fn partition(&self, member: &MemberId) {
        self.partitioned.write().insert(member.clone());
    }

    pub fn heal(&self, member: &MemberId) {
        self.partitioned.write().remove(member);
    }

    fn resolve(&self, target: &MemberId) -> Result<Arc<Router>, InvokeError> {
        if self.partitioned.read().contains(target) {
            return Err(unreachable(target, "member is partitioned"));
        }
        self.routers
            .read()
            .get(target)
            .and_then(Weak::upgrade)
            .ok_or_else(|| unreachable(target, "no such member"))
    }
}

fn unreachable(target: &MemberId, reason: impl Into<String>) -> InvokeError {
    InvokeError::Unreachable {
        member: target.clone(),
        reason: reason.into(),
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(
        &self,
        target: &MemberId,
        invocation: RemoteInvocation,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let router = self.resolve(target)?;
        trace!(target = %target, grain = %invocation.identity, "In-memory send");

        match tokio::time::timeout(timeout, router.handle_remote(invocation)).await {
            Ok(result) => result,
            Err(_) => Err(unreachable(
                target,
                format!("no reply within {}ms", timeout.as_millis()),
            )),
        }
    }
}
