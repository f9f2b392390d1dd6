//! Grain Context
//!
//! Handed to every grain callback. Lets a grain learn where it runs and call
//! other grains without knowing where they live.

use super::GrainMessage;
use crate::error::InvokeError;
use crate::identity::{GrainIdentity, MemberId};
use crate::router::Router;
use serde_json::Value;
use std::sync::Weak;
use std::time::Duration;

#[derive(Clone)]
pub struct GrainContext {
    identity: GrainIdentity,
    member: MemberId,
    router: Weak<Router>,
}

impl GrainContext {
    pub(crate) fn new(identity: GrainIdentity, member: MemberId, router: Weak<Router>) -> Self {
        Self {
            identity,
            member,
            router,
        }
    }

    /// Identity of the grain this context belongs to.
    pub fn identity(&self) -> &GrainIdentity {
        &self.identity
    }

    /// Member hosting this activation.
    pub fn member(&self) -> &MemberId {
        &self.member
    }

    /// Call another grain through the router using the default call timeout.
    ///
    /// Calling the grain's own identity from inside its handler waits on its
    /// own mailbox and ends in `Timeout`.
    pub async fn call(&self, target: &GrainIdentity, message: GrainMessage) -> Result<Value, InvokeError> {
        let router = self.router()?;
        let timeout = router.config().call_timeout;
        router.invoke(target, message, timeout).await
    }

    /// Call another grain with an explicit deadline.
    pub async fn call_with_timeout(
        &self,
        target: &GrainIdentity,
        message: GrainMessage,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        self.router()?.invoke(target, message, timeout).await
    }

    fn router(&self) -> Result<std::sync::Arc<Router>, InvokeError> {
        self.router.upgrade().ok_or_else(|| InvokeError::Unreachable {
            member: self.member.clone(),
            reason: "runtime is shutting down".to_string(),
        })
    }
}

impl std::fmt::Debug for GrainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrainContext")
            .field("identity", &self.identity)
            .field("member", &self.member)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_after_router_dropped_is_unreachable() {
        let ctx = GrainContext::new(
            GrainIdentity::new("bulb", "kitchen"),
            MemberId::new("m1:7000"),
            Weak::new(),
        );

        let err = ctx
            .call(&GrainIdentity::new("house", "home"), GrainMessage::method("get_state"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Unreachable { .. }));
    }
}
