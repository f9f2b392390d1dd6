//! Grain Reference
//!
//! Caller-facing handle to a grain. Works the same whether the grain lives
//! on this member, another member, or nowhere yet.

use super::Router;
use crate::error::InvokeError;
use crate::grain::GrainMessage;
use crate::identity::GrainIdentity;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct GrainRef {
    router: Arc<Router>,
    identity: GrainIdentity,
}

impl GrainRef {
    pub(crate) fn new(router: Arc<Router>, identity: GrainIdentity) -> Self {
        Self { router, identity }
    }

    pub fn identity(&self) -> &GrainIdentity {
        &self.identity
    }

    /// Call `method` with `payload` using the default call timeout.
    pub async fn call(&self, method: &str, payload: Value) -> Result<Value, InvokeError> {
        self.send(GrainMessage::new(method, payload)).await
    }

    pub async fn send(&self, message: GrainMessage) -> Result<Value, InvokeError> {
        let timeout = self.router.config().call_timeout;
        self.router.invoke(&self.identity, message, timeout).await
    }

    pub async fn send_with_timeout(&self, message: GrainMessage, timeout: Duration) -> Result<Value, InvokeError> {
        self.router.invoke(&self.identity, message, timeout).await
    }
}

impl std::fmt::Debug for GrainRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GrainRef").field(&self.identity).finish()
    }
}
