//! Request Router
//!
//! Resolves a grain identity to its owning member under the current view
//! and either dispatches locally or forwards through the transport.
//!
//! ```text
//! invoke(identity)
//!    ↓ owner_of(identity, current view)
//!    ├── none  → Unresolvable
//!    ├── local → ActivationManager::invoke
//!    └── remote → Transport::send ──▶ peer Router::handle_remote
//!                     ↓ NotOwner(v)
//!                 wait for view ≥ v (bounded), resolve once more
//! ```
//!
//! There is no retry beyond the single `NotOwner` re-resolution; callers
//! decide whether to try again.

mod grain_ref;

pub use grain_ref::GrainRef;

use crate::activation::ActivationManager;
use crate::config::RuntimeConfig;
use crate::error::InvokeError;
use crate::grain::{GrainMessage, GrainRegistry};
use crate::identity::{GrainIdentity, MemberId};
use crate::membership::{Membership, MembershipView};
use crate::observability::metrics;
use crate::partition;
use crate::transport::{RemoteInvocation, Transport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Where an attempt was sent; used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Local,
    Remote,
    Unresolved,
}

impl Route {
    fn as_str(self) -> &'static str {
        match self {
            Route::Local => "local",
            Route::Remote => "remote",
            Route::Unresolved => "unresolved",
        }
    }
}

pub struct Router {
    local: MemberId,
    membership: Arc<Membership>,
    activations: Arc<ActivationManager>,
    transport: Arc<dyn Transport>,
    config: RuntimeConfig,
}

impl Router {
    pub fn new(
        local: MemberId,
        membership: Arc<Membership>,
        registry: GrainRegistry,
        transport: Arc<dyn Transport>,
        config: RuntimeConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|router| Self {
            activations: Arc::new(ActivationManager::new(
                local.clone(),
                registry,
                config.clone(),
                router.clone(),
            )),
            local,
            membership,
            transport,
            config,
        })
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local
    }

    pub fn membership(&self) -> &Arc<Membership> {
        &self.membership
    }

    pub fn activations(&self) -> &Arc<ActivationManager> {
        &self.activations
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Location-transparent handle to `kind/identity`.
    pub fn grain(self: &Arc<Self>, kind: impl Into<String>, identity: impl Into<String>) -> GrainRef {
        GrainRef::new(Arc::clone(self), GrainIdentity::new(kind, identity))
    }

    /// Owner of `identity` under the current view.
    pub fn owner_of(&self, identity: &GrainIdentity) -> Option<MemberId> {
        partition::owner_of(identity, &self.membership.current())
    }

    /// Deliver `message` to the grain wherever it lives.
    pub async fn invoke(
        &self,
        identity: &GrainIdentity,
        message: GrainMessage,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let started = Instant::now();
        let deadline = started + timeout;

        let view = self.membership.current();
        let (mut route, mut result) = self.attempt(identity, &message, &view, deadline).await;

        if let Err(InvokeError::NotOwner { current_version }) = &result {
            let hint = *current_version;
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .min(self.config.not_owner_refresh_wait);
            debug!(
                grain = %identity,
                view_version = view.version(),
                hint_version = hint,
                wait_ms = wait.as_millis() as u64,
                "Owner rejected call, refreshing view"
            );
            let refreshed = self.membership.wait_for_version(hint, wait).await;
            (route, result) = self.attempt(identity, &message, &refreshed, deadline).await;
        }

        metrics::record_invocation(route.as_str(), outcome(&result), started.elapsed());
        result
    }

    async fn attempt(
        &self,
        identity: &GrainIdentity,
        message: &GrainMessage,
        view: &MembershipView,
        deadline: Instant,
    ) -> (Route, Result<Value, InvokeError>) {
        let Some(owner) = partition::owner_of(identity, view) else {
            return (
                Route::Unresolved,
                Err(InvokeError::Unresolvable {
                    identity: identity.clone(),
                }),
            );
        };
        let remaining = deadline.saturating_duration_since(Instant::now());

        if owner == self.local {
            let result = self.activations.invoke(identity, message.clone(), remaining).await;
            return (Route::Local, result);
        }

        let invocation = RemoteInvocation {
            identity: identity.clone(),
            message: message.clone(),
            view_version: view.version(),
            timeout_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
        };
        let result = match tokio::time::timeout(remaining, self.transport.send(&owner, invocation, remaining)).await {
            Ok(result) => result,
            Err(_) => Err(InvokeError::Unreachable {
                member: owner,
                reason: format!("no reply within {}ms", remaining.as_millis()),
            }),
        };
        (Route::Remote, result)
    }

    /// Receive side of a transport: serve an invocation forwarded by a peer.
    ///
    /// Answers `NotOwner` with this member's view version when the identity
    /// does not belong here. When the sender resolved with a newer view than
    /// ours, waits briefly for that view first.
    pub async fn handle_remote(&self, invocation: RemoteInvocation) -> Result<Value, InvokeError> {
        let started = Instant::now();
        let timeout = invocation.timeout();

        let mut view = self.membership.current();
        if invocation.view_version > view.version() {
            let wait = timeout.min(self.config.not_owner_refresh_wait);
            view = self.membership.wait_for_version(invocation.view_version, wait).await;
        }

        let result = if partition::is_local(&invocation.identity, &view, &self.local) {
            let remaining = timeout.saturating_sub(started.elapsed());
            self.activations
                .invoke(&invocation.identity, invocation.message, remaining)
                .await
        } else {
            debug!(
                grain = %invocation.identity,
                sender_version = invocation.view_version,
                local_version = view.version(),
                "Rejecting call for grain owned elsewhere"
            );
            Err(InvokeError::NotOwner {
                current_version: view.version(),
            })
        };

        metrics::record_invocation("inbound", outcome(&result), started.elapsed());
        result
    }
}

fn outcome(result: &Result<Value, InvokeError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.label(),
    }
}
