//! ActivationManager
//!
//! Creates and destroys grain activations on this member.
//!
//! Responsibilities:
//! - Resolve the grain kind and spawn one `GrainActivation` actor per identity
//! - Deliver messages through the activation's mailbox with a deadline
//! - Drain and stop activations on eviction (idle, rebalance, shutdown)
//! - Periodically sweep idle activations

use super::actor::GrainActivation;
use super::handle::{ActivationHandle, ActivationInfo};
use super::messages::{Activate, Deactivate, HandlerOutcome, Invoke};
use crate::config::RuntimeConfig;
use crate::directory::GrainDirectory;
use crate::error::InvokeError;
use crate::grain::{GrainContext, GrainMessage, GrainRegistry};
use crate::identity::{GrainIdentity, MemberId};
use crate::observability::{events, metrics};
use crate::partition;
use crate::router::Router;
use kameo::error::SendError;
use kameo::prelude::*;
use serde_json::Value;
use std::sync::atomic::AtomicI64;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Why an activation is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationReason {
    /// No dispatch within the idle window.
    IdleTimeout,
    /// Ownership moved to another member.
    Rebalance,
    /// Requested by the host application.
    ExplicitRequest,
    /// The member is shutting down.
    NodeShutdown,
}

impl DeactivationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeactivationReason::IdleTimeout => "idle",
            DeactivationReason::Rebalance => "rebalance",
            DeactivationReason::ExplicitRequest => "explicit",
            DeactivationReason::NodeShutdown => "shutdown",
        }
    }
}

/// Outcome of handing one message to an activation.
enum Delivery {
    Completed(Value),
    Failed(String),
    /// The activation stopped before the message reached the grain.
    Stopped,
}

/// Owns this member's grain directory and the activations in it.
pub struct ActivationManager {
    local: MemberId,
    registry: GrainRegistry,
    directory: GrainDirectory,
    router: Weak<Router>,
    config: RuntimeConfig,
}

impl ActivationManager {
    pub(crate) fn new(local: MemberId, registry: GrainRegistry, config: RuntimeConfig, router: Weak<Router>) -> Self {
        Self {
            local,
            registry,
            directory: GrainDirectory::new(config.directory_shards),
            router,
            config,
        }
    }

    pub fn directory(&self) -> &GrainDirectory {
        &self.directory
    }

    pub fn registry(&self) -> &GrainRegistry {
        &self.registry
    }

    /// Build a fresh activation for `identity` and run its `on_activate`.
    ///
    /// The caller registers the result; on failure nothing stays running.
    pub async fn create(&self, identity: &GrainIdentity) -> Result<ActivationHandle, InvokeError> {
        // A call routed under an older view must not resurrect a grain that
        // rebalancing just moved away.
        if let Some(router) = self.router.upgrade() {
            let view = router.membership().current();
            if !partition::is_local(identity, &view, &self.local) {
                return Err(InvokeError::NotOwner {
                    current_version: view.version(),
                });
            }
        }

        let grain = self.registry.create(identity)?;
        let last_activity = Arc::new(AtomicI64::new(chrono::Utc::now().timestamp_millis()));
        let ctx = GrainContext::new(identity.clone(), self.local.clone(), self.router.clone());

        let actor_ref = GrainActivation::spawn(GrainActivation::new(grain, ctx, last_activity.clone()));

        match actor_ref.ask(Activate).send().await {
            Ok(HandlerOutcome::Completed(_)) => {}
            Ok(HandlerOutcome::Failed(error)) => {
                actor_ref.stop_gracefully().await.ok();
                return Err(InvokeError::fault(identity, format!("activation failed: {error}")));
            }
            Ok(HandlerOutcome::Deactivated) => {
                actor_ref.stop_gracefully().await.ok();
                return Err(InvokeError::fault(identity, "activation was deactivated during start"));
            }
            Err(e) => {
                return Err(InvokeError::fault(identity, format!("activation failed to start: {e}")));
            }
        }

        let handle = ActivationHandle::new(identity.clone(), actor_ref, last_activity);
        events::activation_created(
            &identity.to_string(),
            &handle.id().to_string(),
            self.local.as_str(),
        );
        metrics::record_activation_created(&identity.kind);
        Ok(handle)
    }

    /// Existing activation for `identity`, or a new one.
    ///
    /// Creation runs in its own task holding the slot lock until the
    /// activation is registered or discarded. A caller that stops waiting
    /// (deadline, dropped request) cannot leave a half-started instance
    /// behind; the next caller queues on the slot and gets the same result.
    pub async fn lookup_or_create(self: &Arc<Self>, identity: &GrainIdentity) -> Result<ActivationHandle, InvokeError> {
        if let Some(activation) = self.directory.get(identity).await {
            return Ok(activation);
        }

        let manager = self.clone();
        let owned = identity.clone();
        let creation = tokio::spawn(async move {
            manager
                .directory
                .lookup_or_create(&owned, || manager.create(&owned))
                .await
        });

        match creation.await {
            Ok(result) => result,
            Err(e) => Err(InvokeError::fault(identity, format!("activation task failed: {e}"))),
        }
    }

    /// Deliver `message` to `activation` and wait for the grain's reply.
    pub async fn dispatch(
        &self,
        activation: &ActivationHandle,
        message: GrainMessage,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let identity = activation.identity();
        match tokio::time::timeout(timeout, self.deliver(activation, message)).await {
            Ok(Delivery::Completed(value)) => Ok(value),
            Ok(Delivery::Failed(error)) => Err(InvokeError::fault(identity, error)),
            Ok(Delivery::Stopped) => Err(InvokeError::fault(identity, "activation was deactivated")),
            Err(_) => Err(InvokeError::timeout(identity, timeout)),
        }
    }

    /// Resolve or create the local activation and dispatch to it.
    ///
    /// If the activation was stopped by a concurrent eviction before the
    /// message reached it, the directory is consulted once more.
    pub async fn invoke(
        self: &Arc<Self>,
        identity: &GrainIdentity,
        message: GrainMessage,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        match tokio::time::timeout(timeout, self.invoke_inner(identity, message)).await {
            Ok(result) => result,
            Err(_) => Err(InvokeError::timeout(identity, timeout)),
        }
    }

    async fn invoke_inner(self: &Arc<Self>, identity: &GrainIdentity, message: GrainMessage) -> Result<Value, InvokeError> {
        let activation = self.lookup_or_create(identity).await?;
        let delivery = match self.deliver(&activation, message.clone()).await {
            Delivery::Stopped => {
                debug!(grain = %identity, "Activation stopped before delivery, re-resolving");
                let activation = self.lookup_or_create(identity).await?;
                self.deliver(&activation, message).await
            }
            other => other,
        };

        match delivery {
            Delivery::Completed(value) => Ok(value),
            Delivery::Failed(error) => Err(InvokeError::fault(identity, error)),
            Delivery::Stopped => Err(InvokeError::fault(identity, "activation was deactivated")),
        }
    }

    async fn deliver(&self, activation: &ActivationHandle, message: GrainMessage) -> Delivery {
        activation.touch();
        match activation.actor_ref().ask(Invoke { message }).send().await {
            Ok(HandlerOutcome::Completed(value)) => Delivery::Completed(value),
            Ok(HandlerOutcome::Failed(error)) => Delivery::Failed(error),
            Ok(HandlerOutcome::Deactivated) => Delivery::Stopped,
            Err(SendError::ActorNotRunning(_)) => Delivery::Stopped,
            Err(e) => Delivery::Failed(format!("activation stopped before replying: {e}")),
        }
    }

    /// Drain and remove the activation for `identity`.
    pub async fn evict(&self, identity: &GrainIdentity, reason: DeactivationReason) -> bool {
        self.directory
            .evict(identity, |activation| self.finalize(activation, reason))
            .await
    }

    /// Evict `identity` if it is still idle for `idle_window` under the slot lock.
    pub async fn evict_if_idle(&self, identity: &GrainIdentity, idle_window: Duration) -> bool {
        self.directory
            .evict_if_idle(identity, idle_window, |activation| {
                self.finalize(activation, DeactivationReason::IdleTimeout)
            })
            .await
    }

    /// Evict every local activation concurrently. Returns how many were removed.
    pub async fn evict_all(&self, reason: DeactivationReason) -> usize {
        let identities = self.directory.list_all();
        let evictions = identities.iter().map(|identity| self.evict(identity, reason));
        futures::future::join_all(evictions)
            .await
            .into_iter()
            .filter(|evicted| *evicted)
            .count()
    }

    /// Evict every activation idle for longer than the configured window.
    pub async fn sweep_idle(&self) -> usize {
        let idle_window = self.config.idle_timeout;
        let mut evicted = 0;
        for activation in self.directory.handles() {
            if activation.idle_for() < idle_window {
                continue;
            }
            if self.evict_if_idle(activation.identity(), idle_window).await {
                evicted += 1;
            }
        }
        evicted
    }

    /// Drain the mailbox, run `on_deactivate`, then stop the actor.
    async fn finalize(&self, activation: ActivationHandle, reason: DeactivationReason) {
        let identity = activation.identity().to_string();
        let drained = tokio::time::timeout(
            self.config.drain_timeout,
            activation.actor_ref().ask(Deactivate).send(),
        )
        .await;

        match drained {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(grain = %identity, error = %e, "Activation already stopped");
            }
            Err(_) => {
                warn!(
                    grain = %identity,
                    timeout_ms = self.config.drain_timeout.as_millis() as u64,
                    "Timed out draining activation, stopping it anyway"
                );
            }
        }
        activation.actor_ref().stop_gracefully().await.ok();

        events::activation_evicted(
            &identity,
            &activation.id().to_string(),
            reason.as_str(),
            self.local.as_str(),
        );
        metrics::record_activation_evicted(&activation.identity().kind, reason.as_str());
    }

    /// Diagnostics snapshot of local activations.
    pub fn activations(&self) -> Vec<ActivationInfo> {
        let mut infos: Vec<_> = self.directory.handles().iter().map(ActivationHandle::info).collect();
        infos.sort_by(|a, b| a.grain.cmp(&b.grain));
        infos
    }
}

/// Spawn the idle sweeper as a background task.
pub fn spawn_idle_sweeper(manager: Arc<ActivationManager>) -> JoinHandle<()> {
    let period = manager.config.idle_sweep_interval;
    info!(
        interval_secs = period.as_secs(),
        idle_timeout_secs = manager.config.idle_timeout.as_secs(),
        "Starting idle activation sweeper"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let evicted = manager.sweep_idle().await;
            if evicted > 0 {
                debug!(evicted = evicted, "Idle sweep complete");
            }
        }
    })
}
