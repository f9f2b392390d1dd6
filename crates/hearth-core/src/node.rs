//! Node Assembly
//!
//! Wires one member's runtime together: membership, router, activation
//! manager, the rebalance loop and the idle sweeper.
//!
//! ```ignore
//! let transport = Arc::new(InMemoryTransport::new());
//! let node = NodeBuilder::new("m1:7000", transport.clone())
//!     .register("bulb", |_: &GrainIdentity| Box::new(Bulb::default()) as Box<dyn Grain>)
//!     .build()?;
//! transport.register(node.member().clone(), node.router());
//! node.apply_membership(update);
//! node.grain("bulb", "kitchen").call("turn_on", json!({})).await?;
//! ```

use crate::activation::{spawn_idle_sweeper, ActivationInfo, ActivationManager, DeactivationReason};
use crate::config::{ConfigError, RuntimeConfig};
use crate::grain::{GrainFactory, GrainRegistry};
use crate::identity::{GrainIdentity, MemberId};
use crate::membership::{Membership, MembershipUpdate, MembershipView};
use crate::rebalance::{spawn_rebalance_loop, RebalanceCoordinator, RebalanceReport};
use crate::router::{GrainRef, Router};
use crate::transport::Transport;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct NodeBuilder {
    member: MemberId,
    transport: Arc<dyn Transport>,
    registry: GrainRegistry,
    config: RuntimeConfig,
    membership: Option<Arc<Membership>>,
}

impl NodeBuilder {
    pub fn new(member: impl Into<MemberId>, transport: Arc<dyn Transport>) -> Self {
        Self {
            member: member.into(),
            transport,
            registry: GrainRegistry::new(),
            config: RuntimeConfig::default(),
            membership: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: GrainRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn register(mut self, kind: impl Into<String>, factory: impl GrainFactory) -> Self {
        self.registry.register(kind, factory);
        self
    }

    /// Share an existing membership holder instead of creating one.
    pub fn membership(mut self, membership: Arc<Membership>) -> Self {
        self.membership = Some(membership);
        self
    }

    /// Assemble the node and start its background tasks.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<Node, ConfigError> {
        self.config.validate()?;

        let membership = self.membership.unwrap_or_default();
        let router = Router::new(
            self.member.clone(),
            membership.clone(),
            self.registry,
            self.transport,
            self.config,
        );
        let rebalance = Arc::new(RebalanceCoordinator::new(
            self.member.clone(),
            router.activations().clone(),
        ));

        let tasks = vec![
            spawn_rebalance_loop(rebalance.clone(), membership.subscribe()),
            spawn_idle_sweeper(router.activations().clone()),
        ];

        info!(member = %self.member, "Node started");

        Ok(Node {
            member: self.member,
            membership,
            router,
            rebalance,
            tasks: Mutex::new(tasks),
        })
    }
}

/// One running member of the cluster.
pub struct Node {
    member: MemberId,
    membership: Arc<Membership>,
    router: Arc<Router>,
    rebalance: Arc<RebalanceCoordinator>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub fn member(&self) -> &MemberId {
        &self.member
    }

    pub fn membership(&self) -> &Arc<Membership> {
        &self.membership
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn activations(&self) -> &Arc<ActivationManager> {
        self.router.activations()
    }

    pub fn grain(&self, kind: impl Into<String>, identity: impl Into<String>) -> GrainRef {
        self.router.grain(kind, identity)
    }

    /// Feed a provider snapshot into this member's view.
    pub fn apply_membership(&self, update: MembershipUpdate) -> Arc<MembershipView> {
        self.membership.apply(update)
    }

    /// Run a rebalance pass against the current view right away.
    pub async fn rebalance_now(&self) -> RebalanceReport {
        self.rebalance.rebalance(&self.membership.current()).await
    }

    /// Drain and remove the local activation of `(kind, identity)`, if any.
    /// The next call creates a fresh instance.
    pub async fn deactivate(&self, kind: impl Into<String>, identity: impl Into<String>) -> bool {
        let identity = GrainIdentity::new(kind, identity);
        self.activations()
            .evict(&identity, DeactivationReason::ExplicitRequest)
            .await
    }

    pub fn local_activations(&self) -> Vec<ActivationInfo> {
        self.activations().activations()
    }

    /// Stop background tasks and drain every local activation.
    pub async fn shutdown(&self) -> usize {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        let evicted = self
            .activations()
            .evict_all(DeactivationReason::NodeShutdown)
            .await;
        info!(member = %self.member, evicted = evicted, "Node stopped");
        evicted
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
