//! Multi-member test harness over the in-memory transport.

#![allow(dead_code)]

use async_trait::async_trait;
use hearth_core::{
    Grain, GrainContext, GrainIdentity, GrainMessage, GrainRegistry, InMemoryTransport, Member,
    MemberId, MembershipUpdate, Node, NodeBuilder, RuntimeConfig,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("hearth_core=debug")
        .with_test_writer()
        .try_init();
}

/// Counters shared by every instance of the test grain.
#[derive(Default)]
pub struct LampStats {
    pub creates: AtomicUsize,
    pub deactivations: AtomicUsize,
    pub overlapping: AtomicBool,
    /// Instances currently alive, and the highest that count ever reached.
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
}

/// Light-like grain: state starts as "unknown". Identities starting with
/// `sleepy` take 100ms to activate.
pub struct Lamp {
    state: String,
    busy: bool,
    activate_delay: Duration,
    stats: Arc<LampStats>,
}

impl Lamp {
    pub fn new(identity: &GrainIdentity, stats: Arc<LampStats>) -> Self {
        stats.creates.fetch_add(1, Ordering::SeqCst);
        let live = stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_live.fetch_max(live, Ordering::SeqCst);

        let activate_delay = if identity.identity.starts_with("sleepy") {
            Duration::from_millis(100)
        } else {
            Duration::ZERO
        };
        Self {
            state: "unknown".to_string(),
            busy: false,
            activate_delay,
            stats,
        }
    }
}

impl Drop for Lamp {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Grain for Lamp {
    async fn on_activate(&mut self, _ctx: &GrainContext) -> anyhow::Result<()> {
        if !self.activate_delay.is_zero() {
            tokio::time::sleep(self.activate_delay).await;
        }
        Ok(())
    }

    async fn handle(&mut self, ctx: &GrainContext, message: GrainMessage) -> anyhow::Result<Value> {
        if self.busy {
            self.stats.overlapping.store(true, Ordering::SeqCst);
        }
        self.busy = true;
        let result = match message.method.as_str() {
            "turn_on" => {
                self.state = "on".to_string();
                Ok(json!(self.state))
            }
            "turn_off" => {
                self.state = "off".to_string();
                Ok(json!(self.state))
            }
            "get_state" => Ok(json!({ "state": self.state, "member": ctx.member().as_str() })),
            "slow" => {
                tokio::time::sleep(Duration::from_millis(message.payload.as_u64().unwrap_or(20))).await;
                Ok(json!("done"))
            }
            "fail" => Err(anyhow::anyhow!("lamp is broken")),
            "panic" => panic!("lamp exploded"),
            other => Err(anyhow::anyhow!("unknown method {other}")),
        };
        self.busy = false;
        result
    }

    async fn on_deactivate(&mut self, _ctx: &GrainContext) -> anyhow::Result<()> {
        self.stats.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn lamp_registry(stats: Arc<LampStats>) -> GrainRegistry {
    GrainRegistry::new().with("lamp", move |identity: &GrainIdentity| {
        Box::new(Lamp::new(identity, stats.clone())) as Box<dyn Grain>
    })
}

pub fn member(i: usize) -> MemberId {
    MemberId::new(format!("m{i}:7000"))
}

pub struct Cluster {
    pub transport: Arc<InMemoryTransport>,
    pub nodes: Vec<Node>,
    pub stats: Arc<LampStats>,
    version: AtomicU64,
}

impl Cluster {
    /// Start `size` members (`m1:7000`..) that all see each other as Active.
    pub fn start(size: usize) -> Self {
        Self::start_with(size, RuntimeConfig::default())
    }

    pub fn start_with(size: usize, config: RuntimeConfig) -> Self {
        init_tracing();
        let transport = Arc::new(InMemoryTransport::new());
        let stats = Arc::new(LampStats::default());

        let nodes: Vec<Node> = (1..=size)
            .map(|i| {
                let node = NodeBuilder::new(member(i), transport.clone())
                    .registry(lamp_registry(stats.clone()))
                    .config(config.clone())
                    .build()
                    .unwrap();
                transport.register(node.member().clone(), node.router());
                node
            })
            .collect();

        let cluster = Self {
            transport,
            nodes,
            stats,
            version: AtomicU64::new(0),
        };
        let all: Vec<_> = cluster.nodes.iter().map(|n| n.member().clone()).collect();
        cluster.publish(&all);
        cluster
    }

    /// Push a new view containing exactly `active` to every node.
    pub fn publish(&self, active: &[MemberId]) -> u64 {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let update = MembershipUpdate::new(
            version,
            active.iter().map(|id| Member::active(id.clone(), 1)).collect(),
        );
        for node in &self.nodes {
            node.apply_membership(update.clone());
        }
        version
    }

    pub fn node(&self, id: &MemberId) -> &Node {
        self.nodes
            .iter()
            .find(|n| n.member() == id)
            .unwrap()
    }

    /// Members hosting a live activation of `identity`.
    pub async fn hosts_of(&self, identity: &GrainIdentity) -> Vec<MemberId> {
        let mut hosts = Vec::new();
        for node in &self.nodes {
            if node.activations().directory().get(identity).await.is_some() {
                hosts.push(node.member().clone());
            }
        }
        hosts
    }
}
