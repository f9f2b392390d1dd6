//! Rebalance Coordinator
//!
//! Reacts to topology changes by evicting local activations this member no
//! longer owns. State is not migrated: the new owner creates a fresh
//! activation on the next call.
//!
//! ```text
//! Membership.apply() ──watch──▶ rebalance loop
//!                                   ↓ PartitionTable::from_view
//!                               for each local identity:
//!                                   owner == local → retain
//!                                   otherwise      → drain + evict
//! ```

use crate::activation::{ActivationManager, DeactivationReason};
use crate::identity::{GrainIdentity, MemberId};
use crate::membership::MembershipView;
use crate::observability::events;
use crate::partition::PartitionTable;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// What one rebalance pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebalanceReport {
    /// View version the pass ran against
    pub version: u64,
    /// Activations still owned locally
    pub retained: usize,
    /// Activations drained and removed
    pub evicted: Vec<GrainIdentity>,
}

pub struct RebalanceCoordinator {
    local: MemberId,
    activations: Arc<ActivationManager>,
}

impl RebalanceCoordinator {
    pub fn new(local: MemberId, activations: Arc<ActivationManager>) -> Self {
        Self { local, activations }
    }

    /// Evict every local activation whose owner under `view` is another
    /// member (or nobody).
    pub async fn rebalance(&self, view: &MembershipView) -> RebalanceReport {
        let table = PartitionTable::from_view(view);
        let mut report = RebalanceReport {
            version: view.version(),
            ..RebalanceReport::default()
        };

        let mut moved = Vec::new();
        for identity in self.activations.directory().list_all() {
            match table.owner_of(&identity) {
                Some(owner) if *owner == self.local => report.retained += 1,
                owner => {
                    events::ownership_transferred(
                        &identity.to_string(),
                        self.local.as_str(),
                        owner.map(MemberId::as_str).unwrap_or("none"),
                    );
                    moved.push(identity);
                }
            }
        }

        let evictions = moved.iter().map(|identity| async move {
            let evicted = self
                .activations
                .evict(identity, DeactivationReason::Rebalance)
                .await;
            evicted.then(|| identity.clone())
        });
        report.evicted = futures::future::join_all(evictions)
            .await
            .into_iter()
            .flatten()
            .collect();
        report.evicted.sort();

        info!(
            version = report.version,
            active_members = table.member_count(),
            retained = report.retained,
            evicted = report.evicted.len(),
            "Rebalance complete"
        );
        report
    }
}

/// Run a rebalance pass for every new view published on `views`.
///
/// Bursts of updates coalesce: only the latest view is processed.
pub fn spawn_rebalance_loop(
    coordinator: Arc<RebalanceCoordinator>,
    mut views: watch::Receiver<Arc<MembershipView>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            debug!(version = view.version(), "Membership changed, rebalancing");
            coordinator.rebalance(&view).await;
        }
        debug!("Membership channel closed, rebalance loop exiting");
    })
}
