//! Discovery Controller
//!
//! Drives the etcd provider state machine:
//!
//! ```text
//! Initialization → Registration → Convergence → Maintenance
//!                       ↑               ↑            │
//!                       │               └─ watch broken (same lease)
//!                       └──── lease lost: self Leaving, wait, new lease
//! ```
//!
//! Shutdown marks the member Leaving, revokes the lease and waits for the
//! deletion to reach peers.

use super::etcd::{spawn_keepalive_task, EtcdOperations};
use super::phases::DiscoveryPhases;
use crate::config::EtcdSettings;
use anyhow::{anyhow, Result};
use hearth_core::{MemberId, Membership};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Discovery controller state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Verifying the etcd connection
    Initialization,
    /// Registering this member with a fresh lease
    Registration,
    /// Loading every member record
    Convergence,
    /// Steady-state: watching for member changes
    Maintenance,
    /// Waiting before a new registration after a failure
    Reconnecting,
    /// Graceful shutdown in progress
    Terminating,
}

/// Why a registration session ended.
enum SessionEnd {
    Shutdown,
    LeaseLost,
    Failed(anyhow::Error),
}

pub struct DiscoveryController {
    phases: DiscoveryPhases,
    /// Current lease ID
    lease_id: Option<i64>,
    keepalive: Option<JoinHandle<()>>,
    state: DiscoveryState,
}

impl DiscoveryController {
    pub async fn new(local: MemberId, membership: Arc<Membership>, settings: EtcdSettings) -> Result<Self> {
        debug!(
            cluster_id = %settings.cluster_id,
            member = %local,
            "Creating discovery controller"
        );

        let etcd_ops = EtcdOperations::connect(&settings).await?;
        Ok(Self {
            phases: DiscoveryPhases::new(etcd_ops, local, membership, settings),
            lease_id: None,
            keepalive: None,
            state: DiscoveryState::Initialization,
        })
    }

    fn transition(&mut self, next: DiscoveryState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Discovery state change");
            self.state = next;
        }
    }

    fn stop_keepalive(&mut self) {
        if let Some(task) = self.keepalive.take() {
            task.abort();
        }
    }

    /// Graceful shutdown: mark Leaving, revoke lease, wait for DELETE propagation.
    async fn shutdown(&mut self) {
        info!("Discovery: initiating graceful shutdown");
        self.transition(DiscoveryState::Terminating);
        self.phases.publish_local_leaving("shutdown");

        if let Some(lease_id) = self.lease_id.take() {
            if let Err(e) = self.phases.announce_leaving(lease_id).await {
                warn!(error = %e, "Failed to mark member leaving");
            }
            self.stop_keepalive();

            debug!(lease_id = lease_id, "Revoking lease");
            match self.phases.etcd_ops.client.lease_revoke(lease_id).await {
                Ok(_) => debug!("Lease revoked"),
                Err(e) => warn!(error = %e, "Failed to revoke lease"),
            }

            debug!("Waiting for DELETE propagation");
            tokio::time::sleep(self.phases.settings.delete_propagation_wait).await;
        }
        info!("Discovery: shutdown complete");
    }

    /// Register, converge and watch until the session ends.
    async fn run_session(&mut self, shutdown_rx: &mut mpsc::UnboundedReceiver<()>) -> SessionEnd {
        self.transition(DiscoveryState::Registration);
        let (lease_id, keeper, stream) = match self.phases.register().await {
            Ok(registration) => registration,
            Err(e) => return SessionEnd::Failed(e),
        };
        self.lease_id = Some(lease_id);

        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        self.keepalive = Some(spawn_keepalive_task(
            keeper,
            stream,
            lease_id,
            &self.phases.settings,
            lost_tx,
        ));

        loop {
            self.transition(DiscoveryState::Convergence);
            if let Err(e) = self.phases.converge().await {
                return SessionEnd::Failed(e);
            }

            self.transition(DiscoveryState::Maintenance);
            let (mut watcher, mut watch_stream) = match self.phases.enter_maintenance().await {
                Ok(watch) => watch,
                Err(e) => return SessionEnd::Failed(e),
            };

            let broken = loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        let _ = watcher.cancel().await;
                        return SessionEnd::Shutdown;
                    }
                    _ = lost_rx.recv() => {
                        let _ = watcher.cancel().await;
                        return SessionEnd::LeaseLost;
                    }
                    result = self.phases.process_watch_event(&mut watch_stream) => {
                        if let Err(e) = result {
                            break e;
                        }
                    }
                }
            };

            let _ = watcher.cancel().await;
            warn!(error = %broken, "Watch event processing failed, reconverging");
            let delay = self.phases.settings.reconnect_delay;
            tokio::select! {
                _ = shutdown_rx.recv() => return SessionEnd::Shutdown,
                _ = lost_rx.recv() => return SessionEnd::LeaseLost,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Run the provider until `shutdown_rx` fires.
    pub async fn run(mut self, mut shutdown_rx: mpsc::UnboundedReceiver<()>) -> Result<()> {
        self.transition(DiscoveryState::Initialization);
        self.phases.initialize().await?;

        loop {
            match self.run_session(&mut shutdown_rx).await {
                SessionEnd::Shutdown => {
                    self.shutdown().await;
                    return Ok(());
                }
                SessionEnd::LeaseLost => {
                    error!("Discovery: keep-alive lost, member is invisible to the cluster");
                    self.phases.publish_local_leaving("lease lost");
                    self.lease_id = None;
                }
                SessionEnd::Failed(e) => {
                    error!(error = %e, "Discovery session failed");
                    if let Some(lease_id) = self.lease_id.take() {
                        let _ = self.phases.etcd_ops.client.lease_revoke(lease_id).await;
                    }
                }
            }
            self.stop_keepalive();

            self.transition(DiscoveryState::Reconnecting);
            let delay = self.phases.settings.reconnect_delay;
            info!(delay_secs = delay.as_secs(), "Re-registering after delay");
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    self.shutdown().await;
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Handle to a running etcd provider task.
pub struct EtcdProvider {
    shutdown_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<Result<()>>,
}

impl EtcdProvider {
    /// Connect to etcd and start publishing views into `membership`.
    pub async fn start(local: MemberId, membership: Arc<Membership>, settings: EtcdSettings) -> Result<Self> {
        let controller = DiscoveryController::new(local, membership, settings).await?;
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let result = controller.run(shutdown_rx).await;
            if let Err(e) = &result {
                error!(error = %e, "Discovery controller stopped");
            }
            result
        });
        Ok(Self { shutdown_tx, task })
    }

    /// Deregister and wait for the controller to finish, at most `timeout`.
    pub async fn stop(self, timeout: Duration) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        match tokio::time::timeout(timeout, self.task).await {
            Ok(joined) => joined.map_err(|e| anyhow!("Discovery task panicked: {e}"))?,
            Err(_) => Err(anyhow!("Discovery shutdown timed out after {}s", timeout.as_secs())),
        }
    }
}
