//! Etcd Operations
//!
//! Connection, key layout and lease keep-alive for the etcd provider.
//!
//! Key layout:
//! ```text
//! /hearth/v1/clusters/<cluster-id>/members/<member-id>  →  MemberRecord (JSON, leased)
//! ```

use crate::config::EtcdSettings;
use anyhow::{anyhow, Result};
use backoff::{future::retry, ExponentialBackoff};
use chrono::{DateTime, Utc};
use etcd_client::{Client, LeaseKeepAliveStream, LeaseKeeper};
use hearth_core::{MemberId, MemberStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Value stored under a member's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Lease id of the registration; a restarted process gets a new one
    pub incarnation: u64,
    pub status: MemberStatus,
    pub registered_at: DateTime<Utc>,
}

impl MemberRecord {
    pub fn new(lease_id: i64, status: MemberStatus) -> Self {
        Self {
            incarnation: lease_id.unsigned_abs(),
            status,
            registered_at: Utc::now(),
        }
    }
}

/// Etcd operations helper
#[derive(Clone)]
pub struct EtcdOperations {
    pub client: Client,
    pub cluster_id: String,
}

impl EtcdOperations {
    /// Connect to etcd with exponential backoff
    pub async fn connect(settings: &EtcdSettings) -> Result<Self> {
        let backoff = ExponentialBackoff {
            initial_interval: settings.backoff_initial,
            max_interval: settings.backoff_max,
            max_elapsed_time: Some(settings.backoff_max_elapsed),
            multiplier: settings.backoff_multiplier,
            ..Default::default()
        };
        let endpoints = settings.endpoints.clone();

        let client = retry(backoff, || async {
            match Client::connect(&endpoints, None).await {
                Ok(client) => {
                    debug!(endpoints = ?endpoints, "Connected to etcd");
                    Ok(client)
                }
                Err(e) => {
                    warn!(error = %e, "etcd connection failed, retrying");
                    Err(backoff::Error::transient(e))
                }
            }
        })
        .await
        .map_err(|e| anyhow!("Failed to connect to etcd after retries: {e}"))?;

        Ok(Self {
            client,
            cluster_id: settings.cluster_id.clone(),
        })
    }

    /// Get the etcd key for a member
    pub fn member_key(&self, member: &MemberId) -> String {
        format!("{}{}", self.members_prefix(), member)
    }

    /// Get the etcd prefix for all members in the cluster
    pub fn members_prefix(&self) -> String {
        members_prefix(&self.cluster_id)
    }
}

pub fn members_prefix(cluster_id: &str) -> String {
    format!("/hearth/v1/clusters/{cluster_id}/members/")
}

/// Spawn a background task that keeps `lease_id` alive.
///
/// Sends on `lost_tx` and exits once the lease can no longer be renewed;
/// from then on peers will see this member disappear.
pub fn spawn_keepalive_task(
    mut keeper: LeaseKeeper,
    mut keeper_stream: LeaseKeepAliveStream,
    lease_id: i64,
    settings: &EtcdSettings,
    lost_tx: mpsc::UnboundedSender<()>,
) -> tokio::task::JoinHandle<()> {
    let keepalive_interval = settings.keepalive_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(keepalive_interval);
        interval.tick().await; // Skip first immediate tick

        loop {
            interval.tick().await;

            if let Err(e) = keeper.keep_alive().await {
                error!(lease_id = lease_id, error = %e, "Keep-alive send failed");
                let _ = lost_tx.send(());
                break;
            }

            match keeper_stream.message().await {
                Ok(Some(resp)) if resp.ttl() > 0 => {
                    trace!(lease_id = lease_id, ttl = resp.ttl(), "Keep-alive OK");
                }
                Ok(Some(_)) => {
                    error!(lease_id = lease_id, "Lease expired");
                    let _ = lost_tx.send(());
                    break;
                }
                Ok(None) => {
                    error!(lease_id = lease_id, "Keep-alive stream closed");
                    let _ = lost_tx.send(());
                    break;
                }
                Err(e) => {
                    error!(lease_id = lease_id, error = %e, "Keep-alive failed");
                    let _ = lost_tx.send(());
                    break;
                }
            }
        }
    })
}
