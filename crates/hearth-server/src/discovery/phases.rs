//! Discovery Protocol Phases
//!
//! The four phases of the etcd provider:
//! 1. Initialization - Verify the etcd connection
//! 2. Registration - Grant a lease and PUT this member's record
//! 3. Convergence - Load the members prefix and publish the first view
//! 4. Maintenance - Watch the prefix and publish a view per revision

use super::etcd::{EtcdOperations, MemberRecord};
use super::table::MemberTable;
use crate::config::EtcdSettings;
use anyhow::{anyhow, Result};
use etcd_client::{
    EventType, GetOptions, LeaseKeepAliveStream, LeaseKeeper, PutOptions, WatchOptions,
    WatchResponse, WatchStream, Watcher,
};
use hearth_core::{MemberId, MemberStatus, Membership};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Helper struct for managing discovery phases
pub struct DiscoveryPhases {
    pub etcd_ops: EtcdOperations,
    pub local: MemberId,
    pub membership: Arc<Membership>,
    pub settings: EtcdSettings,
    table: MemberTable,
    /// Highest etcd revision folded into `table`
    revision: i64,
}

impl DiscoveryPhases {
    pub fn new(etcd_ops: EtcdOperations, local: MemberId, membership: Arc<Membership>, settings: EtcdSettings) -> Self {
        let table = MemberTable::new(etcd_ops.members_prefix());
        Self {
            etcd_ops,
            local,
            membership,
            settings,
            table,
            revision: 0,
        }
    }

    fn publish(&self) {
        let view = self.membership.apply(self.table.update(self.revision));
        debug!(
            version = view.version(),
            members = self.table.len(),
            active = view.active_count(),
            "Published membership view"
        );
    }

    /// Phase 1: Verify etcd connection is ready.
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Discovery: Phase 1 - Initialization");

        let status = self
            .etcd_ops
            .client
            .status()
            .await
            .map_err(|e| anyhow!("Etcd connection failed: {e}"))?;
        debug!(version = %status.version(), "etcd connection verified");
        Ok(())
    }

    /// Phase 2: Grant lease, start keep-alive, register this member.
    pub async fn register(&mut self) -> Result<(i64, LeaseKeeper, LeaseKeepAliveStream)> {
        info!("Discovery: Phase 2 - Registration");

        let lease_resp = self
            .etcd_ops
            .client
            .lease_grant(self.settings.lease_ttl, None)
            .await?;
        let lease_id = lease_resp.id();
        debug!(lease_id = lease_id, ttl = self.settings.lease_ttl, "Lease granted");

        let (keeper, stream) = self.etcd_ops.client.lease_keep_alive(lease_id).await?;

        self.put_record(lease_id, MemberStatus::Active).await?;
        info!(member = %self.local, incarnation = lease_id, "Member registered in etcd");
        Ok((lease_id, keeper, stream))
    }

    async fn put_record(&mut self, lease_id: i64, status: MemberStatus) -> Result<()> {
        let key = self.etcd_ops.member_key(&self.local);
        let value = serde_json::to_string(&MemberRecord::new(lease_id, status))?;
        let put_options = PutOptions::new().with_lease(lease_id);
        self.etcd_ops.client.put(key, value, Some(put_options)).await?;
        Ok(())
    }

    /// Mark this member Leaving so peers stop routing to it before the
    /// lease is revoked.
    pub async fn announce_leaving(&mut self, lease_id: i64) -> Result<()> {
        self.put_record(lease_id, MemberStatus::Leaving).await?;
        debug!(member = %self.local, "Member marked leaving in etcd");
        Ok(())
    }

    /// Phase 3: Load every member record and publish the first view.
    pub async fn converge(&mut self) -> Result<()> {
        info!("Discovery: Phase 3 - Convergence");

        let prefix = self.etcd_ops.members_prefix();
        let resp = self
            .etcd_ops
            .client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await?;
        let revision = resp
            .header()
            .map(|header| header.revision())
            .ok_or_else(|| anyhow!("etcd response has no header"))?;

        self.table.clear();
        for kv in resp.kvs() {
            match (kv.key_str(), kv.value_str()) {
                (Ok(key), Ok(value)) => {
                    self.table.apply_put(key, value);
                }
                _ => warn!("Skipping member record with invalid UTF-8"),
            }
        }
        self.revision = revision;

        info!(member_count = self.table.len(), revision = revision, "Convergence complete");
        self.publish();
        Ok(())
    }

    /// Phase 4: Watch the members prefix from just after the converged revision.
    pub async fn enter_maintenance(&mut self) -> Result<(Watcher, WatchStream)> {
        info!("Discovery: Phase 4 - Maintenance");

        let prefix = self.etcd_ops.members_prefix();
        let watch_options = WatchOptions::new()
            .with_prefix()
            .with_start_revision(self.revision + 1);
        let watch = self.etcd_ops.client.watch(prefix, Some(watch_options)).await?;

        debug!(start_revision = self.revision + 1, "Watch stream established");
        Ok(watch)
    }

    /// Process the next watch response. Errors mean the stream must be
    /// re-established.
    pub async fn process_watch_event(&mut self, stream: &mut WatchStream) -> Result<()> {
        match stream.message().await? {
            Some(resp) => self.apply_watch_response(&resp),
            None => Err(anyhow!("Watch stream closed")),
        }
    }

    fn apply_watch_response(&mut self, resp: &WatchResponse) -> Result<()> {
        if resp.canceled() {
            return Err(anyhow!(
                "Watch stream canceled (compact revision {})",
                resp.compact_revision()
            ));
        }

        for event in resp.events() {
            let Some(kv) = event.kv() else { continue };
            let key = kv.key_str()?;
            match event.event_type() {
                EventType::Put => {
                    if let Some(id) = self.table.apply_put(key, kv.value_str()?) {
                        debug!(member = %id, "Watch: member record written");
                    }
                }
                EventType::Delete => {
                    if let Some(id) = self.table.apply_delete(key) {
                        debug!(member = %id, "Watch: member record deleted");
                    }
                }
            }
        }

        // Every watcher sees the same mod revision for the same change.
        let latest = resp
            .events()
            .iter()
            .filter_map(|event| event.kv())
            .map(|kv| kv.mod_revision())
            .max();
        if let Some(revision) = latest.filter(|r| *r > self.revision) {
            self.revision = revision;
            self.publish();
        }
        Ok(())
    }

    /// Publish a local view in which this member is Leaving, without
    /// waiting for etcd. Used on shutdown and when the lease is lost.
    pub fn publish_local_leaving(&self, reason: &'static str) {
        let update = self.table.update_with_local_leaving(&self.local, self.revision);
        let view = self.membership.apply(update);
        warn!(
            member = %self.local,
            version = view.version(),
            reason = reason,
            "Marked self leaving"
        );
    }
}
