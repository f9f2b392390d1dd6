//! Member Table
//!
//! Local mirror of the members prefix, turned into `MembershipUpdate`s.
//!
//! Topology versions are derived from etcd revisions so every member that
//! has seen the same revision publishes the same version:
//!
//! ```text
//! revision r  →  version 2r        (view read from etcd)
//!                version 2r + 1    (local view: self marked Leaving after a lost lease)
//! ```
//!
//! The odd slot lets a member demote itself without waiting for etcd,
//! while any later revision still supersedes it.

use super::etcd::MemberRecord;
use hearth_core::{Member, MemberId, MemberStatus, MembershipUpdate};
use std::collections::BTreeMap;
use tracing::warn;

/// Version of the view built from etcd at `revision`.
pub fn topology_version(revision: i64) -> u64 {
    revision.unsigned_abs().saturating_mul(2)
}

#[derive(Debug, Clone)]
pub struct MemberTable {
    prefix: String,
    records: BTreeMap<MemberId, MemberRecord>,
}

impl MemberTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            records: BTreeMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn member_id(&self, key: &str) -> Option<MemberId> {
        key.strip_prefix(&self.prefix)
            .filter(|id| !id.is_empty())
            .map(MemberId::from)
    }

    /// Record a PUT. Returns the member id when the key and value were valid.
    pub fn apply_put(&mut self, key: &str, value: &str) -> Option<MemberId> {
        let Some(id) = self.member_id(key) else {
            warn!(key = %key, "Ignoring key outside the members prefix");
            return None;
        };
        match serde_json::from_str::<MemberRecord>(value) {
            Ok(record) => {
                self.records.insert(id.clone(), record);
                Some(id)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Invalid member record JSON");
                None
            }
        }
    }

    /// Record a DELETE (explicit or lease expiry).
    pub fn apply_delete(&mut self, key: &str) -> Option<MemberId> {
        let id = self.member_id(key)?;
        self.records.remove(&id).map(|_| id)
    }

    fn members(&self) -> Vec<Member> {
        self.records
            .iter()
            .map(|(id, record)| Member::new(id.clone(), record.incarnation, record.status))
            .collect()
    }

    /// Snapshot as seen at `revision`.
    pub fn update(&self, revision: i64) -> MembershipUpdate {
        MembershipUpdate::new(topology_version(revision), self.members())
    }

    /// Snapshot at `revision` with `local` demoted to Leaving, published
    /// when this member can no longer renew its lease.
    pub fn update_with_local_leaving(&self, local: &MemberId, revision: i64) -> MembershipUpdate {
        let mut members = self.members();
        for member in members.iter_mut().filter(|m| &m.id == local) {
            member.status = MemberStatus::Leaving;
        }
        MembershipUpdate::new(topology_version(revision).saturating_add(1), members)
    }
}
