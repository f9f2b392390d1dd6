//! Membership View Snapshot
//!
//! An immutable, versioned picture of the cluster. Components never mutate a
//! view; the writer builds a new one and swaps it in.

use super::member::{Member, MemberStatus, MembershipUpdate};
use crate::identity::MemberId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipView {
    version: u64,
    /// Non-dead members keyed by id (ordered for deterministic iteration)
    members: BTreeMap<MemberId, Member>,
}

impl MembershipView {
    /// The empty view every member starts from (version 0, no owners).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a view from a provider snapshot. Dead members are dropped; if
    /// a member appears twice the highest incarnation wins.
    pub fn from_update(update: MembershipUpdate) -> Self {
        let mut members: BTreeMap<MemberId, Member> = BTreeMap::new();
        for member in update.members {
            if member.status == MemberStatus::Dead {
                continue;
            }
            match members.get(&member.id) {
                Some(existing) if existing.incarnation >= member.incarnation => {}
                _ => {
                    members.insert(member.id.clone(), member);
                }
            }
        }

        Self {
            version: update.version,
            members,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    /// All known non-dead members, Active or not.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Members eligible to own grains.
    pub fn active_members(&self) -> impl Iterator<Item = &Member> {
        self.members.values().filter(|m| m.is_active())
    }

    pub fn active_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.active_members().map(|m| &m.id)
    }

    pub fn active_count(&self) -> usize {
        self.active_members().count()
    }

    pub fn is_active(&self, id: &MemberId) -> bool {
        self.members.get(id).is_some_and(Member::is_active)
    }
}
