//! Member Types

use crate::identity::MemberId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a member, as reported by the cluster provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Joining,
    Active,
    Leaving,
    Dead,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberStatus::Joining => write!(f, "joining"),
            MemberStatus::Active => write!(f, "active"),
            MemberStatus::Leaving => write!(f, "leaving"),
            MemberStatus::Dead => write!(f, "dead"),
        }
    }
}

/// One process participating in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Bumped by the provider every time the process restarts
    pub incarnation: u64,
    pub status: MemberStatus,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, incarnation: u64, status: MemberStatus) -> Self {
        Self {
            id: id.into(),
            incarnation,
            status,
        }
    }

    /// Shorthand for an Active member
    pub fn active(id: impl Into<MemberId>, incarnation: u64) -> Self {
        Self::new(id, incarnation, MemberStatus::Active)
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// Snapshot pushed by the cluster provider.
///
/// Providers must version snapshots monotonically; the runtime ignores any
/// update whose version is not newer than the view it already holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpdate {
    pub version: u64,
    pub members: Vec<Member>,
}

impl MembershipUpdate {
    pub fn new(version: u64, members: Vec<Member>) -> Self {
        Self { version, members }
    }
}
