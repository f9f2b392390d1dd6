//! Static Provider
//!
//! Fixed member list from configuration, published once as version 1.
//! Every member of a static cluster must be started with the same list.

use hearth_core::{Member, MemberId, Membership, MembershipUpdate, MembershipView};
use std::sync::Arc;
use tracing::info;

pub const STATIC_VERSION: u64 = 1;

#[derive(Debug, Clone)]
pub struct StaticProvider {
    members: Vec<MemberId>,
}

impl StaticProvider {
    pub fn new(members: Vec<MemberId>) -> Self {
        Self { members }
    }

    pub fn update(&self) -> MembershipUpdate {
        MembershipUpdate::new(
            STATIC_VERSION,
            self.members.iter().map(|id| Member::active(id.clone(), 1)).collect(),
        )
    }

    /// Publish the member list into `membership`.
    pub fn start(&self, membership: &Membership) -> Arc<MembershipView> {
        let view = membership.apply(self.update());
        info!(
            version = view.version(),
            active = view.active_count(),
            "Static membership applied"
        );
        view
    }
}
