//! Partition Table
//!
//! Maps a grain identity to the member that owns it, using rendezvous
//! hashing over the Active members of a membership view.
//!
//! ```text
//! MembershipView (Active ids)
//!        ↓
//! RendezvousHasher ── score(kind/identity, member) for each member
//!        ↓
//! highest score wins → owning MemberId
//! ```
//!
//! Placement is a pure function of `(GrainIdentity, MembershipView)`: every
//! member holding the same view computes the same owner without talking to
//! anyone else. When a member leaves, only the grains it owned move.
//!
//! ## Usage
//!
//! ```ignore
//! match partition::owner_of(&identity, &view) {
//!     Some(owner) if owner == local => { /* dispatch locally */ }
//!     Some(owner) => { /* forward through the transport */ }
//!     None => { /* Unresolvable */ }
//! }
//! ```

mod rendezvous;

pub use rendezvous::RendezvousHasher;

use crate::identity::{GrainIdentity, MemberId};
use crate::membership::MembershipView;

/// Owner of `identity` under `view`, or `None` when no member is Active.
pub fn owner_of(identity: &GrainIdentity, view: &MembershipView) -> Option<MemberId> {
    rendezvous::select(&placement_key(identity), view.active_ids()).cloned()
}

/// Whether `local` owns `identity` under `view`.
pub fn is_local(identity: &GrainIdentity, view: &MembershipView, local: &MemberId) -> bool {
    owner_of(identity, view).as_ref() == Some(local)
}

/// Bytes hashed for an identity. The separator keeps `("ab", "c")` and
/// `("a", "bc")` apart.
fn placement_key(identity: &GrainIdentity) -> Vec<u8> {
    let mut key = Vec::with_capacity(identity.kind.len() + identity.identity.len() + 1);
    key.extend_from_slice(identity.kind.as_bytes());
    key.push(0xff);
    key.extend_from_slice(identity.identity.as_bytes());
    key
}

/// Placement precomputed for one view.
///
/// Used when many identities are resolved against the same snapshot, as the
/// rebalance pass does.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    version: u64,
    hasher: RendezvousHasher,
}

impl PartitionTable {
    pub fn from_view(view: &MembershipView) -> Self {
        Self {
            version: view.version(),
            hasher: RendezvousHasher::new(view.active_ids().cloned().collect()),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn owner_of(&self, identity: &GrainIdentity) -> Option<&MemberId> {
        self.hasher.lookup(&placement_key(identity))
    }

    pub fn is_local(&self, identity: &GrainIdentity, local: &MemberId) -> bool {
        self.hasher.is_local(&placement_key(identity), local)
    }

    pub fn member_count(&self) -> usize {
        self.hasher.node_count()
    }
}
