//! Cluster Providers
//!
//! Bridges from an external source of truth into the member's
//! `hearth_core::Membership`:
//! - `StaticProvider`: fixed list from configuration
//! - `EtcdProvider`: lease-backed registration plus a watch on the members
//!   prefix, one view per etcd revision

mod controller;
mod etcd;
mod phases;
mod static_provider;
mod table;

pub use controller::{DiscoveryController, DiscoveryState, EtcdProvider};
pub use etcd::{members_prefix, EtcdOperations, MemberRecord};
pub use static_provider::{StaticProvider, STATIC_VERSION};
pub use table::{topology_version, MemberTable};
