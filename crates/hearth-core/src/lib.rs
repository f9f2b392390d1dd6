//! Virtual-actor cluster runtime
//!
//! Callers address a grain by `(kind, identity)` and never learn which
//! member hosts it. The runtime keeps at most one live activation per
//! identity across the cluster, creates activations lazily, moves
//! ownership when membership changes and routes every call to the owner.
//!
//! Components, in dependency order:
//! - [`membership`]: versioned snapshot of live members
//! - [`partition`]: deterministic identity → owner mapping
//! - [`directory`]: per-member registry of local activations
//! - [`activation`]: grain instances and their mailboxes
//! - [`router`]: local dispatch or forwarding to the owner
//! - [`rebalance`]: eviction of activations after topology changes

pub mod activation;
pub mod config;
pub mod directory;
pub mod error;
pub mod grain;
pub mod identity;
pub mod membership;
pub mod node;
pub mod observability;
pub mod partition;
pub mod rebalance;
pub mod router;
pub mod transport;

pub use config::{ConfigError, RuntimeConfig};
pub use error::InvokeError;
pub use grain::{Grain, GrainContext, GrainFactory, GrainMessage, GrainRegistry};
pub use identity::{GrainIdentity, MemberId};
pub use membership::{Member, MemberStatus, Membership, MembershipUpdate, MembershipView};
pub use node::{Node, NodeBuilder};
pub use rebalance::RebalanceReport;
pub use router::{GrainRef, Router};
pub use transport::{InMemoryTransport, RemoteInvocation, Transport};
