//! Activation Module
//!
//! Grain instances on this member. Each activation is a kameo actor whose
//! mailbox serializes message handling for one identity.
//!
//! ```text
//! Router ──invoke──▶ ActivationManager ──lookup_or_create──▶ GrainDirectory
//!                          │
//!                          └──ask(Invoke)──▶ GrainActivation (kameo actor)
//!                                                 └──▶ Box<dyn Grain>
//! ```

mod actor;
mod handle;
mod manager;
mod messages;

pub use handle::{ActivationHandle, ActivationInfo};
pub use manager::{spawn_idle_sweeper, ActivationManager, DeactivationReason};
