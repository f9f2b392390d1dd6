//! Structured Events
//!
//! Structured event logging with consistent fields across the runtime.
//! Each event type has a dedicated function so field names never drift.
//!
//! Event types:
//! - `activation_created` - A grain activation started on this member
//! - `activation_evicted` - A grain activation was drained and removed
//! - `grain_faulted` - A grain handler returned an error or panicked
//! - `member_joined` - A member became Active in the view
//! - `member_departed` - A member left the Active set
//! - `topology_changed` - The membership view advanced
//! - `ownership_transferred` - A local activation is now owned elsewhere

use tracing::{info, warn};

/// Emit an activation created event
pub fn activation_created(grain: &str, activation_id: &str, member: &str) {
    info!(
        event_type = "activation_created",
        grain = %grain,
        activation_id = %activation_id,
        member = %member,
        "Activation created"
    );
}

/// Emit an activation evicted event
pub fn activation_evicted(grain: &str, activation_id: &str, reason: &str, member: &str) {
    info!(
        event_type = "activation_evicted",
        grain = %grain,
        activation_id = %activation_id,
        reason = %reason,
        member = %member,
        "Activation evicted"
    );
}

/// Emit a grain faulted event
pub fn grain_faulted(grain: &str, method: &str, error: &str) {
    warn!(
        event_type = "grain_faulted",
        grain = %grain,
        method = %method,
        error = %error,
        "Grain handler faulted"
    );
}

/// Emit a member joined event
pub fn member_joined(member: &str, incarnation: u64, version: u64) {
    info!(
        event_type = "member_joined",
        member = %member,
        incarnation = incarnation,
        version = version,
        "Member joined"
    );
}

/// Emit a member departed event
pub fn member_departed(member: &str, version: u64) {
    warn!(
        event_type = "member_departed",
        member = %member,
        version = version,
        "Member departed"
    );
}

/// Emit a topology changed event
pub fn topology_changed(previous_version: u64, new_version: u64, active_members: usize) {
    info!(
        event_type = "topology_changed",
        previous_version = previous_version,
        new_version = new_version,
        active_members = active_members,
        "Topology changed"
    );
}

/// Emit an ownership transferred event
pub fn ownership_transferred(grain: &str, previous_owner: &str, new_owner: &str) {
    info!(
        event_type = "ownership_transferred",
        grain = %grain,
        previous_owner = %previous_owner,
        new_owner = %new_owner,
        "Ownership transferred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_functions_dont_panic() {
        activation_created("bulb/kitchen", "a1", "m1:7000");
        activation_evicted("bulb/kitchen", "a1", "idle", "m1:7000");
        grain_faulted("bulb/kitchen", "turn_on", "boom");
        member_joined("m2:7000", 3, 4);
        member_departed("m2:7000", 5);
        topology_changed(4, 5, 3);
        ownership_transferred("bulb/kitchen", "m1:7000", "m3:7000");
    }
}
