//! Activation Message Types
//!
//! Messages delivered through an activation's mailbox.

use crate::grain::GrainMessage;
use kameo::Reply;
use serde_json::Value;

/// Run the grain's `on_activate` hook. Sent once, before registration.
#[derive(Debug, Clone)]
pub struct Activate;

/// Deliver one application message to the grain.
#[derive(Debug, Clone)]
pub struct Invoke {
    pub message: GrainMessage,
}

/// Run the grain's `on_deactivate` hook.
///
/// Queued behind every message already in the mailbox, so its reply means
/// the mailbox has been drained.
#[derive(Debug, Clone)]
pub struct Deactivate;

/// Result of a grain callback.
///
/// Failures are carried as a value rather than a handler error so the actor
/// keeps running after a grain fault.
#[derive(Debug, Clone, PartialEq, Reply)]
pub enum HandlerOutcome {
    Completed(Value),
    Failed(String),
    /// The grain was already deactivated; the message never reached it.
    Deactivated,
}
