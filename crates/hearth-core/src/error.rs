//! Invocation Error Taxonomy
//!
//! Every failure a caller of the runtime can observe. The enum is
//! serializable so the receive side of a transport can hand it back to the
//! calling member unchanged.

use crate::identity::{GrainIdentity, MemberId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum InvokeError {
    /// No Active member exists to own the identity.
    #[error("no active member can own grain {identity}")]
    Unresolvable { identity: GrainIdentity },

    /// The resolved owner could not be reached within the deadline.
    #[error("member {member} is unreachable: {reason}")]
    Unreachable { member: MemberId, reason: String },

    /// The contacted member does not own the identity under its view.
    #[error("member is not the owner (its view version is {current_version})")]
    NotOwner { current_version: u64 },

    /// The grain handler failed; the activation is still alive.
    #[error("grain {identity} faulted: {message}")]
    GrainFault {
        identity: GrainIdentity,
        message: String,
    },

    /// Local dispatch exceeded the caller's deadline.
    #[error("call to grain {identity} timed out after {after_ms}ms")]
    Timeout {
        identity: GrainIdentity,
        after_ms: u64,
    },

    /// No factory is registered for the grain kind.
    #[error("no grain kind {kind:?} is registered")]
    UnknownKind { kind: String },
}

impl InvokeError {
    pub(crate) fn timeout(identity: &GrainIdentity, after: Duration) -> Self {
        Self::Timeout {
            identity: identity.clone(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub(crate) fn fault(identity: &GrainIdentity, message: impl Into<String>) -> Self {
        Self::GrainFault {
            identity: identity.clone(),
            message: message.into(),
        }
    }

    /// Whether a caller may retry the same call later (with backoff).
    ///
    /// Grain faults are application errors and unknown kinds are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unresolvable { .. } | Self::Unreachable { .. } | Self::NotOwner { .. } | Self::Timeout { .. }
        )
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unresolvable { .. } => "unresolvable",
            Self::Unreachable { .. } => "unreachable",
            Self::NotOwner { .. } => "not_owner",
            Self::GrainFault { .. } => "grain_fault",
            Self::Timeout { .. } => "timeout",
            Self::UnknownKind { .. } => "unknown_kind",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_is_tagged() {
        let err = InvokeError::NotOwner { current_version: 7 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "not_owner");
        assert_eq!(json["current_version"], 7);

        let back: InvokeError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_retryability() {
        let id = GrainIdentity::new("bulb", "kitchen");
        assert!(InvokeError::Unresolvable { identity: id.clone() }.is_retryable());
        assert!(!InvokeError::fault(&id, "boom").is_retryable());
        assert!(!InvokeError::UnknownKind { kind: "lamp".into() }.is_retryable());
    }
}
