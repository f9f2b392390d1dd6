//! Identity Types
//!
//! Names for the two things the runtime addresses: cluster members and grains.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a cluster member (usually `host:port`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stable name of a logical grain: a behaviour kind plus a caller-chosen identity.
///
/// The identity is never validated against any business entity; two equal
/// pairs always name the same grain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrainIdentity {
    pub kind: String,
    pub identity: String,
}

impl GrainIdentity {
    pub fn new(kind: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identity: identity.into(),
        }
    }
}

impl fmt::Display for GrainIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.identity)
    }
}

/// Error returned when a `kind/identity` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid grain identity {0:?}: expected `kind/identity`")]
pub struct ParseGrainIdentityError(String);

impl FromStr for GrainIdentity {
    type Err = ParseGrainIdentityError;

    /// Splits on the first `/`; the identity part may itself contain slashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((kind, identity)) if !kind.is_empty() && !identity.is_empty() => {
                Ok(Self::new(kind, identity))
            }
            _ => Err(ParseGrainIdentityError(s.to_string())),
        }
    }
}
