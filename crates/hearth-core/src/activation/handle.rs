//! Activation Handle
//!
//! Cheap, cloneable reference to a live activation, as stored in the
//! grain directory.

use super::actor::GrainActivation;
use crate::identity::GrainIdentity;
use chrono::{DateTime, TimeZone, Utc};
use kameo::actor::ActorRef;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct ActivationHandle {
    identity: GrainIdentity,
    id: Uuid,
    actor_ref: ActorRef<GrainActivation>,
    last_activity: Arc<AtomicI64>,
    activated_at: DateTime<Utc>,
}

/// Serializable description of an activation for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationInfo {
    pub grain: String,
    pub activation_id: Uuid,
    pub activated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ActivationHandle {
    pub(crate) fn new(
        identity: GrainIdentity,
        actor_ref: ActorRef<GrainActivation>,
        last_activity: Arc<AtomicI64>,
    ) -> Self {
        Self {
            identity,
            id: Uuid::new_v4(),
            actor_ref,
            last_activity,
            activated_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> &GrainIdentity {
        &self.identity
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    pub(crate) fn actor_ref(&self) -> &ActorRef<GrainActivation> {
        &self.actor_ref
    }

    pub(crate) fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        let millis = self.last_activity.load(Ordering::Relaxed);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(self.activated_at)
    }

    /// Time since the last message was dispatched (or since activation).
    pub fn idle_for(&self) -> Duration {
        let millis = Utc::now().timestamp_millis() - self.last_activity.load(Ordering::Relaxed);
        Duration::from_millis(u64::try_from(millis).unwrap_or(0))
    }

    pub fn is_alive(&self) -> bool {
        self.actor_ref.is_alive()
    }

    pub fn info(&self) -> ActivationInfo {
        ActivationInfo {
            grain: self.identity.to_string(),
            activation_id: self.id,
            activated_at: self.activated_at,
            last_activity: self.last_activity(),
        }
    }
}

impl std::fmt::Debug for ActivationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationHandle")
            .field("identity", &self.identity)
            .field("id", &self.id)
            .field("activated_at", &self.activated_at)
            .finish()
    }
}
