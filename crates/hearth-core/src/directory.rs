//! Grain Directory
//!
//! Per-member registry of locally active grains. Only the owning member
//! ever reads or writes its directory.
//!
//! ## Locking
//!
//! ```text
//! identity ──hash──▶ shard (parking_lot::Mutex<HashMap>)   short, never held across .await
//!                       │
//!                       ▼
//!                    slot (tokio::sync::Mutex)              held while creating or evicting
//! ```
//!
//! The shard lock only guards finding or inserting a slot. Creation and
//! eviction of one identity run under that identity's slot lock, so a
//! create racing an eviction waits for the eviction to finish. An evicted
//! slot is marked retired and unlinked before its lock is released; callers
//! that were queued on it start over with a fresh slot.
//!
//! Each slot also mirrors its registered activation behind a short
//! synchronous lock, so snapshots never wait on a slot busy creating or
//! evicting.

use crate::activation::ActivationHandle;
use crate::identity::GrainIdentity;
use parking_lot::Mutex;
use rapidhash::RapidHasher;
use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

type Slot<A> = Arc<SlotCell<A>>;

struct SlotCell<A> {
    state: Arc<tokio::sync::Mutex<SlotState<A>>>,
    /// Copy of `SlotState::activation` once registered; cleared when the
    /// activation is handed to eviction.
    published: Mutex<Option<A>>,
}

impl<A> SlotCell<A> {
    fn new() -> Self {
        Self {
            state: Arc::new(tokio::sync::Mutex::new(SlotState {
                activation: None,
                retired: false,
            })),
            published: Mutex::new(None),
        }
    }
}

struct SlotState<A> {
    activation: Option<A>,
    retired: bool,
}

/// Sharded map of identity → live activation.
pub struct GrainDirectory<A = ActivationHandle> {
    shards: Box<[Mutex<HashMap<GrainIdentity, Slot<A>>>]>,
}

impl<A> GrainDirectory<A>
where
    A: Clone + Send + 'static,
{
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    fn shard(&self, identity: &GrainIdentity) -> &Mutex<HashMap<GrainIdentity, Slot<A>>> {
        let mut hasher = RapidHasher::default();
        identity.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    fn slot(&self, identity: &GrainIdentity) -> Slot<A> {
        self.shard(identity)
            .lock()
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(SlotCell::new()))
            .clone()
    }

    fn existing_slot(&self, identity: &GrainIdentity) -> Option<Slot<A>> {
        self.shard(identity).lock().get(identity).cloned()
    }

    /// Lock the live slot for `identity`, creating an empty one if needed.
    async fn lock_live_slot(&self, identity: &GrainIdentity) -> (Slot<A>, OwnedMutexGuard<SlotState<A>>) {
        loop {
            let slot = self.slot(identity);
            let guard = slot.state.clone().lock_owned().await;
            if !guard.retired {
                return (slot, guard);
            }
        }
    }

    /// Retire `slot` and unlink it from its shard. Must be called with the
    /// slot lock held.
    fn retire(&self, identity: &GrainIdentity, slot: &Slot<A>, state: &mut SlotState<A>) {
        state.retired = true;
        state.activation = None;
        *slot.published.lock() = None;
        let mut shard = self.shard(identity).lock();
        if shard.get(identity).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            shard.remove(identity);
        }
    }

    /// Return the activation for `identity`, creating it with `factory` if
    /// none exists.
    ///
    /// Concurrent callers for the same identity observe exactly one call to
    /// a factory; the result is registered before the slot lock is released.
    /// A failed factory leaves nothing behind.
    pub async fn lookup_or_create<F, Fut, E>(&self, identity: &GrainIdentity, factory: F) -> Result<A, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<A, E>>,
    {
        let (slot, mut state) = self.lock_live_slot(identity).await;
        if let Some(activation) = &state.activation {
            return Ok(activation.clone());
        }

        match factory().await {
            Ok(activation) => {
                state.activation = Some(activation.clone());
                *slot.published.lock() = Some(activation.clone());
                Ok(activation)
            }
            Err(e) => {
                self.retire(identity, &slot, &mut state);
                Err(e)
            }
        }
    }

    /// Current activation for `identity`, if any.
    pub async fn get(&self, identity: &GrainIdentity) -> Option<A> {
        let slot = self.existing_slot(identity)?;
        let state = slot.state.lock().await;
        if state.retired {
            return None;
        }
        state.activation.clone()
    }

    /// Remove the activation for `identity` and hand it to `finalize`.
    ///
    /// `finalize` runs with the slot still locked, so a new activation of the
    /// same identity cannot start until it returns. Returns `false` when
    /// nothing was registered.
    pub async fn evict<F, Fut>(&self, identity: &GrainIdentity, finalize: F) -> bool
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.evict_if(identity, |_| true, finalize).await
    }

    /// Like [`evict`](Self::evict) but only when `predicate` holds for the
    /// activation, checked under the slot lock.
    pub async fn evict_if<P, F, Fut>(&self, identity: &GrainIdentity, predicate: P, finalize: F) -> bool
    where
        P: FnOnce(&A) -> bool,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Some(slot) = self.existing_slot(identity) else {
            return false;
        };
        let mut state = slot.state.clone().lock_owned().await;
        if state.retired {
            return false;
        }

        let Some(activation) = state.activation.take() else {
            // Empty slot left by a cancelled creation.
            self.retire(identity, &slot, &mut state);
            return false;
        };
        if !predicate(&activation) {
            state.activation = Some(activation);
            return false;
        }

        *slot.published.lock() = None;
        finalize(activation).await;
        self.retire(identity, &slot, &mut state);
        true
    }

    /// Snapshot of every identity with a slot on this member, including
    /// activations still being created.
    pub fn list_all(&self) -> Vec<GrainIdentity> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().keys().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Snapshot of registered activations, including ones whose slot is
    /// momentarily locked by a concurrent lookup. Activations still being
    /// created or already handed to eviction are not included.
    pub fn handles(&self) -> Vec<A> {
        let slots: Vec<Slot<A>> = self
            .shards
            .iter()
            .flat_map(|shard| shard.lock().values().cloned().collect::<Vec<_>>())
            .collect();

        slots
            .iter()
            .filter_map(|slot| slot.published.lock().clone())
            .collect()
    }

    /// Number of identities with a slot on this member.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GrainDirectory<ActivationHandle> {
    /// Evict `identity` only if it has seen no dispatch for `idle_window`.
    ///
    /// Idleness is re-checked under the slot lock, so a call that arrived
    /// after the sweeper's scan keeps the activation alive.
    pub async fn evict_if_idle<F, Fut>(&self, identity: &GrainIdentity, idle_window: Duration, finalize: F) -> bool
    where
        F: FnOnce(ActivationHandle) -> Fut,
        Fut: Future<Output = ()>,
    {
        self.evict_if(identity, |handle| handle.idle_for() >= idle_window, finalize)
            .await
    }
}
