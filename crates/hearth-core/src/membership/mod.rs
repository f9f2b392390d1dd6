//! Membership View
//!
//! Holds the latest `MembershipView` for one member. Readers call
//! `current()` and never block; the single writer (the bridge to the
//! cluster provider) calls `apply()`, which swaps in a whole new snapshot.
//!
//! ```text
//! cluster provider (etcd / static / test)
//!        ↓ MembershipUpdate
//! Membership.apply()
//!        ↓ ArcSwap store + watch send
//!    ┌───┴────────────┐
//!    ↓                ↓
//! Router.current()  RebalanceCoordinator (subscribe)
//! ```

mod member;
mod view;

pub use member::{Member, MemberStatus, MembershipUpdate};
pub use view::MembershipView;

use crate::observability::{events, metrics};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Versioned, swap-on-write holder of the current membership view
pub struct Membership {
    current: ArcSwap<MembershipView>,
    notify: watch::Sender<Arc<MembershipView>>,
    /// Serializes writers so version checks and swaps are atomic together
    write_lock: Mutex<()>,
}

impl Default for Membership {
    fn default() -> Self {
        Self::new()
    }
}

impl Membership {
    pub fn new() -> Self {
        let initial = Arc::new(MembershipView::empty());
        let (notify, _) = watch::channel(initial.clone());
        Self {
            current: ArcSwap::new(initial),
            notify,
            write_lock: Mutex::new(()),
        }
    }

    /// Latest snapshot. Never blocks.
    pub fn current(&self) -> Arc<MembershipView> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Apply a provider snapshot and return the view in force afterwards.
    ///
    /// Updates whose version is not newer than the current one are ignored
    /// and the current view is returned unchanged.
    pub fn apply(&self, update: MembershipUpdate) -> Arc<MembershipView> {
        let _guard = self.write_lock.lock();
        let previous = self.current.load_full();

        if update.version <= previous.version() {
            debug!(
                current_version = previous.version(),
                update_version = update.version,
                "Ignoring stale membership update"
            );
            return previous;
        }

        let next = Arc::new(MembershipView::from_update(update));
        log_member_changes(&previous, &next);

        self.current.store(next.clone());
        self.notify.send_replace(next.clone());

        events::topology_changed(previous.version(), next.version(), next.active_count());
        metrics::record_topology_change(next.active_count());

        next
    }

    /// Receiver that always yields the latest view.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MembershipView>> {
        self.notify.subscribe()
    }

    /// Wait until a view with at least `min_version` is in force, or until
    /// `timeout` passes. Returns whatever view is current at that point.
    pub async fn wait_for_version(&self, min_version: u64, timeout: Duration) -> Arc<MembershipView> {
        let mut rx = self.subscribe();
        let reached = tokio::time::timeout(timeout, rx.wait_for(|view| view.version() >= min_version))
            .await
            .is_ok();
        if !reached {
            debug!(
                min_version = min_version,
                current_version = self.version(),
                "Timed out waiting for newer membership view"
            );
        }
        self.current()
    }
}

fn log_member_changes(previous: &MembershipView, next: &MembershipView) {
    let before: BTreeSet<_> = previous.active_ids().collect();
    let after: BTreeSet<_> = next.active_ids().collect();

    for member in next.active_members() {
        if !before.contains(&member.id) {
            events::member_joined(member.id.as_str(), member.incarnation, next.version());
        }
    }
    for id in before.difference(&after) {
        events::member_departed(id.as_str(), next.version());
    }
}
