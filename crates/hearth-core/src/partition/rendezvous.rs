//! Rendezvous Hashing (Highest Random Weight)
//!
//! O(n) lookup where n = number of members. Ideal for clusters of 3-200 members.
//!
//! Properties:
//! - Even distribution regardless of cluster size
//! - Minimal disruption: only keys of the added/removed member move
//! - Deterministic: same key always maps to same member given same topology,
//!   on every member and every build (the hash is seeded and stable)

use crate::identity::MemberId;
use rapidhash::RapidHasher;
use std::hash::Hasher;

/// Fixed seed shared by every member of every cluster.
const SCORE_SEED: u64 = 0x6865_6172_7468_0001;

/// Rendezvous consistent hasher
#[derive(Debug, Clone, Default)]
pub struct RendezvousHasher {
    /// Members in the cluster (sorted for determinism)
    nodes: Vec<MemberId>,
}

impl RendezvousHasher {
    /// Create a new hasher with the given members.
    pub fn new(mut nodes: Vec<MemberId>) -> Self {
        nodes.sort();
        nodes.dedup();
        Self { nodes }
    }

    /// Look up which member owns the given key.
    pub fn lookup(&self, key: &[u8]) -> Option<&MemberId> {
        select(key, self.nodes.iter())
    }

    /// Check if a key is owned by the local member.
    pub fn is_local(&self, key: &[u8], local: &MemberId) -> bool {
        self.lookup(key) == Some(local)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Pick the candidate with the highest score for `key`.
///
/// Ties (practically impossible with a 64-bit hash) go to the greater id so
/// the answer never depends on iteration order.
pub fn select<'a>(key: &[u8], candidates: impl Iterator<Item = &'a MemberId>) -> Option<&'a MemberId> {
    candidates.max_by(|a, b| score(key, a).cmp(&score(key, b)).then_with(|| a.cmp(b)))
}

/// Compute the score for a (key, member) pair. Higher score wins ownership.
pub fn score(key: &[u8], member: &MemberId) -> u64 {
    let mut hasher = RapidHasher::new(SCORE_SEED);
    hasher.write(key);
    hasher.write_u8(0xff);
    hasher.write(member.as_str().as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_ids(count: usize) -> Vec<MemberId> {
        (0..count)
            .map(|i| MemberId::new(format!("10.0.0.{i}:7000")))
            .collect()
    }

    #[test]
    fn test_empty_returns_none() {
        let hasher = RendezvousHasher::new(vec![]);
        assert!(hasher.lookup(b"any-key").is_none());
    }

    #[test]
    fn test_single_node_owns_all() {
        let members = member_ids(1);
        let hasher = RendezvousHasher::new(members.clone());

        for i in 0..100 {
            assert_eq!(hasher.lookup(format!("bulb-{i}").as_bytes()), Some(&members[0]));
        }
    }

    #[test]
    fn test_order_independent() {
        let members = member_ids(5);
        let mut reversed = members.clone();
        reversed.reverse();

        let h1 = RendezvousHasher::new(members);
        let h2 = RendezvousHasher::new(reversed);

        for i in 0..100 {
            let key = format!("bulb-{i}");
            assert_eq!(h1.lookup(key.as_bytes()), h2.lookup(key.as_bytes()));
        }
    }

    #[test]
    fn test_even_distribution() {
        let members = member_ids(4);
        let hasher = RendezvousHasher::new(members.clone());

        let mut counts = vec![0usize; 4];
        let num_keys = 10000;

        for i in 0..num_keys {
            if let Some(owner) = hasher.lookup(format!("bulb-{i}").as_bytes()) {
                if let Some(idx) = members.iter().position(|m| m == owner) {
                    counts[idx] += 1;
                }
            }
        }

        // Each member should get ~25% (allow 10% deviation)
        let expected = num_keys / 4;
        let tolerance = expected / 10;

        for (i, &count) in counts.iter().enumerate() {
            let diff = (count as i64 - expected as i64).unsigned_abs() as usize;
            assert!(
                diff < tolerance,
                "Member {i}: got {count}, expected ~{expected} (±{tolerance})"
            );
        }
    }

    #[test]
    fn test_only_removed_members_keys_move() {
        let members = member_ids(4);
        let hasher = RendezvousHasher::new(members.clone());
        let removed = members[0].clone();

        let remaining: Vec<_> = members.iter().skip(1).cloned().collect();
        let new_hasher = RendezvousHasher::new(remaining);

        let mut moved = 0;
        for i in 0..1000 {
            let key = format!("bulb-{i}");
            let old_owner = hasher.lookup(key.as_bytes()).cloned();
            let new_owner = new_hasher.lookup(key.as_bytes()).cloned();
            if old_owner != new_owner {
                moved += 1;
                assert_eq!(old_owner.as_ref(), Some(&removed));
            }
        }

        let move_pct = (moved as f64 / 1000.0) * 100.0;
        assert!(
            move_pct < 35.0,
            "Too many keys moved: {move_pct:.1}% (expected ~25%)"
        );
    }

    #[test]
    fn test_duplicate_members_count_once() {
        let mut members = member_ids(3);
        members.push(members[0].clone());
        let hasher = RendezvousHasher::new(members.clone());

        assert_eq!(hasher.node_count(), 3);
        assert_eq!(
            hasher.lookup(b"test-key"),
            RendezvousHasher::new(member_ids(3)).lookup(b"test-key")
        );
    }
}
