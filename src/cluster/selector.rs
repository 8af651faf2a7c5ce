use super::types::{ClusterConfig, NodeIndex};

/// Deterministic hash of a key with the sign bit cleared.
///
/// A 31-multiplier polynomial over the key bytes. Unlike `DefaultHasher` it
/// is stable across processes and builds, which placement requires: every
/// node must compute the same replica set for the same key.
pub fn non_negative_hash(key: &[u8]) -> u32 {
    let hash = key
        .iter()
        .fold(0i32, |acc, &b| acc.wrapping_mul(31).wrapping_add(b as i32));
    (hash & i32::MAX) as u32
}

/// The `from` nodes responsible for `key`, in preference order.
///
/// Starts at `hash(key) mod n` and walks the node list forward, wrapping
/// around, so the result is a contiguous circular slice without repeats.
pub fn select_replicas(key: &[u8], from: usize, topology: &ClusterConfig) -> Vec<NodeIndex> {
    let size = topology.size();
    if size == 0 {
        return Vec::new();
    }

    let start = non_negative_hash(key) as usize % size;
    (0..from.min(size))
        .map(|offset| NodeIndex((start + offset) % size))
        .collect()
}
