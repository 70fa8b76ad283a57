//! Content-fingerprinted graph build cache.
//!
//! The cache is the only state shared between concurrent detection calls.
//! Slots live in a [`DashMap`], so lookups from many threads proceed in
//! parallel and replacing a slot is a single atomic insert.
//!
//! A slot is only reused when the stored [`Fingerprint`] equals the
//! fingerprint of the current input; any change to an id, coordinate, node
//! reference or tag forces a rebuild that overwrites the slot.

use std::hash::Hasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::debug;
use seahash::SeaHasher;

use crate::graph::{Node, RoadGraph, Way};

pub const DEFAULT_CAPACITY: usize = 16;

// ── Fingerprint ───────────────────────────────────────────────────────────────

/// 64-bit SeaHash over the full content of a node and way list.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn of(nodes: &[Node], ways: &[Way]) -> Self {
        let mut h = SeaHasher::new();

        h.write_usize(nodes.len());
        for n in nodes {
            h.write_i64(n.id.0);
            h.write_u64(n.lon.to_bits());
            h.write_u64(n.lat.to_bits());
        }

        h.write_usize(ways.len());
        for w in ways {
            h.write_i64(w.id.0);
            h.write_usize(w.nodes.len());
            for id in &w.nodes {
                h.write_i64(id.0);
            }
            h.write_usize(w.tags.len());
            for (k, v) in &w.tags {
                // Length prefixes keep ("ab", "c") distinct from ("a", "bc").
                h.write_usize(k.len());
                h.write(k.as_bytes());
                h.write_usize(v.len());
                h.write(v.as_bytes());
            }
        }

        Fingerprint(h.finish())
    }

    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

// ── GraphCache ────────────────────────────────────────────────────────────────

struct Slot {
    fingerprint: Fingerprint,
    graph:       Arc<RoadGraph>,
    inserted:    u64,
}

/// Thread-safe cache of built graphs keyed by a caller-chosen string.
///
/// Share across threads as `Arc<GraphCache>`.
pub struct GraphCache {
    slots:    DashMap<String, Slot>,
    capacity: usize,
    clock:    AtomicU64,
    hits:     AtomicU64,
    misses:   AtomicU64,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A cache holding at most `capacity` graphs (minimum 1).  When full, the
    /// oldest-inserted slot is evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots:    DashMap::new(),
            capacity: capacity.max(1),
            clock:    AtomicU64::new(0),
            hits:     AtomicU64::new(0),
            misses:   AtomicU64::new(0),
        }
    }

    /// Return the cached graph for `key` if its input is unchanged, otherwise
    /// build it and store it under `key`.
    ///
    /// With `key = None` the fingerprint itself is the key, so identical
    /// inputs share one slot.
    pub fn get_or_build(&self, key: Option<&str>, nodes: &[Node], ways: &[Way]) -> Arc<RoadGraph> {
        let fingerprint = Fingerprint::of(nodes, ways);
        let key = key.map(str::to_owned).unwrap_or_else(|| fingerprint.to_hex());

        // The read guard must be released before the slot is overwritten.
        {
            if let Some(slot) = self.slots.get(&key) {
                if slot.fingerprint == fingerprint {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("graph cache hit for {key}");
                    return Arc::clone(&slot.graph);
                }
                debug!("graph cache slot {key} is stale; rebuilding");
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let graph = Arc::new(RoadGraph::build(nodes, ways));

        if !self.slots.contains_key(&key) && self.slots.len() >= self.capacity {
            self.evict_oldest();
        }
        self.slots.insert(
            key,
            Slot {
                fingerprint,
                graph: Arc::clone(&graph),
                inserted: self.clock.fetch_add(1, Ordering::Relaxed),
            },
        );
        graph
    }

    /// Drop the slot for `key`.  Returns `true` if one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|entry| entry.value().inserted)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!("graph cache full; evicting {key}");
            self.slots.remove(&key);
        }
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new()
    }
}
