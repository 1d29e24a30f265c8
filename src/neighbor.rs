//! Neighbor table: peer -> address mapping with liveness tracking (§4.4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::types::RouterId;

pub const NEIGHBOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct NeighborEntry {
    pub address: String,
    pub last_seen: Instant,
}

/// Keyed by RouterId, unique per key. Created on first HELLO from a peer,
/// updated on every subsequent one, destroyed once `last_seen` ages past
/// `NEIGHBOR_TIMEOUT`.
#[derive(Debug, Default)]
pub struct NeighborTable {
    entries: HashMap<RouterId, NeighborEntry>,
}

impl NeighborTable {
    pub fn new() -> Self {
        NeighborTable {
            entries: HashMap::new(),
        }
    }

    /// Inserts or overwrites the entry for `router_id`, always advancing
    /// `last_seen`. Returns true if this is a newly discovered peer.
    pub fn update(&mut self, router_id: &RouterId, address: String, now: Instant) -> bool {
        match self.entries.get_mut(router_id) {
            Some(entry) => {
                entry.address = address;
                entry.last_seen = now;
                false
            }
            None => {
                info!("neighbor {} discovered at {}", router_id, address);
                self.entries.insert(
                    router_id.clone(),
                    NeighborEntry {
                        address,
                        last_seen: now,
                    },
                );
                true
            }
        }
    }

    pub fn contains(&self, router_id: &str) -> bool {
        self.entries.contains_key(router_id)
    }

    pub fn address_of(&self, router_id: &str) -> Option<&str> {
        self.entries.get(router_id).map(|e| e.address.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &RouterId> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouterId, &NeighborEntry)> {
        self.entries.iter()
    }

    /// Removes every neighbor whose `last_seen` is older than
    /// `NEIGHBOR_TIMEOUT` as of `now`. Returns the evicted RouterIds.
    pub fn expire_stale(&mut self, now: Instant) -> Vec<RouterId> {
        let stale: Vec<RouterId> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_seen) > NEIGHBOR_TIMEOUT)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            warn!("neighbor {} expired (no HELLO for over {}s)", id, NEIGHBOR_TIMEOUT.as_secs());
            self.entries.remove(id);
        }
        stale
    }

    /// True iff every RouterId in `expected` is currently present.
    pub fn has_all(&self, expected: &[RouterId]) -> bool {
        expected.iter().all(|peer| self.entries.contains_key(peer))
    }
}
