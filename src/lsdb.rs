//! Link State Database: latest LSA per origin, and the topology graph
//! rebuilt from it (§4.7).

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, warn};
use serde_json::Value;

use crate::types::{Cost, LsaRecord, LsaWire, NeighborLink, RouterId};

#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// Accepted and replaced the stored record for this origin.
    Updated,
    /// Sequence number did not advance the known state; no-op.
    Stale,
    /// Missing the fields required to identify the LSA at all.
    Rejected,
}

pub struct Lsdb {
    records: HashMap<RouterId, LsaRecord>,
    graph: HashMap<RouterId, HashMap<RouterId, Cost>>,
    high_water_mark: usize,
    convergence_log: Vec<(f64, usize)>,
    epoch: Instant,
}

impl Lsdb {
    pub fn new() -> Self {
        Lsdb {
            records: HashMap::new(),
            graph: HashMap::new(),
            high_water_mark: 0,
            convergence_log: Vec::new(),
            epoch: Instant::now(),
        }
    }

    pub fn get(&self, origin: &str) -> Option<&LsaRecord> {
        self.records.get(origin)
    }

    pub fn router_count(&self) -> usize {
        self.records.len()
    }

    pub fn graph(&self) -> &HashMap<RouterId, HashMap<RouterId, Cost>> {
        &self.graph
    }

    pub fn convergence_log(&self) -> &[(f64, usize)] {
        &self.convergence_log
    }

    /// Clones out the entries pending persistence without clearing them.
    /// Pair with `ack_convergence_log` once the caller has durably written
    /// the returned entries; entries must stay buffered across a failed
    /// flush attempt so the next one retries them (§6: the log is "cleared
    /// after each successful flush", not unconditionally).
    pub fn pending_convergence_log(&self) -> Vec<(f64, usize)> {
        self.convergence_log.clone()
    }

    /// Removes the first `count` entries, i.e. the prefix a caller just
    /// confirmed it wrote successfully. New entries appended after the
    /// snapshot was taken (always at the tail) are left intact.
    pub fn ack_convergence_log(&mut self, count: usize) {
        let count = count.min(self.convergence_log.len());
        self.convergence_log.drain(0..count);
    }

    /// Runs the admission procedure of §4.7 against a still-untrusted wire
    /// LSA. On `Admission::Updated` the topology graph has already been
    /// rebuilt and the convergence log updated if warranted.
    pub fn admit(&mut self, wire: &LsaWire) -> Admission {
        let (origin, sequence) = match (&wire.router_id, wire.sequence_number) {
            (Some(origin), Some(sequence)) if !origin.is_empty() => (origin.clone(), sequence),
            _ => return Admission::Rejected,
        };

        if let Some(existing) = self.records.get(&origin) {
            if sequence <= existing.sequence {
                return Admission::Stale;
            }
        }

        let neighbors = normalize_neighbors(wire);
        let record = LsaRecord {
            origin: origin.clone(),
            sequence,
            timestamp: wire.timestamp,
            neighbors,
            addresses: wire.addresses.clone(),
        };
        self.records.insert(origin, record);
        self.rebuild_graph();

        let count = self.records.len();
        if count > self.high_water_mark {
            self.high_water_mark = count;
            self.convergence_log.push((self.epoch.elapsed().as_secs_f64(), count));
        }

        Admission::Updated
    }

    /// Rebuilds the undirected weighted topology graph from scratch.
    /// Origins are iterated in sorted RouterId order so that, when two
    /// LSAs disagree on the cost of the same edge, the outcome is
    /// reproducible rather than hashmap-iteration-order dependent.
    fn rebuild_graph(&mut self) {
        let mut graph: HashMap<RouterId, HashMap<RouterId, Cost>> = HashMap::new();
        let mut origins: Vec<&RouterId> = self.records.keys().collect();
        origins.sort();

        for origin in origins {
            let record = &self.records[origin];
            let mut peers: Vec<&RouterId> = record.neighbors.keys().collect();
            peers.sort();
            for peer in peers {
                let cost = record.neighbors[peer].cost;
                if let Some(existing) = graph.get(origin).and_then(|row| row.get(peer)) {
                    if *existing != cost {
                        warn!(
                            "cost asymmetry on edge {}-{}: {} now reports {}, previously {}",
                            origin, peer, origin, cost, existing
                        );
                    }
                }
                graph.entry(origin.clone()).or_default().insert(peer.clone(), cost);
                graph.entry(peer.clone()).or_default().insert(origin.clone(), cost);
            }
        }
        self.graph = graph;
    }
}

/// Normalizes the polymorphic `neighbors`/`links` shapes of §4.7 step 3
/// into a single internal `RouterId -> NeighborLink` mapping.
fn normalize_neighbors(wire: &LsaWire) -> HashMap<RouterId, NeighborLink> {
    if let Some(Value::Object(map)) = &wire.neighbors {
        // Peek at one entry's shape to decide between the two admissible
        // neighbor representations.
        let looks_like_object = map.values().next().map(|v| v.is_object()).unwrap_or(false);
        if looks_like_object {
            let mut out = HashMap::new();
            for (peer, value) in map {
                let ip = value.get("ip").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let cost = value.get("cost").and_then(|v| v.as_u64()).unwrap_or(1) as Cost;
                out.insert(peer.clone(), NeighborLink { ip, cost });
            }
            return out;
        }

        // String values: pair with costs from the sibling `links` map.
        let mut out = HashMap::new();
        for (peer, value) in map {
            let ip = value.as_str().unwrap_or("").to_string();
            let cost = wire.links.get(peer).copied().unwrap_or(1);
            out.insert(peer.clone(), NeighborLink { ip, cost });
        }
        return out;
    }

    if !wire.links.is_empty() {
        debug!("LSA from {:?} has no neighbors field, deriving from links", wire.router_id);
        return wire
            .links
            .iter()
            .map(|(peer, cost)| (peer.clone(), NeighborLink { ip: String::new(), cost: *cost }))
            .collect();
    }

    HashMap::new()
}
