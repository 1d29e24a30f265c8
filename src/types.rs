//! Shared wire and domain types for the link-state routing core.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque router identity, unique within the flat link-state domain.
pub type RouterId = String;

/// Link/path cost. Always positive; 1 is the default when unspecified.
pub type Cost = u32;

/// HELLO wire message, JSON-encoded and sent to the /24 directed broadcast
/// address of each local interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloWire {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub router_id: RouterId,
    pub timestamp: f64,
    pub ip_address: String,
    #[serde(default)]
    pub known_neighbors: Vec<RouterId>,
}

impl HelloWire {
    pub fn new(router_id: RouterId, ip_address: String, known_neighbors: Vec<RouterId>) -> Self {
        HelloWire {
            msg_type: "HELLO".to_string(),
            router_id,
            timestamp: unix_timestamp(),
            ip_address,
            known_neighbors,
        }
    }
}

/// LSA wire message. `router_id`/`sequence_number` accept the `origin`/
/// `sequence` aliases used by some originators, and `neighbors` is kept
/// untyped so the LSDB can normalize the several admissible shapes at the
/// boundary (see `lsdb::normalize_neighbors`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsaWire {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(alias = "origin")]
    pub router_id: Option<RouterId>,
    #[serde(alias = "sequence")]
    pub sequence_number: Option<u64>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub links: HashMap<RouterId, Cost>,
    #[serde(default)]
    pub neighbors: Option<serde_json::Value>,
}

impl LsaWire {
    pub fn originate(
        router_id: RouterId,
        sequence_number: u64,
        addresses: Vec<String>,
        links: HashMap<RouterId, Cost>,
    ) -> Self {
        LsaWire {
            msg_type: "LSA".to_string(),
            router_id: Some(router_id),
            sequence_number: Some(sequence_number),
            timestamp: unix_timestamp(),
            addresses,
            links,
            neighbors: None,
        }
    }
}

/// A neighbor as normalized out of an admitted LSA: the address the origin
/// reports for that peer (possibly unknown) and the cost of the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborLink {
    pub ip: String,
    pub cost: Cost,
}

/// The normalized, internal form of the latest accepted LSA for one origin.
/// All of the wire-format shape tolerance in `lsdb` collapses into this.
#[derive(Debug, Clone)]
pub struct LsaRecord {
    pub origin: RouterId,
    pub sequence: u64,
    pub timestamp: f64,
    pub neighbors: HashMap<RouterId, NeighborLink>,
    pub addresses: Vec<String>,
}

pub fn unix_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
