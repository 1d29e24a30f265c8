//! Startup configuration: read once from the process environment into a
//! typed record (§9 "Global mutable state" / §11). Never re-read on the hot
//! path except for the `CUSTO_*` lookups, which are themselves static for
//! the process lifetime and cheap relative to their call frequency (once
//! per LSA emission, every 10s; once per HELLO-triggered expected-neighbor
//! check).

use std::env;

use crate::types::{Cost, RouterId};

const DEFAULT_ROUTER_ID: &str = "router";
const DEFAULT_COST: Cost = 1;

/// Everything the daemon reads from its environment at startup, plus the
/// locally enumerated interface addresses (captured here since they are
/// also read exactly once, at startup).
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub router_id: RouterId,
    pub interface_ips: Vec<String>,
    pub port: u16,
}

impl RouterConfig {
    pub fn load(interface_ips: Vec<String>, port: u16) -> Self {
        let router_id = env::var("CONTAINER_NAME").unwrap_or_else(|_| DEFAULT_ROUTER_ID.to_string());
        RouterConfig {
            router_id,
            interface_ips,
            port,
        }
    }
}

/// Looks up the configured cost of the edge between `a` and `b`, trying the
/// four accepted variable names in priority order and defaulting to 1.
pub fn link_cost(a: &str, b: &str) -> Cost {
    let candidates = [
        format!("CUSTO_{}_{}_net", a, b),
        format!("CUSTO_{}_{}_net", b, a),
        format!("CUSTO_{}_{}", a, b),
        format!("CUSTO_{}_{}", b, a),
    ];
    for name in &candidates {
        if let Ok(value) = env::var(name) {
            if let Ok(cost) = value.trim().parse::<Cost>() {
                return cost;
            }
        }
    }
    DEFAULT_COST
}

/// Derives the set of expected neighbors for `self_id`: every peer `X` such
/// that the environment defines a `CUSTO_<self_id>_X_net`-shaped variable.
///
/// Assumes RouterIds contain no underscores (see SPEC_FULL open questions);
/// the third underscore-separated token is taken as the peer name.
pub fn expected_neighbors(self_id: &str) -> Vec<RouterId> {
    let prefix = format!("CUSTO_{}_", self_id);
    let mut found = Vec::new();
    for (name, _) in env::vars() {
        if !name.starts_with(&prefix) || !name.contains("_net") {
            continue;
        }
        let rest = &name[prefix.len()..];
        if let Some(peer) = rest.split('_').next() {
            if !peer.is_empty() && !found.contains(&peer.to_string()) {
                found.push(peer.to_string());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn link_cost_defaults_to_one() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("CUSTO_A_B_net");
        env::remove_var("CUSTO_B_A_net");
        assert_eq!(link_cost("A", "B"), 1);
    }

    #[test]
    fn link_cost_prefers_direct_then_reversed() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("CUSTO_A_B_net");
        env::set_var("CUSTO_B_A_net", "7");
        assert_eq!(link_cost("A", "B"), 7);
        env::set_var("CUSTO_A_B_net", "4");
        assert_eq!(link_cost("A", "B"), 4);
        env::remove_var("CUSTO_A_B_net");
        env::remove_var("CUSTO_B_A_net");
    }

    #[test]
    fn expected_neighbors_scans_custo_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("CUSTO_A_B_net", "4");
        env::set_var("CUSTO_A_C_net", "1");
        let mut peers = expected_neighbors("A");
        peers.sort();
        assert_eq!(peers, vec!["B".to_string(), "C".to_string()]);
        env::remove_var("CUSTO_A_B_net");
        env::remove_var("CUSTO_A_C_net");
    }
}
