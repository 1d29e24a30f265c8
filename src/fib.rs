//! Route computer -> kernel FIB reconciliation (§4.9).
//!
//! `net-route` exposes an async API; the rest of the core deliberately
//! stays free of an async runtime (§5), so each reconciliation pass parks a
//! small dedicated current-thread Tokio runtime for the duration of the
//! kernel call and blocks on it from the calling OS thread.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};

use log::{info, warn};
use pnet::ipnetwork::IpNetwork;

use crate::error::{Result, RouterError};
use crate::types::RouterId;

/// One route this installer has pushed into the kernel FIB, keyed so a
/// later reconciliation pass can tell it apart from a fresh install.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstalledRoute {
    destination: String,
    next_hop: Ipv4Addr,
}

/// Tracks what this process has installed so it can withdraw routes that
/// no longer appear in the current routing table (SPEC_FULL §9 decision:
/// the installer withdraws stale routes rather than leaving them to rot).
pub struct FibInstaller {
    installed: HashSet<InstalledRoute>,
}

impl FibInstaller {
    pub fn new() -> Self {
        FibInstaller {
            installed: HashSet::new(),
        }
    }

    /// Reconciles `routes` (destination RouterId -> (next_hop RouterId,
    /// cost)) against the kernel FIB. `neighbor_addrs` resolves a next-hop
    /// RouterId to its IP; `destination_addrs` resolves a destination
    /// RouterId to the set of addresses its LSA advertises. Both snapshots
    /// are taken by the caller while holding the shared-state lock, then
    /// passed in by value so this reconciliation itself can run the
    /// (potentially blocking) kernel calls without holding it. Returns the
    /// count of successfully installed routes.
    pub fn reconcile(
        &mut self,
        routes: &HashMap<RouterId, (RouterId, u32)>,
        neighbor_addrs: &HashMap<RouterId, String>,
        destination_addrs: &HashMap<RouterId, Vec<String>>,
    ) -> usize {
        let mut desired: HashSet<InstalledRoute> = HashSet::new();
        let mut successes = 0usize;

        for (dest, (next_hop, _cost)) in routes {
            let Some(gateway_str) = neighbor_addrs.get(next_hop) else {
                continue;
            };
            let Ok(gateway) = gateway_str.parse::<Ipv4Addr>() else {
                warn!("next hop {} for {} has an unparseable address {}", next_hop, dest, gateway_str);
                continue;
            };
            for addr in destination_addrs.get(dest).cloned().unwrap_or_default() {
                match parse_destination(&addr) {
                    Ok(network) => {
                        let entry = InstalledRoute {
                            destination: addr.clone(),
                            next_hop: gateway,
                        };
                        if replace_route(network, gateway) {
                            successes += 1;
                            desired.insert(entry);
                        }
                    }
                    Err(e) => warn!("skipping invalid destination {} for {}: {}", addr, dest, e),
                }
            }
        }

        for stale in self.installed.difference(&desired).cloned().collect::<Vec<_>>() {
            if let Ok(network) = parse_destination(&stale.destination) {
                withdraw_route(network, stale.next_hop);
            }
        }

        self.installed = desired;
        successes
    }
}

fn parse_destination(addr: &str) -> Result<IpNetwork> {
    if addr.contains('/') {
        addr.parse::<IpNetwork>()
            .map_err(|e| RouterError::Route(format!("invalid destination network {}: {}", addr, e)))
    } else {
        let ip: Ipv4Addr = addr
            .parse()
            .map_err(|e| RouterError::Route(format!("invalid destination address {}: {}", addr, e)))?;
        IpNetwork::new(IpAddr::V4(ip), 32)
            .map_err(|e| RouterError::Route(format!("invalid destination address {}: {}", addr, e)))
    }
}

fn replace_route(network: IpNetwork, gateway: Ipv4Addr) -> bool {
    let (ip, prefix) = match network {
        IpNetwork::V4(net) => (IpAddr::V4(net.network()), net.prefix()),
        IpNetwork::V6(_) => return false,
    };
    with_blocking_runtime(async move {
        let handle = match net_route::Handle::new() {
            Ok(h) => h,
            Err(e) => {
                warn!("cannot open routing handle (permissions?): {}", e);
                return false;
            }
        };
        let route = net_route::Route::new(ip, prefix).with_gateway(IpAddr::V4(gateway));
        match handle.add(&route).await {
            Ok(_) => {
                info!("installed route {} via {}", network, gateway);
                true
            }
            Err(_) => {
                let _ = handle.delete(&route).await;
                match handle.add(&route).await {
                    Ok(_) => {
                        info!("replaced route {} via {}", network, gateway);
                        true
                    }
                    Err(e) => {
                        warn!("failed to install route {} via {}: {}", network, gateway, e);
                        false
                    }
                }
            }
        }
    })
}

fn withdraw_route(network: IpNetwork, gateway: Ipv4Addr) {
    let (ip, prefix) = match network {
        IpNetwork::V4(net) => (IpAddr::V4(net.network()), net.prefix()),
        IpNetwork::V6(_) => return,
    };
    with_blocking_runtime(async move {
        let Ok(handle) = net_route::Handle::new() else { return false };
        let route = net_route::Route::new(ip, prefix).with_gateway(IpAddr::V4(gateway));
        if handle.delete(&route).await.is_ok() {
            info!("withdrew stale route {} via {}", network, gateway);
        }
        true
    });
}

fn with_blocking_runtime<F>(fut: F) -> F::Output
where
    F: std::future::Future,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to start dedicated FIB runtime")
        .block_on(fut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cidr_and_bare_ip_destinations() {
        assert!(parse_destination("10.10.1.0/24").is_ok());
        assert!(parse_destination("10.10.1.2").is_ok());
        assert!(parse_destination("not-an-ip").is_err());
    }
}
