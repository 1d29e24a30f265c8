//! Interface enumeration and the broadcast/summary address helpers built on
//! top of it (§4.1).

use std::net::Ipv4Addr;

use pnet::datalink;
use pnet::ipnetwork::IpNetwork;

use crate::error::{Result, RouterError};

/// Queries the host for configured IPv4 addresses, excluding loopback.
pub fn local_interface_addresses() -> Result<Vec<Ipv4Addr>> {
    let addrs: Vec<Ipv4Addr> = datalink::interfaces()
        .into_iter()
        .flat_map(|iface| iface.ips.into_iter())
        .filter_map(|ip_network| match ip_network {
            IpNetwork::V4(v4) if !v4.ip().is_loopback() => Some(v4.ip()),
            _ => None,
        })
        .collect();

    if addrs.is_empty() {
        return Err(RouterError::Config(
            "no non-loopback IPv4 interface addresses found".to_string(),
        ));
    }
    Ok(addrs)
}

/// Summarizes an address to its /24 form if it falls in 192.168.0.0/16
/// (host-facing LAN subnets); all other addresses are kept verbatim since
/// they identify router-to-router point-to-point links.
pub fn summarize_for_lsa(addr: Ipv4Addr) -> String {
    let octets = addr.octets();
    if octets[0] == 192 && octets[1] == 168 {
        format!("{}.{}.{}.0/24", octets[0], octets[1], octets[2])
    } else {
        addr.to_string()
    }
}

pub fn interface_ips_for_lsa(addrs: &[Ipv4Addr]) -> Vec<String> {
    addrs.iter().copied().map(summarize_for_lsa).collect()
}

/// The directed broadcast address of `addr`'s /24: the host octet replaced
/// by 255.
pub fn directed_broadcast(addr: Ipv4Addr) -> Ipv4Addr {
    let octets = addr.octets();
    Ipv4Addr::new(octets[0], octets[1], octets[2], 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_192_168_to_slash_24() {
        let addr: Ipv4Addr = "192.168.5.37".parse().unwrap();
        assert_eq!(summarize_for_lsa(addr), "192.168.5.0/24");
    }

    #[test]
    fn keeps_other_ranges_verbatim() {
        let addr: Ipv4Addr = "10.10.1.2".parse().unwrap();
        assert_eq!(summarize_for_lsa(addr), "10.10.1.2");
    }

    #[test]
    fn directed_broadcast_replaces_host_octet() {
        let addr: Ipv4Addr = "10.10.1.2".parse().unwrap();
        assert_eq!(directed_broadcast(addr), Ipv4Addr::new(10, 10, 1, 255));
    }
}
