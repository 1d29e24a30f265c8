//! Single UDP endpoint used for both HELLO and LSA traffic (§4.2).
//!
//! The core is a thread-and-mutex daemon, not an async one (§5); the socket
//! is therefore a plain blocking `std::net::UdpSocket` with a 1s receive
//! timeout so the receiver thread can cooperatively check the shutdown
//! signal between datagrams.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Result, RouterError};
use crate::types::{HelloWire, LsaWire};

const MAX_DATAGRAM_BYTES: usize = 1024;
const RECV_TIMEOUT: Duration = Duration::from_secs(1);
const RECV_BUF_BYTES: usize = 2048;

pub struct Transport {
    socket: UdpSocket,
}

/// A decoded, still-untrusted control message. Unknown `type` values and
/// decoding errors never reach this point: the transport discards them
/// silently (§4.2, §7).
pub enum Incoming {
    Hello(HelloWire),
    Lsa(LsaWire),
}

impl Transport {
    pub fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        Ok(Transport { socket })
    }

    fn send_json<T: Serialize>(&self, addr: SocketAddr, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        if payload.len() > MAX_DATAGRAM_BYTES {
            return Err(RouterError::Network(format!(
                "encoded message to {} is {} bytes, exceeds {} byte limit",
                addr,
                payload.len(),
                MAX_DATAGRAM_BYTES
            )));
        }
        self.socket
            .send_to(&payload, addr)
            .map_err(|e| RouterError::Network(format!("send to {} failed: {}", addr, e)))?;
        Ok(())
    }

    pub fn send_hello(&self, addr: SocketAddr, hello: &HelloWire) -> Result<()> {
        self.send_json(addr, hello)
    }

    pub fn send_lsa(&self, addr: SocketAddr, lsa: &LsaWire) -> Result<()> {
        self.send_json(addr, lsa)
    }

    /// Blocks up to 1s waiting for a datagram. Returns `Ok(None)` on a plain
    /// timeout (the cooperative-shutdown suspension point), and silently
    /// drops anything that doesn't parse as a recognized message.
    pub fn recv(&self) -> Result<Option<(SocketAddr, Incoming)>> {
        let mut buf = [0u8; RECV_BUF_BYTES];
        match self.socket.recv_from(&mut buf) {
            Ok((len, src)) => Ok(decode(&buf[..len]).map(|msg| (src, msg))),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => {
                warn!("transport recv error: {}", e);
                Ok(None)
            }
        }
    }
}

fn decode(bytes: &[u8]) -> Option<Incoming> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(e) => {
            debug!("discarding undecodable datagram: {}", e);
            return None;
        }
    };
    match value.get("type").and_then(|t| t.as_str()) {
        Some("HELLO") => serde_json::from_value::<HelloWire>(value).ok().map(Incoming::Hello),
        Some("LSA") => serde_json::from_value::<LsaWire>(value).ok().map(Incoming::Lsa),
        _ => {
            debug!("ignoring datagram with unknown or missing type field");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_ignores_unknown_type() {
        let raw = br#"{"type":"BOGUS"}"#;
        assert!(decode(raw).is_none());
    }

    #[test]
    fn decode_ignores_garbage() {
        assert!(decode(b"not json").is_none());
    }

    #[test]
    fn decode_accepts_hello() {
        let raw = br#"{"type":"HELLO","router_id":"A","timestamp":1.0,"ip_address":"10.0.0.1","known_neighbors":[]}"#;
        assert!(matches!(decode(raw), Some(Incoming::Hello(_))));
    }

    #[test]
    fn decode_accepts_lsa_with_origin_sequence_aliases() {
        let raw = br#"{"type":"LSA","origin":"A","sequence":3,"timestamp":1.0,"addresses":[],"links":{}}"#;
        match decode(raw) {
            Some(Incoming::Lsa(lsa)) => {
                assert_eq!(lsa.router_id.as_deref(), Some("A"));
                assert_eq!(lsa.sequence_number, Some(3));
            }
            _ => panic!("expected LSA"),
        }
    }
}
