//! The supervisor that owns all mutable state and drives the four
//! concurrent activities of §5: Hello emission, LSA emission/flooding,
//! Transport receive, and the Supervisor loop itself.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{self, RouterConfig};
use crate::convergence;
use crate::error::Result;
use crate::fib::FibInstaller;
use crate::lsdb::{Admission, Lsdb};
use crate::neighbor::NeighborTable;
use crate::net_utils;
use crate::transport::{Incoming, Transport};
use crate::types::{Cost, LsaWire, RouterId};

const HELLO_INTERVAL: Duration = Duration::from_secs(2);
const LSA_INTERVAL: Duration = Duration::from_secs(10);
const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(5);

struct SharedState {
    neighbors: NeighborTable,
    lsdb: Lsdb,
    routes: HashMap<RouterId, (RouterId, Cost)>,
    lsa_sequence: u64,
    emitter_started: bool,
}

/// A shared boolean gated by a condition variable, so every periodic
/// thread can sleep on `wait_timeout` and wake immediately on shutdown
/// instead of polling a bare flag (SPEC_FULL §9 "Thread lifecycle").
type ShutdownSignal = Arc<(Mutex<bool>, Condvar)>;

pub struct Daemon {
    config: RouterConfig,
    local_addrs: Vec<Ipv4Addr>,
    transport: Transport,
    state: Mutex<SharedState>,
    fib: Mutex<FibInstaller>,
    shutdown: ShutdownSignal,
}

impl Daemon {
    pub fn bootstrap(port: u16) -> Result<Arc<Daemon>> {
        let local_addrs = net_utils::local_interface_addresses()?;
        let config = RouterConfig::load(net_utils::interface_ips_for_lsa(&local_addrs), port);
        let transport = Transport::bind(port)?;

        info!(
            "router {} starting: {} local address(es), expecting neighbors {:?}",
            config.router_id,
            local_addrs.len(),
            config::expected_neighbors(&config.router_id)
        );

        Ok(Arc::new(Daemon {
            config,
            local_addrs,
            transport,
            state: Mutex::new(SharedState {
                neighbors: NeighborTable::new(),
                lsdb: Lsdb::new(),
                routes: HashMap::new(),
                lsa_sequence: 0,
                emitter_started: false,
            }),
            fib: Mutex::new(FibInstaller::new()),
            shutdown: Arc::new((Mutex::new(true), Condvar::new())),
        }))
    }

    pub fn router_id(&self) -> &str {
        &self.config.router_id
    }

    /// A snapshot of the currently installed routing table, destination ->
    /// (next hop, cost).
    pub fn routing_table(&self) -> HashMap<RouterId, (RouterId, Cost)> {
        self.state.lock().unwrap().routes.clone()
    }

    /// Spawns the four activity threads and blocks until `stop()` is
    /// called from another thread (typically a SIGINT handler).
    pub fn run(self: &Arc<Self>) {
        let handles = vec![
            self.spawn_loop("hello", HELLO_INTERVAL, |d| d.hello_tick()),
            self.spawn_loop("lsa", LSA_INTERVAL, |d| d.lsa_tick()),
            self.spawn_loop("supervisor", SUPERVISOR_INTERVAL, |d| d.supervisor_tick()),
            self.spawn_receiver(),
        ];
        for handle in handles {
            let _ = handle.join();
        }
        info!("router {} stopped", self.config.router_id);
    }

    pub fn stop(&self) {
        let (lock, cvar) = &*self.shutdown;
        let mut running = lock.lock().unwrap();
        *running = false;
        cvar.notify_all();
    }

    fn spawn_loop<F>(self: &Arc<Self>, name: &'static str, period: Duration, tick: F) -> thread::JoinHandle<()>
    where
        F: Fn(&Daemon) + Send + 'static,
    {
        let daemon = Arc::clone(self);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while daemon.sleep_while_running(period) {
                    tick(&daemon);
                }
            })
            .expect("failed to spawn daemon thread")
    }

    fn spawn_receiver(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let daemon = Arc::clone(self);
        thread::Builder::new()
            .name("transport".to_string())
            .spawn(move || {
                while daemon.is_running() {
                    match daemon.transport.recv() {
                        Ok(Some((src, Incoming::Hello(hello)))) => daemon.handle_hello(src, hello),
                        Ok(Some((src, Incoming::Lsa(lsa)))) => daemon.handle_lsa(src, lsa),
                        Ok(None) => {}
                        Err(e) => warn!("transport error: {}", e),
                    }
                }
            })
            .expect("failed to spawn transport thread")
    }

    /// Sleeps up to `period`, waking early if shutdown is requested.
    /// Returns whether the daemon is still running.
    fn sleep_while_running(&self, period: Duration) -> bool {
        let (lock, cvar) = &*self.shutdown;
        let guard = lock.lock().unwrap();
        let (guard, _) = cvar.wait_timeout_while(guard, period, |running| *running).unwrap();
        *guard
    }

    fn is_running(&self) -> bool {
        *self.shutdown.0.lock().unwrap()
    }

    // --- Hello emitter (§4.3) ---------------------------------------------

    fn hello_tick(&self) {
        let known_neighbors: Vec<RouterId> = {
            let state = self.state.lock().unwrap();
            state.neighbors.keys().cloned().collect()
        };
        for addr in &self.local_addrs {
            let hello = crate::types::HelloWire::new(
                self.config.router_id.clone(),
                addr.to_string(),
                known_neighbors.clone(),
            );
            let broadcast = SocketAddr::new(net_utils::directed_broadcast(*addr).into(), self.config.port);
            if let Err(e) = self.transport.send_hello(broadcast, &hello) {
                warn!("failed to send HELLO on {}: {}", addr, e);
            }
        }
    }

    // --- Hello receiver / neighbor table (§4.4) ----------------------------

    fn handle_hello(&self, _src: SocketAddr, hello: crate::types::HelloWire) {
        if hello.router_id == self.config.router_id {
            debug!("discarding HELLO from self");
            return;
        }
        let now = Instant::now();
        let expected_neighbors = config::expected_neighbors(&self.config.router_id);
        let (became_new, just_completed) = {
            let mut state = self.state.lock().unwrap();
            let became_new = state.neighbors.update(&hello.router_id, hello.ip_address.clone(), now);
            let all_present = state.neighbors.has_all(&expected_neighbors);
            let just_completed = all_present && !state.emitter_started;
            if just_completed {
                state.emitter_started = true;
                info!("all expected neighbors discovered; LSA emitter starting");
            }
            (became_new, just_completed)
        };
        if became_new || just_completed {
            self.recompute_and_install();
        }
    }

    // --- LSA emitter & flooder (§4.6) --------------------------------------

    fn lsa_tick(&self) {
        let (seq, neighbor_addrs) = {
            let mut state = self.state.lock().unwrap();
            if !state.emitter_started {
                return;
            }
            state.lsa_sequence += 1;
            let neighbor_addrs: HashMap<RouterId, String> = state
                .neighbors
                .iter()
                .map(|(id, entry)| (id.clone(), entry.address.clone()))
                .collect();
            (state.lsa_sequence, neighbor_addrs)
        };

        let wire = self.build_self_lsa(seq, &neighbor_addrs.keys().cloned().collect::<Vec<_>>());
        for (peer, addr) in &neighbor_addrs {
            match format!("{}:{}", addr, self.config.port).parse::<SocketAddr>() {
                Ok(sock_addr) => {
                    if let Err(e) = self.transport.send_lsa(sock_addr, &wire) {
                        warn!("failed to send LSA to {}: {}", peer, e);
                    }
                }
                Err(e) => warn!("neighbor {} has unparseable address {}: {}", peer, addr, e),
            }
        }

        {
            let mut state = self.state.lock().unwrap();
            state.lsdb.admit(&wire);
        }
        self.recompute_and_install();
    }

    fn build_self_lsa(&self, sequence: u64, peers: &[RouterId]) -> LsaWire {
        let addresses = net_utils::interface_ips_for_lsa(&self.local_addrs);
        let links: HashMap<RouterId, Cost> = peers
            .iter()
            .map(|peer| (peer.clone(), config::link_cost(&self.config.router_id, peer)))
            .collect();
        LsaWire::originate(self.config.router_id.clone(), sequence, addresses, links)
    }

    fn handle_lsa(&self, src: SocketAddr, lsa: LsaWire) {
        let admission = {
            let mut state = self.state.lock().unwrap();
            state.lsdb.admit(&lsa)
        };
        match admission {
            Admission::Updated => {
                self.recompute_and_install();
                self.flood(&lsa, src);
            }
            Admission::Stale => debug!("rejecting stale LSA from {:?}", lsa.router_id),
            Admission::Rejected => debug!("rejecting malformed LSA from {}", src),
        }
    }

    /// Forwards `original` unchanged to every current neighbor except the
    /// one whose address matches the sender (split horizon, §4.6).
    fn flood(&self, original: &LsaWire, sender: SocketAddr) {
        let neighbor_addrs: Vec<(RouterId, String)> = {
            let state = self.state.lock().unwrap();
            state
                .neighbors
                .iter()
                .map(|(id, entry)| (id.clone(), entry.address.clone()))
                .collect()
        };
        let sender_ip = sender.ip().to_string();
        for (peer, addr) in neighbor_addrs {
            if addr == sender_ip {
                continue;
            }
            match format!("{}:{}", addr, self.config.port).parse::<SocketAddr>() {
                Ok(sock_addr) => {
                    if let Err(e) = self.transport.send_lsa(sock_addr, original) {
                        warn!("failed to forward LSA to {}: {}", peer, e);
                    }
                }
                Err(e) => warn!("neighbor {} has unparseable address {}: {}", peer, addr, e),
            }
        }
    }

    // --- Supervisor loop (§4.10) --------------------------------------------

    fn supervisor_tick(&self) {
        let now = Instant::now();
        let expired = {
            let mut state = self.state.lock().unwrap();
            state.neighbors.expire_stale(now)
        };
        if !expired.is_empty() {
            self.recompute_and_install();
        }

        let non_empty = {
            let state = self.state.lock().unwrap();
            !state.neighbors.is_empty()
        };
        if non_empty {
            let wire = {
                let state = self.state.lock().unwrap();
                let peers: Vec<RouterId> = state.neighbors.keys().cloned().collect();
                self.build_self_lsa(state.lsa_sequence + 1, &peers)
            };
            {
                let mut state = self.state.lock().unwrap();
                state.lsdb.admit(&wire);
            }
            self.recompute_and_install();
        }

        let entries = {
            let state = self.state.lock().unwrap();
            state.lsdb.pending_convergence_log()
        };
        if !entries.is_empty() && convergence::flush(&self.config.router_id, &entries) {
            let mut state = self.state.lock().unwrap();
            state.lsdb.ack_convergence_log(entries.len());
        }
    }

    // --- SPF + FIB reconciliation (§4.8, §4.9) ------------------------------

    fn recompute_and_install(&self) {
        let (graph, neighbor_keys, neighbor_addrs) = {
            let state = self.state.lock().unwrap();
            let neighbor_addrs: HashMap<RouterId, String> = state
                .neighbors
                .iter()
                .map(|(id, entry)| (id.clone(), entry.address.clone()))
                .collect();
            (state.lsdb.graph().clone(), neighbor_addrs.keys().cloned().collect::<std::collections::HashSet<_>>(), neighbor_addrs)
        };

        let raw_routes = crate::dijkstra::shortest_paths(&graph, &self.config.router_id);

        let (filtered, destination_addrs) = {
            let state = self.state.lock().unwrap();
            let mut destination_addrs = HashMap::new();
            let filtered: HashMap<RouterId, (RouterId, Cost)> = raw_routes
                .into_iter()
                .filter(|(dest, (next_hop, _))| {
                    if !neighbor_keys.contains(next_hop) {
                        return false;
                    }
                    match state.lsdb.get(dest) {
                        Some(record) if !record.addresses.is_empty() => {
                            destination_addrs.insert(dest.clone(), record.addresses.clone());
                            true
                        }
                        _ => false,
                    }
                })
                .collect();
            (filtered, destination_addrs)
        };

        {
            let mut state = self.state.lock().unwrap();
            state.routes = filtered.clone();
        }

        let installed = {
            let mut fib = self.fib.lock().unwrap();
            fib.reconcile(&filtered, &neighbor_addrs, &destination_addrs)
        };
        debug!("route recompute: {} routes computed, {} installed", filtered.len(), installed);
    }
}
