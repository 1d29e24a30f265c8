//! Library surface of the link-state routing daemon: a thread-and-mutex
//! core (§5) that discovers neighbors over HELLO, floods LSAs, runs SPF,
//! and reconciles the result into the kernel FIB.

pub mod cli;
pub mod config;
pub mod convergence;
pub mod daemon;
pub mod dijkstra;
pub mod error;
pub mod fib;
pub mod lsdb;
pub mod neighbor;
pub mod net_utils;
pub mod transport;
pub mod types;

pub use error::{Result, RouterError};
