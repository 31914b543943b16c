//! relayd - onion relay daemon
//!
//! A relay holds one RSA keypair, announces its public key and inbound
//! address to the registry, and for every incoming layer removes exactly one
//! layer and hands the remainder to the next hop it names.

pub mod config;
pub mod server;

pub use config::Config;
pub use server::{NodeError, RelayNode, RelayService};
