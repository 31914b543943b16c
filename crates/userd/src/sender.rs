//! Sending side wiring

use onion_core::{Circuit, OnionClient};
use onion_net::{RegistryClient, TcpTransport};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Sender over the registry and TCP delivery
pub type UserClient = OnionClient<RegistryClient, TcpTransport>;

pub fn user_client(registry: SocketAddr, host: IpAddr, timeout: Duration, hops: usize) -> UserClient {
    OnionClient::new(
        RegistryClient::new(registry).with_timeout(timeout),
        TcpTransport::new(host).with_timeout(timeout),
        hops,
    )
}

/// Human-readable hop list, entry first
pub fn describe(circuit: &Circuit) -> String {
    circuit
        .hops()
        .iter()
        .map(|r| format!("{}@{}", r.id, r.address))
        .collect::<Vec<_>>()
        .join(" -> ")
}
