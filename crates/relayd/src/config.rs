//! Configuration for relayd

use clap::Parser;
use onion_core::{CryptoError, KeyPair, PrivateKey, RelayId};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// relayd - Onion Relay Daemon
#[derive(Parser, Debug, Clone)]
#[command(name = "relayd")]
#[command(about = "Onion relay: peels one layer and forwards to the next hop")]
pub struct Config {
    /// Relay identifier, unique within the registry
    #[arg(long, env = "RELAY_ID")]
    pub id: u32,

    /// Host to listen on and to reach next hops at
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Relay N listens on base port + N
    #[arg(long, default_value = "4000")]
    pub base_port: u16,

    /// Registry address
    #[arg(long, env = "REGISTRY_ADDR", default_value = "127.0.0.1:8080")]
    pub registry: SocketAddr,

    /// Base64 PKCS#8 private key; a fresh key is generated when absent
    #[arg(long, env = "RELAY_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Timeout for forwarding and registry requests in seconds
    #[arg(long, default_value = "10")]
    pub timeout_secs: u64,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.port()?;
        if self.timeout_secs == 0 {
            anyhow::bail!("Timeout must be at least one second");
        }
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            anyhow::bail!("Unknown log format: {}", self.log_format);
        }
        Ok(())
    }

    pub fn relay_id(&self) -> RelayId {
        RelayId(self.id)
    }

    /// Inbound port for this relay
    pub fn port(&self) -> anyhow::Result<u16> {
        u16::try_from(self.id)
            .ok()
            .and_then(|id| self.base_port.checked_add(id))
            .ok_or_else(|| anyhow::anyhow!("Relay id {} overflows base port {}", self.id, self.base_port))
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(SocketAddr::new(self.host, self.port()?))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Imported keypair, or a freshly generated one
    pub fn keypair(&self) -> Result<KeyPair, CryptoError> {
        match &self.private_key {
            Some(encoded) => KeyPair::from_private(PrivateKey::import(encoded.trim())?),
            None => KeyPair::generate(),
        }
    }
}
