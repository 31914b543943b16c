//! Configuration for userd

use clap::{Parser, Subcommand};
use onion_core::{Address, DEFAULT_CIRCUIT_LEN};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// userd - Onion Overlay User Node
#[derive(Parser, Debug, Clone)]
#[command(name = "userd")]
#[command(about = "Send and receive messages over the onion overlay")]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Host users and relays are reached at
    #[arg(long, global = true, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// User N listens on base port + N
    #[arg(long, global = true, default_value = "3000")]
    pub base_port: u16,

    /// Registry address
    #[arg(long, global = true, env = "REGISTRY_ADDR", default_value = "127.0.0.1:8080")]
    pub registry: SocketAddr,

    /// Timeout for registry and delivery requests in seconds
    #[arg(long, global = true, default_value = "10")]
    pub timeout_secs: u64,

    /// Log format (json or pretty)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Receive messages and print them
    Listen {
        /// This user's identifier
        #[arg(long, env = "USER_ID")]
        id: u32,
    },
    /// Send one message through a fresh circuit
    Send {
        /// Destination user identifier
        #[arg(long)]
        to: u32,

        /// Message text
        #[arg(short, long)]
        message: String,

        /// Circuit length
        #[arg(long, default_value_t = DEFAULT_CIRCUIT_LEN)]
        hops: usize,
    },
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("Timeout must be at least one second");
        }
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            anyhow::bail!("Unknown log format: {}", self.log_format);
        }
        match &self.command {
            Command::Listen { id } => {
                self.user_port(*id)?;
            }
            Command::Send { to, hops, .. } => {
                self.user_port(*to)?;
                if *hops == 0 {
                    anyhow::bail!("Circuit needs at least one hop");
                }
            }
        }
        Ok(())
    }

    /// Port user `id` listens on
    pub fn user_port(&self, id: u32) -> anyhow::Result<u16> {
        u16::try_from(id)
            .ok()
            .and_then(|id| self.base_port.checked_add(id))
            .ok_or_else(|| anyhow::anyhow!("User id {} overflows base port {}", id, self.base_port))
    }

    /// Overlay address of user `id`
    pub fn user_address(&self, id: u32) -> anyhow::Result<Address> {
        Ok(Address::from(self.user_port(id)?))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
