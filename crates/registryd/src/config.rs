//! Configuration for registryd

use clap::Parser;
use std::net::SocketAddr;

/// registryd - Onion Overlay Key Directory
#[derive(Parser, Debug, Clone)]
#[command(name = "registryd")]
#[command(about = "Relay key directory for the onion overlay")]
pub struct Config {
    /// Listen address for registrations and relay list requests
    #[arg(short, long, env = "REGISTRY_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            anyhow::bail!("Unknown log format: {}", self.log_format);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["registryd"]);
        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_log_format() {
        let config = Config::parse_from(["registryd", "--log-format", "xml"]);
        assert!(config.validate().is_err());
    }
}
