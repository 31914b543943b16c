//! relayd - onion relay daemon

use clap::Parser;
use onion_net::{RegistryClient, TcpTransport};
use relayd::{Config, RelayNode};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let keypair = config.keypair()?;
    let transport = TcpTransport::new(config.host).with_timeout(config.timeout());
    let node = RelayNode::bind(config.relay_id(), keypair, config.listen_addr()?, transport).await?;

    let registry = RegistryClient::new(config.registry).with_timeout(config.timeout());
    node.register(&registry).await?;

    let shutdown = node.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown.shutdown();
    });

    node.run().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(&config.log_format);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("relayd v{} - Onion Relay {}", env!("CARGO_PKG_VERSION"), config.id);

    if let Err(e) = run(config).await {
        error!("Relay failed: {:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
