//! registryd - relay key directory daemon

use clap::Parser;
use onion_core::MemoryDirectory;
use onion_net::FrameServer;
use registryd::{Config, RegistryService};
use std::process::ExitCode;
use std::sync::Arc;
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

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(&config.log_format);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("registryd v{} - Onion Key Directory", env!("CARGO_PKG_VERSION"));

    let service = Arc::new(RegistryService::new(Arc::new(MemoryDirectory::new())));
    let server = match FrameServer::bind(config.listen, service).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", config.listen, e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown.shutdown();
    });

    server.run().await;
    ExitCode::SUCCESS
}
