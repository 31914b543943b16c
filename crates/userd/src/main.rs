//! userd - onion overlay user node

use clap::Parser;
use onion_net::FrameServer;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use userd::{describe, user_client, Command, Config, Inbox};

fn init_logging(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn listen(config: &Config, id: u32) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.host, config.user_port(id)?);
    let (inbox, mut rx) = Inbox::new(64);
    let server = FrameServer::bind(addr, Arc::new(inbox)).await?;
    let shutdown = server.shutdown_handle();
    tokio::spawn(server.run());

    info!("User {} listening at {}", id, config.user_address(id)?);
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(received) => println!("{}", received.text()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                shutdown.shutdown();
                break;
            }
        }
    }
    Ok(())
}

async fn send(config: &Config, to: u32, message: &str, hops: usize) -> anyhow::Result<()> {
    let destination = config.user_address(to)?;
    let client = user_client(config.registry, config.host, config.timeout(), hops);

    let circuit = client.send(destination, message.as_bytes()).await?;
    println!("sent to {} via {}", destination, describe(&circuit));
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

    let result = match &config.command {
        Command::Listen { id } => listen(&config, *id).await,
        Command::Send { to, message, hops } => send(&config, *to, message, *hops).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
