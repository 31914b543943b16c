//! Relay node: frame handling, registration and the accept loop

use async_trait::async_trait;
use onion_core::{
    Address, DirectoryError, KeyDirectory, KeyPair, Relay, RelayError, RelayId, RelayRecord,
    Transport,
};
use onion_net::{
    Frame, FrameHandler, FrameServer, FrameType, Nack, NackReason, ShutdownHandle, StatusReport,
    TcpTransport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Node errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Registration failed: {0}")]
    Registration(#[from] DirectoryError),
}

/// Frame handler for a single relay
pub struct RelayService<T = TcpTransport> {
    relay: Relay,
    transport: T,
}

impl<T: Transport> RelayService<T> {
    pub fn new(relay: Relay, transport: T) -> Self {
        Self { relay, transport }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    async fn onion(&self, payload: &[u8], peer: SocketAddr) -> Frame {
        match self.relay.relay(payload, &self.transport).await {
            Ok(to) => {
                debug!("{} forwarded cell from {} to {}", self.relay.id(), peer, to);
                Frame::ack()
            }
            Err(RelayError::Onion(_)) => Nack::frame(NackReason::Malformed),
            Err(RelayError::Forward { .. }) => Nack::frame(NackReason::ForwardFailed),
        }
    }

    fn status(&self) -> Frame {
        let report = StatusReport::new(self.relay.id(), &self.relay.stats());
        Frame::with_body(FrameType::StatusReport, &report).unwrap_or_else(|e| {
            warn!("Failed to encode status: {}", e);
            Nack::frame(NackReason::Unsupported)
        })
    }
}

#[async_trait]
impl<T: Transport + 'static> FrameHandler for RelayService<T> {
    async fn handle(&self, frame: Frame, peer: SocketAddr) -> Frame {
        match frame.frame_type {
            FrameType::Onion => self.onion(&frame.payload, peer).await,
            FrameType::Status => self.status(),
            FrameType::Ping => Frame::pong(),
            _ => Nack::frame(NackReason::Unsupported),
        }
    }
}

/// A bound relay ready to register and serve
pub struct RelayNode<T = TcpTransport> {
    server: FrameServer<RelayService<T>>,
    service: Arc<RelayService<T>>,
    record: RelayRecord,
}

impl<T: Transport + 'static> RelayNode<T> {
    /// Bind `listen`. The announced address is the port actually bound.
    pub async fn bind(
        id: RelayId,
        keypair: KeyPair,
        listen: SocketAddr,
        transport: T,
    ) -> Result<Self, NodeError> {
        let public_key = keypair.public().clone();
        let service = Arc::new(RelayService::new(Relay::new(id, keypair), transport));
        let server = FrameServer::bind(listen, Arc::clone(&service)).await?;

        let port = server.local_addr()?.port();
        let record = RelayRecord::new(id, Address::from(port), public_key);

        info!(
            "{} bound at {} (key {})",
            id,
            record.address,
            record.public_key.fingerprint()
        );
        Ok(Self {
            server,
            service,
            record,
        })
    }

    /// What this relay announces to the directory
    pub fn record(&self) -> &RelayRecord {
        &self.record
    }

    pub fn service(&self) -> Arc<RelayService<T>> {
        Arc::clone(&self.service)
    }

    pub async fn register<D: KeyDirectory + ?Sized>(&self, directory: &D) -> Result<(), NodeError> {
        directory.register(self.record.clone()).await?;
        info!("{} registered", self.record.id);
        Ok(())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.server.shutdown_handle()
    }

    pub async fn run(self) {
        self.server.run().await
    }
}
