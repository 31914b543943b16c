//! Registry frame handling

use async_trait::async_trait;
use onion_core::{DirectoryError, MemoryDirectory, RelayRecord};
use onion_net::{Frame, FrameHandler, FrameType, Nack, NackReason, RelayDescriptor, RelayList};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serves one [`MemoryDirectory`] over the control frames
pub struct RegistryService {
    directory: Arc<MemoryDirectory>,
}

impl RegistryService {
    pub fn new(directory: Arc<MemoryDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    fn register(&self, frame: &Frame, peer: SocketAddr) -> Frame {
        let record = frame
            .body::<RelayDescriptor>()
            .map_err(|e| e.to_string())
            .and_then(|desc| RelayRecord::try_from(&desc).map_err(|e| e.to_string()));

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Bad registration from {}: {}", peer, e);
                return Nack::frame(NackReason::Malformed);
            }
        };

        match self.directory.insert(record) {
            Ok(()) => Frame::ack(),
            Err(DirectoryError::AlreadyRegistered(id)) => {
                warn!("{} tried to re-register {}", peer, id);
                Nack::frame(NackReason::AlreadyRegistered)
            }
            Err(e) => {
                warn!("Registration from {} failed: {}", peer, e);
                Nack::frame(NackReason::Malformed)
            }
        }
    }

    fn list(&self) -> Frame {
        let relays = self
            .directory
            .snapshot()
            .iter()
            .map(RelayDescriptor::from)
            .collect();

        Frame::with_body(FrameType::RelayList, &RelayList { relays }).unwrap_or_else(|e| {
            warn!("Failed to encode relay list: {}", e);
            Nack::frame(NackReason::Unsupported)
        })
    }
}

#[async_trait]
impl FrameHandler for RegistryService {
    async fn handle(&self, frame: Frame, peer: SocketAddr) -> Frame {
        debug!("{:?} from {}", frame.frame_type, peer);
        match frame.frame_type {
            FrameType::Ping => Frame::pong(),
            FrameType::Register => self.register(&frame, peer),
            FrameType::ListRelays => self.list(),
            _ => Nack::frame(NackReason::Unsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onion_core::{Address, KeyDirectory, KeyPair, RelayId};
    use onion_net::{FrameServer, RegistryClient};

    fn peer() -> SocketAddr {
        "127.0.0.1:5555".parse().unwrap()
    }

    fn descriptor(id: u32, kp: &KeyPair) -> RelayDescriptor {
        RelayDescriptor::from(&RelayRecord::new(
            RelayId(id),
            Address::new(4000 + id as u64).unwrap(),
            kp.public().clone(),
        ))
    }

    #[tokio::test]
    async fn test_register_frames() {
        let service = RegistryService::new(Arc::new(MemoryDirectory::new()));
        let kp = KeyPair::generate().unwrap();
        let register = Frame::with_body(FrameType::Register, &descriptor(1, &kp)).unwrap();

        let reply = service.handle(register.clone(), peer()).await;
        assert_eq!(reply.frame_type, FrameType::Ack);

        let reply = service.handle(register, peer()).await;
        assert_eq!(Nack::reason_of(&reply), Some(NackReason::AlreadyRegistered));
        assert_eq!(service.directory().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_registration() {
        let service = RegistryService::new(Arc::new(MemoryDirectory::new()));

        let garbage = Frame::new(FrameType::Register, vec![0xFF; 3]);
        let reply = service.handle(garbage, peer()).await;
        assert_eq!(Nack::reason_of(&reply), Some(NackReason::Malformed));

        let bad_key = RelayDescriptor {
            id: 1,
            address: Address::new(4001).unwrap(),
            public_key: vec![0; 10],
        };
        let frame = Frame::with_body(FrameType::Register, &bad_key).unwrap();
        let reply = service.handle(frame, peer()).await;
        assert_eq!(Nack::reason_of(&reply), Some(NackReason::Malformed));
        assert!(service.directory().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_frame() {
        let service = RegistryService::new(Arc::new(MemoryDirectory::new()));
        let reply = service.handle(Frame::onion(vec![1, 2, 3]), peer()).await;
        assert_eq!(Nack::reason_of(&reply), Some(NackReason::Unsupported));
    }

    #[tokio::test]
    async fn test_over_tcp() {
        let directory = Arc::new(MemoryDirectory::new());
        let server = FrameServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(RegistryService::new(Arc::clone(&directory))),
        )
        .await
        .unwrap();
        let client = RegistryClient::new(server.local_addr().unwrap());
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.run());

        client.ping().await.unwrap();
        assert!(client.list_relays().await.unwrap().is_empty());

        let kp = KeyPair::generate().unwrap();
        for id in [3u32, 1, 2] {
            let record = RelayRecord::try_from(&descriptor(id, &kp)).unwrap();
            client.register(record).await.unwrap();
        }

        let relays = client.list_relays().await.unwrap();
        assert_eq!(relays.len(), 3);
        assert_eq!(relays[0].id, RelayId(1));
        assert_eq!(directory.len(), 3);

        shutdown.shutdown();
        task.await.unwrap();
    }
}
