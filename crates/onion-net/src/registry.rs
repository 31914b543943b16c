//! Registry client
//!
//! Speaks the control frames served by `registryd` and exposes them as a
//! [`KeyDirectory`].

use crate::framing::{Frame, FrameError, FrameType};
use crate::messages::{Nack, NackReason, RelayDescriptor, RelayList};
use crate::transport::{request, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use onion_core::{DirectoryError, KeyDirectory, RelayRecord};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::debug;

/// [`KeyDirectory`] backed by a remote registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl RegistryClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Liveness check
    pub async fn ping(&self) -> Result<(), FrameError> {
        request(self.addr, Frame::ping(), self.timeout)
            .await?
            .expect(FrameType::Pong)?;
        Ok(())
    }

    async fn call(&self, frame: Frame) -> Result<Frame, DirectoryError> {
        request(self.addr, frame, self.timeout)
            .await
            .map_err(|e| unavailable(self.addr, e))
    }
}

fn unavailable(addr: SocketAddr, e: impl std::fmt::Display) -> DirectoryError {
    DirectoryError::Unavailable(format!("registry {}: {}", addr, e))
}

#[async_trait]
impl KeyDirectory for RegistryClient {
    async fn register(&self, record: RelayRecord) -> Result<(), DirectoryError> {
        let frame = Frame::with_body(FrameType::Register, &RelayDescriptor::from(&record))
            .map_err(|e| unavailable(self.addr, e))?;

        let reply = self.call(frame).await?;
        match reply.frame_type {
            FrameType::Ack => {
                debug!("Registered {} with {}", record.id, self.addr);
                Ok(())
            }
            FrameType::Nack if Nack::reason_of(&reply) == Some(NackReason::AlreadyRegistered) => {
                Err(DirectoryError::AlreadyRegistered(record.id))
            }
            other => Err(unavailable(
                self.addr,
                format!("registration refused ({:?})", other),
            )),
        }
    }

    async fn list_relays(&self) -> Result<Vec<RelayRecord>, DirectoryError> {
        let list: RelayList = self
            .call(Frame::new(FrameType::ListRelays, vec![]))
            .await?
            .expect(FrameType::RelayList)
            .and_then(|f| f.body())
            .map_err(|e| unavailable(self.addr, e))?;

        let mut relays = list
            .relays
            .iter()
            .map(RelayRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        relays.sort_by_key(|r| r.id);
        Ok(relays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{FrameHandler, FrameServer};
    use onion_core::{Address, KeyPair, MemoryDirectory, RelayId};
    use std::sync::Arc;

    /// Minimal registry over a [`MemoryDirectory`]
    struct TestRegistry(MemoryDirectory);

    #[async_trait]
    impl FrameHandler for TestRegistry {
        async fn handle(&self, frame: Frame, _peer: SocketAddr) -> Frame {
            match frame.frame_type {
                FrameType::Ping => Frame::pong(),
                FrameType::Register => {
                    let desc: RelayDescriptor = frame.body().unwrap();
                    match self.0.insert(RelayRecord::try_from(&desc).unwrap()) {
                        Ok(()) => Frame::ack(),
                        Err(_) => Nack::frame(NackReason::AlreadyRegistered),
                    }
                }
                FrameType::ListRelays => {
                    let relays = self.0.snapshot().iter().map(RelayDescriptor::from).collect();
                    Frame::with_body(FrameType::RelayList, &RelayList { relays }).unwrap()
                }
                _ => Nack::frame(NackReason::Unsupported),
            }
        }
    }

    async fn start() -> RegistryClient {
        let server = FrameServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(TestRegistry(MemoryDirectory::new())),
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        RegistryClient::new(addr)
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let client = start().await;
        client.ping().await.unwrap();

        let kp = KeyPair::generate().unwrap();
        for id in [2u32, 1] {
            let record = RelayRecord::new(
                RelayId(id),
                Address::new(4000 + id as u64).unwrap(),
                kp.public().clone(),
            );
            client.register(record).await.unwrap();
        }

        let relays = client.list_relays().await.unwrap();
        assert_eq!(
            relays.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![RelayId(1), RelayId(2)]
        );
        assert_eq!(relays[0].public_key, *kp.public());

        let found = client.lookup(RelayId(2)).await.unwrap().unwrap();
        assert_eq!(found.address, Address::new(4002).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let client = start().await;
        let kp = KeyPair::generate().unwrap();
        let record = RelayRecord::new(RelayId(7), Address::new(4007).unwrap(), kp.public().clone());

        client.register(record.clone()).await.unwrap();
        assert!(matches!(
            client.register(record).await,
            Err(DirectoryError::AlreadyRegistered(RelayId(7)))
        ));
    }

    #[tokio::test]
    async fn test_registry_down() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = RegistryClient::new(SocketAddr::from(([127, 0, 0, 1], port)))
            .with_timeout(Duration::from_secs(2));

        assert!(matches!(
            client.list_relays().await,
            Err(DirectoryError::Unavailable(_))
        ));
    }
}
