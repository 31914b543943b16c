//! Receiving side: accepts final messages from exit relays

use async_trait::async_trait;
use onion_net::{Frame, FrameHandler, FrameType, Nack, NackReason};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A message handed over by an exit relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// Exit relay connection it arrived on
    pub from: SocketAddr,
    pub message: Vec<u8>,
}

impl Received {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

/// Frame handler queueing every delivered message
pub struct Inbox {
    tx: mpsc::Sender<Received>,
}

impl Inbox {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Received>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FrameHandler for Inbox {
    async fn handle(&self, frame: Frame, peer: SocketAddr) -> Frame {
        match frame.frame_type {
            FrameType::Onion => {
                debug!("Message of {} bytes from {}", frame.payload.len(), peer);
                let received = Received {
                    from: peer,
                    message: frame.payload,
                };
                if self.tx.send(received).await.is_err() {
                    warn!("Inbox closed, refusing message from {}", peer);
                    return Nack::frame(NackReason::Unsupported);
                }
                Frame::ack()
            }
            FrameType::Ping => Frame::pong(),
            _ => Nack::frame(NackReason::Unsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:4002".parse().unwrap()
    }

    #[tokio::test]
    async fn test_queues_messages() {
        let (inbox, mut rx) = Inbox::new(4);

        let reply = inbox.handle(Frame::onion(b"hello".to_vec()), peer()).await;
        assert_eq!(reply.frame_type, FrameType::Ack);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.text(), "hello");
        assert_eq!(received.from, peer());
    }

    #[tokio::test]
    async fn test_closed_inbox() {
        let (inbox, rx) = Inbox::new(1);
        drop(rx);

        let reply = inbox.handle(Frame::onion(b"hello".to_vec()), peer()).await;
        assert_eq!(reply.frame_type, FrameType::Nack);
    }

    #[tokio::test]
    async fn test_other_frames() {
        let (inbox, _rx) = Inbox::new(1);
        assert_eq!(inbox.handle(Frame::ping(), peer()).await.frame_type, FrameType::Pong);
        assert_eq!(
            Nack::reason_of(&inbox.handle(Frame::ack(), peer()).await),
            Some(NackReason::Unsupported)
        );
    }
}
