//! TCP transport
//!
//! Address N is TCP port N on the configured host. Each delivery opens a
//! connection, sends one `Onion` frame and waits for `Ack` or `Nack`.

use crate::framing::{Frame, FrameCodec, FrameError, FrameType};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use onion_core::{Address, Transport, TransportError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

/// Default connect-plus-response timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Send one frame and wait for the single reply
pub async fn request(addr: SocketAddr, frame: Frame, timeout: Duration) -> Result<Frame, FrameError> {
    tokio::time::timeout(timeout, exchange(addr, frame))
        .await
        .map_err(|_| FrameError::TimedOut)?
}

async fn exchange(addr: SocketAddr, frame: Frame) -> Result<Frame, FrameError> {
    let stream = TcpStream::connect(addr).await?;
    let mut framed = Framed::new(stream, FrameCodec::new());
    framed.send(frame).await?;
    framed.next().await.ok_or(FrameError::ConnectionClosed)?
}

/// Hop-to-hop delivery over loopback (or any single host) TCP
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: IpAddr,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Socket an address maps to
    pub fn socket_addr(&self, to: Address) -> Result<SocketAddr, TransportError> {
        let port = to
            .port()
            .ok_or_else(|| TransportError::Unreachable(to, "not a TCP port".into()))?;
        Ok(SocketAddr::new(self.host, port))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn deliver(&self, to: Address, payload: Vec<u8>) -> Result<(), TransportError> {
        let addr = self.socket_addr(to)?;
        let len = payload.len();

        let reply = request(addr, Frame::onion(payload), self.timeout)
            .await
            .map_err(|e| TransportError::Unreachable(to, e.to_string()))?;

        match reply.frame_type {
            FrameType::Ack => {
                debug!("Delivered {} bytes to {}", len, to);
                Ok(())
            }
            _ => Err(TransportError::Rejected(to)),
        }
    }
}
