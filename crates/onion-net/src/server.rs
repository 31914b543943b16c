//! Frame server loop shared by the daemons

use crate::framing::{Frame, FrameCodec, FrameError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

/// Answers one request frame with one reply frame
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    async fn handle(&self, frame: Frame, peer: SocketAddr) -> Frame;
}

/// Signals a running [`FrameServer`] to stop accepting connections
#[derive(Clone)]
pub struct ShutdownHandle(broadcast::Sender<()>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.0.send(());
    }
}

/// TCP listener dispatching every frame to a handler
pub struct FrameServer<H> {
    listener: TcpListener,
    handler: Arc<H>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<H: FrameHandler> FrameServer<H> {
    pub async fn bind(addr: SocketAddr, handler: Arc<H>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            listener,
            handler,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Accept connections until shut down
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if let Ok(addr) = self.listener.local_addr() {
            info!("Listening on {}", addr);
        }

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("Accepted connection from {}", addr);
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, addr, handler).await {
                                    warn!("Connection error from {}: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutting down listener");
                    break;
                }
            }
        }
    }
}

async fn serve_connection<H: FrameHandler>(
    stream: TcpStream,
    addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), FrameError> {
    let mut framed = Framed::new(stream, FrameCodec::new());
    while let Some(frame) = framed.next().await {
        let reply = handler.handle(frame?, addr).await;
        framed.send(reply).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::FrameType;
    use crate::messages::{Nack, NackReason};
    use crate::transport::{request, DEFAULT_TIMEOUT};

    struct Echo;

    #[async_trait]
    impl FrameHandler for Echo {
        async fn handle(&self, frame: Frame, _peer: SocketAddr) -> Frame {
            match frame.frame_type {
                FrameType::Ping => Frame::pong(),
                _ => Nack::frame(NackReason::Unsupported),
            }
        }
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let server = FrameServer::bind("127.0.0.1:0".parse().unwrap(), Arc::new(Echo))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.run());

        let reply = request(addr, Frame::ping(), DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(reply.frame_type, FrameType::Pong);

        let reply = request(addr, Frame::ack(), DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(Nack::reason_of(&reply), Some(NackReason::Unsupported));

        shutdown.shutdown();
        task.await.unwrap();
    }
}
