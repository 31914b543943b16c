//! Networking for the onion overlay
//!
//! This crate provides:
//! - Length-prefixed message framing
//! - Control message bodies (registration, relay lists, status)
//! - A TCP [`Transport`](onion_core::Transport) for hop-to-hop delivery
//! - A frame server loop shared by the daemons
//! - A [`KeyDirectory`](onion_core::KeyDirectory) client for the registry

pub mod framing;
pub mod messages;
pub mod registry;
pub mod server;
pub mod transport;

pub use framing::{Frame, FrameCodec, FrameError, FrameType};
pub use messages::{Nack, NackReason, RelayDescriptor, RelayList, StatusReport};
pub use registry::RegistryClient;
pub use server::{FrameHandler, FrameServer, ShutdownHandle};
pub use transport::{request, TcpTransport, DEFAULT_TIMEOUT};
