//! Onion overlay core
//!
//! This crate implements the onion protocol: a sender picks a circuit of
//! relays, wraps a message in one hybrid-encrypted layer per relay, and each
//! relay peels exactly its own layer to learn the next hop.
//!
//! # Modules
//!
//! - [`crypto`]: RSA-OAEP and AES-GCM primitives, typed keys, import/export
//! - [`address`]: Fixed-width 10-digit next-hop address field
//! - [`directory`]: Relay records and the key directory interface
//! - [`circuit`]: Random circuit selection with an injectable RNG
//! - [`onion`]: Layer framing and wrapping
//! - [`relay`]: Peeling, forwarding and the transport interface
//! - [`client`]: Sender glue
//! - [`error`]: Error types

pub mod address;
pub mod circuit;
pub mod client;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod onion;
pub mod relay;

#[cfg(test)]
mod fixtures;

pub use address::Address;
pub use circuit::{Circuit, CircuitBuilder, CircuitError, DEFAULT_CIRCUIT_LEN};
pub use client::OnionClient;
pub use crypto::{CryptoError, CryptoKey, KeyKind, KeyPair, PrivateKey, PublicKey, SymmetricKey};
pub use directory::{DirectoryError, KeyDirectory, MemoryDirectory, RelayId, RelayRecord};
pub use error::{Error, Result};
pub use onion::{wrap, OnionError};
pub use relay::{peel, Peeled, Relay, RelayError, RelayStats, Transport, TransportError};
