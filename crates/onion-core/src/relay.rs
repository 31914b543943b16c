//! Layer peeling and forwarding

use crate::address::Address;
use crate::crypto::{asymmetric_decrypt, symmetric_decrypt, KeyPair, PrivateKey, SymmetricKey};
use crate::directory::RelayId;
use crate::onion::{InnerPayload, OnionError, OnionLayer};
use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Transport errors reported by a [`Transport`]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("address {0} is not reachable: {1}")]
    Unreachable(Address, String),
    #[error("delivery to {0} rejected")]
    Rejected(Address),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hop-to-hop delivery, supplied by the process hosting the protocol
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` to `to`. No retry is expected of implementations.
    async fn deliver(&self, to: Address, payload: Vec<u8>) -> Result<(), TransportError>;
}

/// Relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("onion error: {0}")]
    Onion(#[from] OnionError),
    #[error("forward to {to} failed: {source}")]
    Forward {
        to: Address,
        #[source]
        source: TransportError,
    },
}

/// Result of removing one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peeled {
    /// Address the remainder must be delivered to
    pub next_hop: Address,
    /// Next layer, or the plaintext if this was the last hop
    pub payload: Vec<u8>,
}

/// Remove exactly one layer with this relay's private key.
///
/// There is no on-wire marker for the last hop: the caller forwards the
/// remainder to `next_hop` either way.
pub fn peel(incoming: &[u8], key: &PrivateKey) -> Result<Peeled, OnionError> {
    let layer = OnionLayer::parse(incoming)?;

    let raw_key = asymmetric_decrypt(layer.wrapped_key, key)?;
    let sym_key = SymmetricKey::from_bytes(&raw_key)
        .map_err(|e| OnionError::MalformedLayer(e.to_string()))?;

    let inner = InnerPayload::from_bytes(symmetric_decrypt(&sym_key, layer.sealed)?)?;
    Ok(Peeled {
        next_hop: inner.next_hop,
        payload: inner.body,
    })
}

/// Relay statistics. Counters and addresses only, never payload bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub cells_processed: u64,
    pub cells_forwarded: u64,
    pub cells_dropped: u64,
    pub forward_failures: u64,
    pub last_next_hop: Option<Address>,
}

/// Relay node handler
pub struct Relay {
    id: RelayId,
    keypair: KeyPair,
    stats: RwLock<RelayStats>,
}

impl Relay {
    pub fn new(id: RelayId, keypair: KeyPair) -> Self {
        Self {
            id,
            keypair,
            stats: RwLock::new(RelayStats::default()),
        }
    }

    pub fn id(&self) -> RelayId {
        self.id
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Peel one layer, recording the outcome
    pub fn peel(&self, incoming: &[u8]) -> Result<Peeled, RelayError> {
        let result = peel(incoming, self.keypair.private());

        let mut stats = self.stats.write();
        stats.cells_processed += 1;
        match &result {
            Ok(peeled) => {
                stats.last_next_hop = Some(peeled.next_hop);
                debug!(
                    "{} peeled {} bytes, next hop {}",
                    self.id,
                    incoming.len(),
                    peeled.next_hop
                );
            }
            Err(e) => {
                stats.cells_dropped += 1;
                warn!("{} dropped cell of {} bytes: {}", self.id, incoming.len(), e);
            }
        }

        result.map_err(RelayError::from)
    }

    /// Peel and forward. Returns the address the remainder went to.
    pub async fn relay<T: Transport + ?Sized>(
        &self,
        incoming: &[u8],
        transport: &T,
    ) -> Result<Address, RelayError> {
        let peeled = self.peel(incoming)?;
        let to = peeled.next_hop;

        match transport.deliver(to, peeled.payload).await {
            Ok(()) => {
                self.stats.write().cells_forwarded += 1;
                Ok(to)
            }
            Err(source) => {
                self.stats.write().forward_failures += 1;
                warn!("{} could not forward to {}: {}", self.id, to, source);
                Err(RelayError::Forward { to, source })
            }
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats.read().clone()
    }
}
