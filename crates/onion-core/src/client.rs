//! Sending side: directory, fresh circuit, wrap, hand to the entry relay

use crate::address::Address;
use crate::circuit::{Circuit, CircuitBuilder, CircuitError};
use crate::directory::KeyDirectory;
use crate::error::Result;
use crate::onion::wrap;
use crate::relay::Transport;
use parking_lot::Mutex;
use tracing::info;

/// Sends messages through freshly built circuits
pub struct OnionClient<D, T> {
    directory: D,
    transport: T,
    builder: Mutex<CircuitBuilder>,
}

impl<D: KeyDirectory, T: Transport> OnionClient<D, T> {
    pub fn new(directory: D, transport: T, hops: usize) -> Self {
        Self::with_builder(directory, transport, CircuitBuilder::new(hops))
    }

    pub fn with_builder(directory: D, transport: T, builder: CircuitBuilder) -> Self {
        Self {
            directory,
            transport,
            builder: Mutex::new(builder),
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Send `message` to `destination`, returning the circuit used.
    ///
    /// Nothing is sent unless a full circuit could be built.
    pub async fn send(&self, destination: Address, message: &[u8]) -> Result<Circuit> {
        let relays = self.directory.list_relays().await?;
        let circuit = self.builder.lock().build(&relays)?;
        let entry = circuit.entry().ok_or(CircuitError::NoHops)?.address;

        let onion = wrap(circuit.hops(), destination, message)?;
        info!(
            "Sending {} bytes via {:?} (entry {}) to {}",
            onion.len(),
            circuit.ids(),
            entry,
            destination
        );

        self.transport.deliver(entry, onion).await?;
        Ok(circuit)
    }
}
