//! Error types for the onion overlay

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to senders and hosting services
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer relays than hops, or zero hops requested
    #[error(transparent)]
    Circuit(#[from] crate::circuit::CircuitError),

    /// Key handling or cipher failure
    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),

    /// Layer could not be built or parsed
    #[error(transparent)]
    Onion(#[from] crate::onion::OnionError),

    /// Directory lookup or registration failed
    #[error(transparent)]
    Directory(#[from] crate::directory::DirectoryError),

    /// Delivery to the next hop failed
    #[error(transparent)]
    Transport(#[from] crate::relay::TransportError),

    /// Relay could not peel or forward
    #[error(transparent)]
    Relay(#[from] crate::relay::RelayError),

    /// Address outside the 10-digit field
    #[error(transparent)]
    Address(#[from] crate::address::AddressError),
}
