//! Onion layer framing and wrapping
//!
//! Wire format of one layer:
//!
//! ```text
//! OnionLayer   := wrapped_key (256) || iv (16) || ciphertext || tag (16)
//! InnerPayload := next_hop (10 ASCII digits) || body
//! ```
//!
//! The wrapped key length is fixed by the RSA modulus, so a relay can split a
//! layer without any length prefix.

use crate::address::{Address, AddressError, ADDRESS_FIELD_LEN};
use crate::crypto::{
    asymmetric_encrypt, symmetric_encrypt, CryptoError, SymmetricKey, IV_LEN, TAG_LEN,
    WRAPPED_KEY_LEN,
};
use crate::directory::RelayRecord;
use thiserror::Error;
use tracing::debug;

/// Shortest byte string that can be a layer
pub const MIN_LAYER_LEN: usize = WRAPPED_KEY_LEN + IV_LEN + TAG_LEN;

/// Onion errors
#[derive(Debug, Error)]
pub enum OnionError {
    #[error("malformed layer: {0}")]
    MalformedLayer(String),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("cannot wrap for an empty circuit")]
    EmptyCircuit,
}

impl From<AddressError> for OnionError {
    fn from(e: AddressError) -> Self {
        Self::MalformedLayer(e.to_string())
    }
}

/// Borrowed view of one layer, split at the fixed boundary
#[derive(Debug, Clone, Copy)]
pub struct OnionLayer<'a> {
    /// Symmetric key encrypted under the hop's public key
    pub wrapped_key: &'a [u8],
    /// `iv || ciphertext || tag` of the inner payload
    pub sealed: &'a [u8],
}

impl<'a> OnionLayer<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, OnionError> {
        if bytes.len() < MIN_LAYER_LEN {
            return Err(OnionError::MalformedLayer(format!(
                "{} bytes, need at least {MIN_LAYER_LEN}",
                bytes.len()
            )));
        }
        let (wrapped_key, sealed) = bytes.split_at(WRAPPED_KEY_LEN);
        Ok(Self {
            wrapped_key,
            sealed,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wrapped_key.len() + self.sealed.len());
        out.extend_from_slice(self.wrapped_key);
        out.extend_from_slice(self.sealed);
        out
    }
}

/// Decrypted content of a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerPayload {
    /// Where the body goes next
    pub next_hop: Address,
    /// Next layer, or the original message at the last hop
    pub body: Vec<u8>,
}

impl InnerPayload {
    pub fn new(next_hop: Address, body: Vec<u8>) -> Self {
        Self { next_hop, body }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ADDRESS_FIELD_LEN + self.body.len());
        out.extend_from_slice(&self.next_hop.to_field());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, OnionError> {
        if bytes.len() < ADDRESS_FIELD_LEN {
            return Err(OnionError::MalformedLayer(format!(
                "inner payload of {} bytes has no address",
                bytes.len()
            )));
        }
        let next_hop = Address::from_field(&bytes[..ADDRESS_FIELD_LEN])?;
        let body = bytes.split_off(ADDRESS_FIELD_LEN);
        Ok(Self { next_hop, body })
    }
}

/// Wrap `plaintext` for `circuit`, addressed to `destination` after the last hop.
///
/// Layers are built from the exit backwards, so the returned bytes are the
/// layer for `circuit[0]`. Each hop gets a fresh symmetric key.
pub fn wrap(
    circuit: &[RelayRecord],
    destination: Address,
    plaintext: &[u8],
) -> Result<Vec<u8>, OnionError> {
    if circuit.is_empty() {
        return Err(OnionError::EmptyCircuit);
    }

    let mut payload = plaintext.to_vec();
    let mut next_hop = destination;

    for relay in circuit.iter().rev() {
        let key = SymmetricKey::generate();
        let inner = InnerPayload::new(next_hop, payload).to_bytes();

        let sealed = symmetric_encrypt(&key, &inner)?;
        let wrapped_key = asymmetric_encrypt(key.as_bytes(), &relay.public_key)?;

        payload = OnionLayer {
            wrapped_key: &wrapped_key,
            sealed: &sealed,
        }
        .to_bytes();
        next_hop = relay.address;
    }

    debug!(
        "Wrapped {} layers ({} bytes) for {}",
        circuit.len(),
        payload.len(),
        destination
    );
    Ok(payload)
}

/// Size of a wrapped message for a given plaintext length and hop count
pub fn wrapped_len(plaintext_len: usize, hops: usize) -> usize {
    plaintext_len + hops * (MIN_LAYER_LEN + ADDRESS_FIELD_LEN)
}
