//! Control message bodies
//!
//! None of these ever carry message content: negative responses name a
//! reason category only.

use crate::framing::{Frame, FrameType};
use onion_core::{Address, CryptoError, RelayId, RelayRecord, RelayStats};
use serde::{Deserialize, Serialize};

/// A relay as announced to and listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDescriptor {
    /// Relay identifier
    pub id: u32,
    /// Inbound address
    pub address: Address,
    /// SPKI DER public key
    pub public_key: Vec<u8>,
}

impl From<&RelayRecord> for RelayDescriptor {
    fn from(record: &RelayRecord) -> Self {
        Self {
            id: record.id.0,
            address: record.address,
            public_key: record.public_key.as_der().to_vec(),
        }
    }
}

impl TryFrom<&RelayDescriptor> for RelayRecord {
    type Error = CryptoError;

    fn try_from(desc: &RelayDescriptor) -> Result<Self, Self::Error> {
        RelayRecord::from_parts(desc.id, desc.address, &desc.public_key)
    }
}

/// Body of a `RelayList` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayList {
    pub relays: Vec<RelayDescriptor>,
}

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NackReason {
    /// Layer or body could not be parsed or decrypted
    Malformed,
    /// Peeled fine but the next hop did not accept it
    ForwardFailed,
    /// Relay id already taken
    AlreadyRegistered,
    /// Frame type not served here
    Unsupported,
}

/// Body of a `Nack` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nack {
    pub reason: NackReason,
}

impl Nack {
    pub fn frame(reason: NackReason) -> Frame {
        let body = postcard::to_allocvec(&Self { reason }).unwrap_or_default();
        Frame::new(FrameType::Nack, body)
    }

    /// Reason carried by a `Nack` frame, if it decodes
    pub fn reason_of(frame: &Frame) -> Option<NackReason> {
        frame.body::<Self>().ok().map(|n| n.reason)
    }
}

/// Body of a `StatusReport` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub relay_id: u32,
    pub cells_processed: u64,
    pub cells_forwarded: u64,
    pub cells_dropped: u64,
    pub forward_failures: u64,
    pub last_next_hop: Option<Address>,
}

impl StatusReport {
    pub fn new(id: RelayId, stats: &RelayStats) -> Self {
        Self {
            relay_id: id.0,
            cells_processed: stats.cells_processed,
            cells_forwarded: stats.cells_forwarded,
            cells_dropped: stats.cells_dropped,
            forward_failures: stats.forward_failures,
            last_next_hop: stats.last_next_hop,
        }
    }
}
