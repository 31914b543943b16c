//! Relay key directory
//!
//! The directory maps relay identifiers to the public key and inbound address
//! each relay announced when it registered. Senders only read from it.

use crate::address::Address;
use crate::crypto::{CryptoError, PublicKey};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("relay already registered: {0}")]
    AlreadyRegistered(RelayId),
    #[error("invalid relay key: {0}")]
    InvalidKey(#[from] CryptoError),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Relay identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RelayId(pub u32);

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay-{}", self.0)
    }
}

/// A registered relay. Never mutated after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRecord {
    /// Relay identifier
    pub id: RelayId,
    /// Where the previous hop delivers layers for this relay
    pub address: Address,
    /// Key the sender wraps this relay's layer under
    pub public_key: PublicKey,
}

impl RelayRecord {
    pub fn new(id: RelayId, address: Address, public_key: PublicKey) -> Self {
        Self {
            id,
            address,
            public_key,
        }
    }

    /// Build a record from the raw parts carried in a registration
    pub fn from_parts(id: u32, address: Address, public_key_der: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::new(
            RelayId(id),
            address,
            PublicKey::from_der(public_key_der)?,
        ))
    }
}

/// Read/write interface of the key directory
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Add a relay. Identifiers are unique for the directory's lifetime.
    async fn register(&self, record: RelayRecord) -> Result<(), DirectoryError>;

    /// Every registered relay, ordered by identifier
    async fn list_relays(&self) -> Result<Vec<RelayRecord>, DirectoryError>;

    /// Look up a single relay
    async fn lookup(&self, id: RelayId) -> Result<Option<RelayRecord>, DirectoryError> {
        Ok(self.list_relays().await?.into_iter().find(|r| r.id == id))
    }
}

/// In-process directory store.
///
/// Created by whichever service owns the directory and shared by reference;
/// there is no global instance.
#[derive(Default)]
pub struct MemoryDirectory {
    relays: RwLock<BTreeMap<RelayId, RelayRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered relays
    pub fn len(&self) -> usize {
        self.relays.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.read().is_empty()
    }

    /// Synchronous form of [`KeyDirectory::register`]
    pub fn insert(&self, record: RelayRecord) -> Result<(), DirectoryError> {
        let mut relays = self.relays.write();
        if relays.contains_key(&record.id) {
            return Err(DirectoryError::AlreadyRegistered(record.id));
        }
        info!(
            "Registered {} at {} (key {})",
            record.id,
            record.address,
            record.public_key.fingerprint()
        );
        relays.insert(record.id, record);
        Ok(())
    }

    /// Synchronous form of [`KeyDirectory::list_relays`]
    pub fn snapshot(&self) -> Vec<RelayRecord> {
        self.relays.read().values().cloned().collect()
    }

    pub fn get(&self, id: RelayId) -> Option<RelayRecord> {
        self.relays.read().get(&id).cloned()
    }
}

#[async_trait]
impl KeyDirectory for MemoryDirectory {
    async fn register(&self, record: RelayRecord) -> Result<(), DirectoryError> {
        self.insert(record)
    }

    async fn list_relays(&self) -> Result<Vec<RelayRecord>, DirectoryError> {
        Ok(self.snapshot())
    }

    async fn lookup(&self, id: RelayId) -> Result<Option<RelayRecord>, DirectoryError> {
        Ok(self.get(id))
    }
}
