//! Shared test fixtures
//!
//! RSA key generation dominates test time, so keys are derived once from
//! fixed seeds and reused.

use crate::address::Address;
use crate::crypto::KeyPair;
use crate::directory::{RelayId, RelayRecord};
use crate::relay::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::OnceLock;

const FIXTURE_KEYS: usize = 4;

static KEYPAIRS: OnceLock<Vec<KeyPair>> = OnceLock::new();

pub fn keypair(index: usize) -> &'static KeyPair {
    let keys = KEYPAIRS.get_or_init(|| {
        (0..FIXTURE_KEYS)
            .map(|i| KeyPair::generate_with(&mut StdRng::seed_from_u64(i as u64)).unwrap())
            .collect()
    });
    &keys[index]
}

pub fn relay(index: usize) -> RelayRecord {
    RelayRecord::new(
        RelayId(index as u32),
        Address::new(4000 + index as u64).unwrap(),
        keypair(index).public().clone(),
    )
}

/// Relays 0..n, in id order
pub fn relays(n: usize) -> Vec<RelayRecord> {
    (0..n).map(relay).collect()
}

/// Transport that records deliveries instead of sending them
#[derive(Default)]
pub struct MemoryTransport {
    delivered: Mutex<Vec<(Address, Vec<u8>)>>,
    refuse: bool,
}

impl MemoryTransport {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn take(&self) -> Vec<(Address, Vec<u8>)> {
        std::mem::take(&mut *self.delivered.lock())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn deliver(&self, to: Address, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.refuse {
            return Err(TransportError::Rejected(to));
        }
        self.delivered.lock().push((to, payload));
        Ok(())
    }
}
