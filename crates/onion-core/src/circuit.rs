//! Circuit selection
//!
//! A circuit is chosen fresh for every message: `k` distinct relays drawn
//! uniformly from the directory, in random order.

use crate::directory::{RelayId, RelayRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Default number of hops
pub const DEFAULT_CIRCUIT_LEN: usize = 3;

/// Circuit errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CircuitError {
    #[error("insufficient relays: need {needed}, have {available}")]
    InsufficientRelays { needed: usize, available: usize },
    #[error("circuit must have at least one hop")]
    NoHops,
}

/// Ordered relays a message traverses (first = entry, last = exit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    hops: Vec<RelayRecord>,
}

impl Circuit {
    pub fn hops(&self) -> &[RelayRecord] {
        &self.hops
    }

    /// Number of hops
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Relay the wrapped message is handed to
    pub fn entry(&self) -> Option<&RelayRecord> {
        self.hops.first()
    }

    pub fn ids(&self) -> Vec<RelayId> {
        self.hops.iter().map(|r| r.id).collect()
    }
}

/// Draws circuits from a relay pool.
///
/// The random source is a type parameter so tests can pin it; the default is
/// an entropy-seeded CSPRNG.
pub struct CircuitBuilder<R = StdRng> {
    hops: usize,
    rng: R,
}

impl CircuitBuilder<StdRng> {
    /// Builder seeded from OS entropy
    pub fn new(hops: usize) -> Self {
        Self::with_rng(hops, StdRng::from_entropy())
    }

    /// Deterministic builder for tests and reproducible runs
    pub fn with_seed(hops: usize, seed: u64) -> Self {
        Self::with_rng(hops, StdRng::seed_from_u64(seed))
    }
}

impl Default for CircuitBuilder<StdRng> {
    fn default() -> Self {
        Self::new(DEFAULT_CIRCUIT_LEN)
    }
}

impl<R: Rng> CircuitBuilder<R> {
    pub fn with_rng(hops: usize, rng: R) -> Self {
        Self { hops, rng }
    }

    /// Number of hops this builder selects
    pub fn hops(&self) -> usize {
        self.hops
    }

    /// Select `hops` pairwise-distinct relays from `available`.
    ///
    /// The pool is deduplicated by relay id and put in id order first, so the
    /// result depends only on the RNG state and the set of relays, not on the
    /// order they were listed in.
    pub fn build(&mut self, available: &[RelayRecord]) -> Result<Circuit, CircuitError> {
        if self.hops == 0 {
            return Err(CircuitError::NoHops);
        }

        let mut pool: Vec<&RelayRecord> = available
            .iter()
            .map(|r| (r.id, r))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();

        if pool.len() < self.hops {
            return Err(CircuitError::InsufficientRelays {
                needed: self.hops,
                available: pool.len(),
            });
        }

        let (chosen, _) = pool.partial_shuffle(&mut self.rng, self.hops);
        let circuit = Circuit {
            hops: chosen.iter().map(|r| (*r).clone()).collect(),
        };

        debug!("Built circuit {:?}", circuit.ids());
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::relays;
    use std::collections::HashSet;

    #[test]
    fn test_circuit_distinct() {
        let pool = relays(4);
        let mut builder = CircuitBuilder::new(3);

        for _ in 0..50 {
            let circuit = builder.build(&pool).unwrap();
            assert_eq!(circuit.len(), 3);
            let unique: HashSet<_> = circuit.ids().into_iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_insufficient_relays() {
        let pool = relays(2);
        let mut builder = CircuitBuilder::with_seed(3, 7);

        assert_eq!(
            builder.build(&pool),
            Err(CircuitError::InsufficientRelays {
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_duplicates_do_not_count() {
        let mut pool = relays(2);
        pool.push(pool[0].clone());
        pool.push(pool[1].clone());

        let mut builder = CircuitBuilder::with_seed(3, 1);
        assert!(matches!(
            builder.build(&pool),
            Err(CircuitError::InsufficientRelays { available: 2, .. })
        ));
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let pool = relays(4);
        let mut reversed = pool.clone();
        reversed.reverse();

        let a = CircuitBuilder::with_seed(3, 42).build(&pool).unwrap();
        let b = CircuitBuilder::with_seed(3, 42).build(&reversed).unwrap();
        assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn test_uses_whole_pool() {
        let pool = relays(4);
        let mut builder = CircuitBuilder::with_seed(3, 3);

        let mut seen = HashSet::new();
        let mut entries = HashSet::new();
        for _ in 0..200 {
            let circuit = builder.build(&pool).unwrap();
            entries.insert(circuit.entry().unwrap().id);
            seen.extend(circuit.ids());
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_zero_hops() {
        let mut builder = CircuitBuilder::with_seed(0, 0);
        assert_eq!(builder.build(&relays(3)), Err(CircuitError::NoHops));
    }
}
