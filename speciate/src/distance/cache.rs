use super::DistanceControl;
use crate::populations::GenomeId;
use crate::{Genome, Result};

use ahash::RandomState;
use dashmap::DashMap;

use std::sync::atomic::{AtomicUsize, Ordering};

/// Memoizes genome distances over unordered pairs
/// of genome ids within a single generation.
///
/// Safe to share between the threads computing distances
/// to species mascots. Concurrent inserts of the same pair
/// are harmless, as the computed value is identical.
///
/// The cache must be [cleared] before each re-speciation:
/// ids from a replaced generation name genomes that no
/// longer exist.
///
/// [cleared]: DistanceCache::clear
#[derive(Debug, Default)]
pub struct DistanceCache {
    distances: DashMap<(GenomeId, GenomeId), f64, RandomState>,
    computations: AtomicUsize,
}

impl DistanceCache {
    /// Returns an empty cache.
    pub fn new() -> DistanceCache {
        DistanceCache {
            distances: DashMap::with_hasher(RandomState::new()),
            computations: AtomicUsize::new(0),
        }
    }

    /// Returns the distance between genomes `a` and `b`,
    /// computing it only if neither `(a, b)` nor `(b, a)`
    /// has been seen since the last [`clear`].
    ///
    /// [`clear`]: DistanceCache::clear
    pub fn distance<G: Genome>(
        &self,
        (id_a, genome_a): (GenomeId, &G),
        (id_b, genome_b): (GenomeId, &G),
        control: &DistanceControl,
    ) -> Result<f64> {
        if let Some(d) = self.distances.get(&(id_a, id_b)) {
            return Ok(*d);
        }
        if let Some(d) = self.distances.get(&(id_b, id_a)) {
            return Ok(*d);
        }
        let d = genome_a.distance(genome_b, control)?;
        self.computations.fetch_add(1, Ordering::Relaxed);
        self.distances.insert((id_a, id_b), d);
        self.distances.insert((id_b, id_a), d);
        Ok(d)
    }

    /// Forgets all cached distances.
    pub fn clear(&mut self) {
        self.distances.clear();
    }

    /// Returns the number of cached ordered pairs.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Returns whether the cache holds no distances.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Returns how many distances were actually computed
    /// (cache misses) over the cache's lifetime.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}
