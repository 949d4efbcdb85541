use crate::distance::DistanceControl;
use crate::Result;

use rand::RngCore;

/// An interface for genomes that can be evolved by a [`Population`].
///
/// The population never inspects a genome beyond these
/// operations, so anything from a network topology to a
/// decision tree can be evolved, as long as it can be
/// crossed over, compared and reset.
///
/// Genomes are evaluated and mated from multiple threads
/// at once, hence the `Send + Sync` bound.
///
/// [`Population`]: crate::Population
pub trait Genome: Clone + Send + Sync {
    /// Opaque configuration passed unchanged into
    /// every crossover. Never inspected by the engine.
    type Environment: Sync;

    /// Combines `self` (the fitter parent, or the first
    /// selected one on a fitness tie) with `other`, and
    /// returns an independently owned child.
    ///
    /// `rate` is the population's configured crossover rate.
    /// Randomness must be drawn from `rng` only, so that
    /// seeded runs stay reproducible.
    fn crossover(
        &self,
        other: &Self,
        environment: &Self::Environment,
        rate: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Self>;

    /// Returns the compatibility distance between two genomes.
    ///
    /// Must be symmetric. Implementations keyed by innovation
    /// numbers will usually delegate to [`distance::distance`].
    ///
    /// [`distance::distance`]: crate::distance::distance
    fn distance(&self, other: &Self, control: &DistanceControl) -> Result<f64>;

    /// Clears any transient per-evaluation state before
    /// the genome is carried over to a new generation.
    fn reset(&mut self);
}
