use speciate::InnovationContext;

use serde::{Deserialize, Serialize};

/// Configuration data for weight genome generation
/// and mating.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Maximum magnitude of a gene's weight.
    pub weight_bound: f64,
    /// Chance of each gene's weight being mutated in a child.
    pub weight_mutation_chance: f32,
    /// Chance that a mutating weight is reset to a random
    /// value, rather than nudged.
    pub weight_reset_chance: f32,
    /// Magnitude of bound on the weight nudge uniform distribution.
    /// It is assumed to be lesser than [`weight_bound`].
    ///
    /// [`weight_bound`]: WeightConfig::weight_bound
    pub weight_perturbation: f64,
    /// Chance that common gene weights are averaged during mating,
    /// instead of being copied over from either parent.
    pub mate_by_averaging_chance: f32,
    /// Chance of a child gaining a new gene.
    pub gene_addition_chance: f32,
    /// Chance of a child losing one of its genes.
    /// The last gene of a genome is never removed.
    pub gene_removal_chance: f32,
}

impl WeightConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use speciate_weights::WeightConfig;
    ///
    /// let cfg = WeightConfig {
    ///     // Specify some values here...
    ///     weight_bound: 2.0,
    ///     weight_mutation_chance: 1.0,
    ///     // Default the rest...
    ///     ..WeightConfig::zero()
    /// };
    /// # assert_eq!(cfg.gene_addition_chance, 0.0);
    /// ```
    pub const fn zero() -> WeightConfig {
        WeightConfig {
            weight_bound: 0.0,
            weight_mutation_chance: 0.0,
            weight_reset_chance: 0.0,
            weight_perturbation: 0.0,
            mate_by_averaging_chance: 0.0,
            gene_addition_chance: 0.0,
            gene_removal_chance: 0.0,
        }
    }
}

impl Default for WeightConfig {
    fn default() -> WeightConfig {
        WeightConfig {
            weight_bound: 5.0,
            weight_mutation_chance: 0.8,
            weight_reset_chance: 0.1,
            weight_perturbation: 0.5,
            mate_by_averaging_chance: 0.4,
            gene_addition_chance: 0.03,
            gene_removal_chance: 0.01,
        }
    }
}

/// Everything a weight genome needs to mate: the
/// configuration, and the innovation context handing
/// out numbers for new genes.
///
/// This is the [`Genome::Environment`] of [`WeightGenome`].
///
/// [`Genome::Environment`]: speciate::Genome::Environment
/// [`WeightGenome`]: crate::WeightGenome
#[derive(Debug, Default)]
pub struct WeightEnvironment {
    pub config: WeightConfig,
    pub innovations: InnovationContext,
}

impl WeightEnvironment {
    /// Creates an environment with a fresh, unseeded
    /// innovation context.
    pub fn new(config: WeightConfig) -> WeightEnvironment {
        WeightEnvironment {
            config,
            innovations: InnovationContext::new(),
        }
    }

    /// Creates an environment whose innovation context is
    /// seeded, so randomly initialized genomes are reproducible.
    pub fn seeded(config: WeightConfig, seed: u64) -> WeightEnvironment {
        WeightEnvironment {
            config,
            innovations: InnovationContext::seeded(seed),
        }
    }
}
