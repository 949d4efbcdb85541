//! # speciate-weights
//! An innovation-keyed weight map implementation of the [`speciate` crate](../speciate/index.html)'s `Genome` trait.
//!
//! Provides a [`WeightGenome`] type usable in `speciate` `Population`s: a set of
//! weighted genes, each tagged with the innovation number it was created with.
//! Genes common to two genomes are mixed during mating, new genes draw their
//! innovation numbers from the [`WeightEnvironment`]'s shared context, and genetic
//! distance follows the usual excess/disjoint/weight-difference formula.
//!
//! [`WeightGenome`]: crate::WeightGenome
//! [`WeightEnvironment`]: crate::WeightEnvironment
//!
//! # Example usage: evolving weights towards zero
//! ```
//! use speciate::{Population, PopulationSettings};
//! use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
//! use std::num::NonZeroUsize;
//!
//! fn evaluate(genome: &WeightGenome) -> f32 {
//!     let error: f64 = genome.weights().map(|(_, w)| w.abs()).sum();
//!     (1.0 / (1.0 + error)) as f32
//! }
//!
//! let environment = WeightEnvironment::seeded(
//!     WeightConfig {
//!         weight_bound: 2.0,
//!         weight_mutation_chance: 0.5,
//!         weight_perturbation: 0.2,
//!         ..WeightConfig::zero()
//!     },
//!     3,
//! );
//! let genome = WeightGenome::random(&environment, 5);
//!
//! let population = Population::new(
//!     PopulationSettings {
//!         size: NonZeroUsize::new(40).unwrap(),
//!         seed: Some(3),
//!         ..PopulationSettings::default()
//!     },
//!     environment,
//!     evaluate,
//! )
//! .unwrap();
//!
//! let first = evaluate(&genome);
//! let champion = population.evolve(genome, |_, generation| generation == 10).unwrap();
//! assert!(champion.fitness >= first);
//! ```

mod genomics;

pub use genomics::*;
