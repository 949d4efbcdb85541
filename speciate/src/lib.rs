//! A genome-agnostic population engine for NEAT-style neuroevolution,
//! following the speciation scheme of the 2002 paper:
//! <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! The engine groups genomes into species by genetic distance, shares
//! fitness within species to protect new structure, steers the number of
//! species with a moving compatibility threshold, prunes stagnant
//! lineages, and breeds each generation from fitness-proportionate
//! parents. What a genome actually _is_ is left to implementors of the
//! [`Genome`] trait; a simple innovation-keyed weight genome is supplied
//! by the `speciate-weights` crate.
//!
//! Fitness evaluation, speciation distances and crossovers run in
//! parallel on the `rayon` thread pool. Seeded runs are reproducible
//! regardless of scheduling.
//!
//! # Example usage: matching a target weight vector, using `speciate-weights`
//! ```
//! use speciate::{Population, PopulationSettings};
//! use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
//! use serde_json;
//! use std::num::NonZeroUsize;
//!
//! const TARGET: [f64; 4] = [0.5, -1.0, 2.0, 0.0];
//!
//! fn evaluate(genome: &WeightGenome) -> f32 {
//!     let error: f64 = genome
//!         .weights()
//!         .zip(TARGET.iter())
//!         .map(|((_, w), t)| (w - t).powi(2))
//!         .sum();
//!     (1.0 / (1.0 + error)) as f32
//! }
//!
//! fn main() {
//!     let environment = WeightEnvironment::new(WeightConfig {
//!         weight_bound: 3.0,
//!         weight_mutation_chance: 0.8,
//!         weight_perturbation: 0.5,
//!         ..WeightConfig::default()
//!     });
//!     let genome = WeightGenome::new(&environment, TARGET.len());
//!
//!     let settings = PopulationSettings {
//!         size: NonZeroUsize::new(50).unwrap(),
//!         compatibility_distance: 1.0,
//!         species_target: 5,
//!         seed: Some(42),
//!         ..PopulationSettings::default()
//!     };
//!
//!     let population = Population::new(settings, environment, evaluate).unwrap();
//!     match population.evolve(genome, |best, generation| best.fitness > 0.95 || generation == 30) {
//!         Ok(champion) => println!(
//!             "Best genome: {}",
//!             serde_json::to_string(&champion.genome).unwrap()
//!         ),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

pub mod distance;
mod errors;
mod genome;
mod innovation;
pub mod populations;

#[cfg(test)]
mod test_genome;

pub use errors::{Error, GenomeError, Result};
pub use genome::Genome;
pub use innovation::{Innovation, InnovationContext};
pub use populations::*;
