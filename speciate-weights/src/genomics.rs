mod config;
mod errors;

pub use config::{WeightConfig, WeightEnvironment};
pub use errors::WeightError;

use speciate::distance::{self, DistanceControl};
use speciate::{Error, Genome, Innovation};

use ahash::RandomState;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

/// A genome made of weighted genes, each identified
/// by the innovation number it was created with.
///
/// Genes with the same innovation number in two genomes
/// descend from the same ancestral gene, and are lined up
/// during mating and distance calculation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightGenome {
    genes: HashMap<Innovation, f64, RandomState>,
    #[serde(skip)]
    mutations: usize,
}

impl WeightGenome {
    /// Returns a genome with `genes` new genes, all
    /// with weight 0.
    ///
    /// # Examples
    /// ```
    /// use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
    ///
    /// let environment = WeightEnvironment::new(WeightConfig::zero());
    /// let genome = WeightGenome::new(&environment, 3);
    ///
    /// assert_eq!(genome.len(), 3);
    /// assert!(genome.weights().all(|(_, w)| w == 0.0));
    /// assert_eq!(environment.innovations.peek(), 3);
    /// ```
    pub fn new(environment: &WeightEnvironment, genes: usize) -> WeightGenome {
        WeightGenome {
            genes: (0..genes)
                .map(|_| (environment.innovations.next_innovation(), 0.0))
                .collect(),
            mutations: 0,
        }
    }

    /// Returns a genome with `genes` new genes, with weights
    /// drawn uniformly from ±[`weight_bound`].
    ///
    /// Each weight is drawn from its gene's own random source,
    /// so seeded environments produce the same genome every time.
    ///
    /// [`weight_bound`]: WeightConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
    ///
    /// let config = WeightConfig {
    ///     weight_bound: 2.0,
    ///     ..WeightConfig::zero()
    /// };
    /// let first = WeightGenome::random(&WeightEnvironment::seeded(config.clone(), 9), 4);
    /// let second = WeightGenome::random(&WeightEnvironment::seeded(config, 9), 4);
    ///
    /// assert!(first.weights().all(|(_, w)| w.abs() <= 2.0));
    /// assert!(first.weights().eq(second.weights()));
    /// ```
    pub fn random(environment: &WeightEnvironment, genes: usize) -> WeightGenome {
        WeightGenome {
            genes: (0..genes)
                .map(|_| {
                    let innovation = environment.innovations.next_innovation();
                    let mut rng = environment.innovations.instance_rng(innovation);
                    (innovation, random_weight(&environment.config, &mut rng))
                })
                .collect(),
            mutations: 0,
        }
    }

    /// Returns a genome with the specified weights, assigning
    /// each a new innovation number in order.
    ///
    /// # Errors
    /// Returns an error if `weights` is empty or contains
    /// non-finite values.
    ///
    /// # Examples
    /// ```
    /// use speciate_weights::{WeightConfig, WeightEnvironment, WeightError, WeightGenome};
    ///
    /// let environment = WeightEnvironment::new(WeightConfig::zero());
    ///
    /// let genome = WeightGenome::from_weights(&environment, &[0.5, -1.0]).unwrap();
    /// assert_eq!(genome.weights().collect::<Vec<_>>(), vec![(0, 0.5), (1, -1.0)]);
    ///
    /// assert_eq!(
    ///     WeightGenome::from_weights(&environment, &[]).unwrap_err(),
    ///     WeightError::EmptyGenome
    /// );
    /// ```
    pub fn from_weights(
        environment: &WeightEnvironment,
        weights: &[f64],
    ) -> Result<WeightGenome, WeightError> {
        if weights.is_empty() {
            return Err(WeightError::EmptyGenome);
        }
        let genome = WeightGenome {
            genes: weights
                .iter()
                .map(|w| (environment.innovations.next_innovation(), *w))
                .collect(),
            mutations: 0,
        };
        genome.check()?;
        Ok(genome)
    }

    /// Returns the number of genes in the genome.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns whether the genome has no genes.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Returns the weight of the gene with the
    /// specified innovation number, if present.
    pub fn weight(&self, innovation: Innovation) -> Option<f64> {
        self.genes.get(&innovation).copied()
    }

    /// Returns an iterator over the genome's
    /// `(innovation, weight)` pairs, in innovation order.
    pub fn weights(&self) -> impl Iterator<Item = (Innovation, f64)> + '_ {
        self.innovations()
            .into_iter()
            .map(move |innovation| (innovation, self.genes[&innovation]))
    }

    /// Returns the number of mutations the genome went
    /// through when it was produced. Cleared on [`reset`].
    ///
    /// [`reset`]: speciate::Genome::reset
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Innovation numbers in ascending order. Every random
    /// draw over the genes follows this order, so that
    /// seeded runs are reproducible.
    fn innovations(&self) -> Vec<Innovation> {
        let mut innovations: Vec<Innovation> = self.genes.keys().copied().collect();
        innovations.sort_unstable();
        innovations
    }

    /// Mixes the weights of genes common to both genomes
    /// into `self`. Genes present in only one genome are
    /// left as they are in `self`.
    fn combine(&mut self, other: &WeightGenome, averaging: bool, rate: f32, rng: &mut dyn RngCore) {
        for (innovation, weight) in other.weights() {
            if let Some(own) = self.genes.get_mut(&innovation) {
                if averaging {
                    *own = (*own + weight) / 2.0;
                } else if rng.gen::<f32>() < rate {
                    *own = weight;
                }
            }
        }
    }

    /// Performs all mutations on self.
    fn mutate(&mut self, environment: &WeightEnvironment, rng: &mut dyn RngCore) {
        let config = &environment.config;
        for innovation in self.innovations() {
            if rng.gen::<f32>() >= config.weight_mutation_chance {
                continue;
            }
            let new_weight = if rng.gen::<f32>() < config.weight_reset_chance {
                random_weight(config, rng)
            } else {
                nudge_weight(self.genes[&innovation], config, rng)
            };
            self.genes.insert(innovation, new_weight);
            self.mutations += 1;
        }

        if rng.gen::<f32>() < config.gene_addition_chance {
            let innovation = environment.innovations.next_innovation();
            self.genes.insert(innovation, random_weight(config, rng));
            self.mutations += 1;
        }
        if self.genes.len() > 1 && rng.gen::<f32>() < config.gene_removal_chance {
            if let Some(innovation) = self.innovations().choose(rng) {
                self.genes.remove(innovation);
                self.mutations += 1;
            }
        }
    }

    fn check(&self) -> Result<(), WeightError> {
        match self.weights().find(|(_, w)| !w.is_finite()) {
            Some((innovation, weight)) => Err(WeightError::NonFiniteWeight(innovation, weight)),
            None => Ok(()),
        }
    }
}

impl Genome for WeightGenome {
    type Environment = WeightEnvironment;

    /// Produces a child of `self` and `other`.
    ///
    /// The child inherits every gene of `self`. Genes common
    /// to both parents are either averaged (with chance
    /// [`mate_by_averaging_chance`]) or individually copied from
    /// `other` with chance `rate`. The child is then mutated.
    ///
    /// [`mate_by_averaging_chance`]: WeightConfig::mate_by_averaging_chance
    fn crossover(
        &self,
        other: &WeightGenome,
        environment: &WeightEnvironment,
        rate: f32,
        rng: &mut dyn RngCore,
    ) -> speciate::Result<WeightGenome> {
        self.check().map_err(Error::genome)?;
        other.check().map_err(Error::genome)?;

        let mut child = WeightGenome {
            genes: self.genes.clone(),
            mutations: 0,
        };
        let averaging = rng.gen::<f32>() < environment.config.mate_by_averaging_chance;
        child.combine(other, averaging, rate, rng);
        child.mutate(environment, rng);
        child.check().map_err(Error::genome)?;
        Ok(child)
    }

    fn distance(&self, other: &WeightGenome, control: &DistanceControl) -> speciate::Result<f64> {
        distance::distance(&self.genes, &other.genes, control)
    }

    fn reset(&mut self) {
        self.mutations = 0;
    }
}

/// Returns a random weight. Uses a uniform distribution
/// over the range ±config.weight_bound.
fn random_weight<R: Rng + ?Sized>(config: &WeightConfig, rng: &mut R) -> f64 {
    let bound = config.weight_bound.abs();
    rng.gen_range(-bound..=bound)
}

/// Nudges a weight by a random amount. Uses a uniform
/// distribution over the range ±config.weight_perturbation.
/// If the weight's magnitude would exceed the weight bound,
/// the weight is set to the maximum magnitude with the same
/// sign.
fn nudge_weight<R: Rng + ?Sized>(weight: f64, config: &WeightConfig, rng: &mut R) -> f64 {
    let power = config.weight_perturbation.abs();
    let bound = config.weight_bound.abs();
    (weight + rng.gen_range(-power..=power)).clamp(-bound, bound)
}
