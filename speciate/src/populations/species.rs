use super::generation::{Generation, GenomeId};
use super::logging::NicheReport;
use super::stagnation::{StagnationControl, StagnationManager};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub usize, pub usize);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

/// A reference to a generation member held by a species:
/// the member's id and its fitness, raw and shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesMember {
    pub genome_id: GenomeId,
    pub fitness: f32,
    pub adjusted_fitness: f64,
}

impl SpeciesMember {
    /// Creates a member reference whose shared fitness
    /// starts out equal to its raw fitness.
    pub fn new(genome_id: GenomeId, fitness: f32) -> SpeciesMember {
        SpeciesMember {
            genome_id,
            fitness,
            adjusted_fitness: fitness as f64,
        }
    }
}

/// Species are collections of reproductively
/// compatible (within a certain genetic distance)
/// genomes. Membership is determined by calculating
/// the genetic distance to a _mascot_, a member
/// chosen at random each generation.
///
/// The species keeps its own copy of the mascot's genome,
/// as the generation owning the member is replaced
/// before the next round of speciation.
///
/// Species stagnate after [`stagnation_limit`]
/// generations without improving their best fitness,
/// and are thereafter removed from the population.
///
/// [`stagnation_limit`]: crate::PopulationSettings::stagnation_limit
#[derive(Debug, Clone)]
pub struct Species<G> {
    id: SpeciesId,
    mascot: SpeciesMember,
    mascot_genome: G,
    pub(super) members: Vec<SpeciesMember>,
    adjusted_fitness: f64,
    age: usize,
    stagnation: StagnationManager,
}

impl<G: Clone> Species<G> {
    /// Creates a new species with the specified ID and
    /// founder. The founder is both the mascot and the
    /// species' first member.
    pub fn new(
        id: SpeciesId,
        founder: SpeciesMember,
        genome: G,
        control: StagnationControl,
    ) -> Species<G> {
        Species {
            id,
            mascot: founder,
            mascot_genome: genome,
            members: vec![founder],
            adjusted_fitness: 0.0,
            age: 0,
            stagnation: StagnationManager::new(control),
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    /// Returns the species' mascot.
    pub fn mascot(&self) -> &SpeciesMember {
        &self.mascot
    }

    /// Returns the species' copy of the mascot's genome.
    pub fn mascot_genome(&self) -> &G {
        &self.mascot_genome
    }

    /// Adds a member to the species.
    pub fn add_member(&mut self, member: SpeciesMember) {
        self.members.push(member);
    }

    /// Returns an iterator over the species' members.
    pub fn members(&self) -> impl Iterator<Item = &SpeciesMember> {
        self.members.iter()
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the number of generations the species
    /// has survived.
    pub fn age(&self) -> usize {
        self.age
    }

    /// Returns the sum of the members' shared fitness,
    /// as of the last fitness adjustment.
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Returns the highest raw fitness among the members.
    pub fn max_fitness(&self) -> f32 {
        self.members
            .iter()
            .map(|m| m.fitness)
            .fold(0.0, f32::max)
    }

    /// Returns the number of generations the species
    /// has been stagnated.
    pub fn time_stagnated(&self) -> usize {
        self.stagnation.count()
    }

    /// Returns whether the species has reached
    /// the stagnation limit.
    pub fn is_stagnant(&self) -> bool {
        self.stagnation.is_stagnant()
    }

    /// Returns the currently best-performing member,
    /// preferring the lowest genome id on ties.
    pub fn champion(&self) -> Option<&SpeciesMember> {
        self.members.iter().max_by(|m1, m2| {
            m1.fitness
                .total_cmp(&m2.fitness)
                .then_with(|| m2.genome_id.cmp(&m1.genome_id))
        })
    }

    /// Returns a snapshot of the species' state.
    pub fn report(&self) -> NicheReport {
        let (min, max) = self
            .members
            .iter()
            .map(|m| m.fitness)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), f| {
                (lo.min(f), hi.max(f))
            });
        NicheReport {
            species: self.id,
            mascot: self.mascot.genome_id,
            age: self.age,
            adjusted_fitness: self.adjusted_fitness,
            min_fitness: if self.members.is_empty() { 0.0 } else { min },
            max_fitness: if self.members.is_empty() { 0.0 } else { max },
            stagnation: self.stagnation.count(),
            members: self.members.len(),
        }
    }

    /// Forgets all members, keeping the mascot.
    pub(super) fn clear_members(&mut self) {
        self.members.clear();
    }

    pub(super) fn grow_older(&mut self) {
        self.age += 1;
    }

    /// Explicit fitness sharing: each member's adjusted
    /// fitness is its raw fitness divided by the species'
    /// size. Returns the species total.
    pub(super) fn share_fitness(&mut self) -> f64 {
        let size = self.members.len() as f64;
        for member in &mut self.members {
            member.adjusted_fitness = member.fitness as f64 / size;
        }
        self.adjusted_fitness = self.members.iter().map(|m| m.adjusted_fitness).sum();
        self.adjusted_fitness
    }

    /// Feeds the species' best raw fitness into its
    /// stagnation record. Returns whether it is now stagnant.
    pub(super) fn update_stagnation(&mut self) -> bool {
        let best = self.max_fitness() as f64;
        self.stagnation.update(best)
    }

    /// Keeps only the top `fraction` of members by fitness
    /// (at least one) and returns the ids of those removed.
    pub(super) fn cull(&mut self, fraction: f32) -> Vec<GenomeId> {
        self.members.sort_unstable_by(|m1, m2| {
            m2.fitness
                .total_cmp(&m1.fitness)
                .then_with(|| m1.genome_id.cmp(&m2.genome_id))
        });
        let keep = ((self.members.len() as f32 * fraction).ceil() as usize).max(1);
        if keep >= self.members.len() {
            return vec![];
        }
        self.members
            .split_off(keep)
            .into_iter()
            .map(|m| m.genome_id)
            .collect()
    }

    /// Replaces the mascot with a randomly chosen member,
    /// copying its genome out of `generation`.
    pub(super) fn rotate_mascot<R: Rng + ?Sized>(
        &mut self,
        generation: &Generation<G>,
        rng: &mut R,
    ) {
        if let Some(member) = self.members.choose(rng) {
            if let Some(m) = generation.get(&member.genome_id) {
                self.mascot = *member;
                self.mascot_genome = m.genome.clone();
            }
        }
    }
}
