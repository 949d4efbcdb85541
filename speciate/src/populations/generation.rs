use crate::{Error, Genome, Result};

use ahash::RandomState;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::HashMap;
use std::fmt;

/// Identifier of a member within a generation.
///
/// Drawn from the population's random source, so seeded
/// runs produce the same ids. Only meaningful for the
/// lifetime of the generation holding the member (and the
/// next one, for carried-over elites).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenomeId(Uuid);

impl GenomeId {
    /// Returns a new random (version 4) id.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> GenomeId {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        GenomeId(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A genome together with its last evaluated fitness.
#[derive(Clone, Debug)]
pub struct Member<G> {
    pub genome: G,
    pub fitness: f32,
}

impl<G> Member<G> {
    /// Wraps an unevaluated genome.
    pub fn new(genome: G) -> Member<G> {
        Member {
            genome,
            fitness: 0.0,
        }
    }
}

/// One generation of a population: the single owner
/// of every member genome, keyed by id. Species and
/// selectors refer to members through their ids only.
#[derive(Clone, Debug)]
pub struct Generation<G> {
    index: usize,
    members: HashMap<GenomeId, Member<G>, RandomState>,
}

/// A child yet to be produced: its id, the parents,
/// and the seed of its private random source.
struct Mating {
    child: GenomeId,
    parents: (GenomeId, GenomeId),
    seed: u64,
}

impl<G: Genome> Generation<G> {
    /// Creates a generation from already identified genomes.
    pub fn from_genomes(
        index: usize,
        genomes: impl IntoIterator<Item = (GenomeId, G)>,
    ) -> Generation<G> {
        Generation {
            index,
            members: genomes
                .into_iter()
                .map(|(id, genome)| (id, Member::new(genome)))
                .collect(),
        }
    }

    /// Creates the first generation of a run: the seed genome
    /// itself plus `size - 1` children of the seed crossed
    /// with itself, produced in parallel.
    pub fn seed(
        genome: G,
        size: usize,
        environment: &G::Environment,
        rate: f32,
        rng: &mut StdRng,
    ) -> Result<Generation<G>> {
        let jobs: Vec<(GenomeId, u64)> = (1..size)
            .map(|_| (GenomeId::random(rng), rng.gen()))
            .collect();
        let children = jobs
            .into_par_iter()
            .map(|(id, seed)| {
                let mut child_rng = StdRng::seed_from_u64(seed);
                genome
                    .crossover(&genome, environment, rate, &mut child_rng)
                    .map(|child| (id, child))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut founder = genome;
        founder.reset();
        Ok(Generation::from_genomes(
            0,
            std::iter::once((GenomeId::random(rng), founder)).chain(children),
        ))
    }

    /// Evaluates the fitness of every member in parallel.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFitness`] if the evaluator
    /// returns a negative or non-finite value. No fitness is
    /// updated in that case. Panics inside the evaluator
    /// propagate to the caller.
    pub fn evaluate<F>(&mut self, evaluator: &F) -> Result<()>
    where
        F: Fn(&G) -> f32 + Sync,
    {
        let members: Vec<(&GenomeId, &Member<G>)> = self.members.iter().collect();
        let fitnesses: Vec<(GenomeId, f32)> = members
            .par_iter()
            .map(|(id, member)| (**id, evaluator(&member.genome)))
            .collect();

        if let Some((genome, fitness)) = fitnesses
            .iter()
            .copied()
            .find(|(_, f)| !(f.is_finite() && *f >= 0.0))
        {
            return Err(Error::InvalidFitness { genome, fitness });
        }
        for (id, fitness) in fitnesses {
            if let Some(member) = self.members.get_mut(&id) {
                member.fitness = fitness;
            }
        }
        Ok(())
    }

    /// Produces the next generation.
    ///
    /// `elites` are carried over unchanged (besides a
    /// [`reset`]) with their ids; each parent pair yields one
    /// child. The fitter parent is the crossover receiver, or
    /// the first of the pair on a tie. Children are produced
    /// in parallel, each with a private random source seeded
    /// from `rng`, so the result does not depend on scheduling.
    ///
    /// # Errors
    /// Fails if any parent or elite id is unknown, or if any
    /// crossover fails; no partial generation is returned.
    ///
    /// [`reset`]: crate::Genome::reset
    pub fn reproduce(
        &self,
        elites: &[GenomeId],
        parents: &[(GenomeId, GenomeId)],
        environment: &G::Environment,
        rate: f32,
        rng: &mut StdRng,
    ) -> Result<Generation<G>> {
        let matings: Vec<Mating> = parents
            .iter()
            .map(|&parents| Mating {
                child: GenomeId::random(rng),
                parents,
                seed: rng.gen(),
            })
            .collect();

        let children = matings
            .into_par_iter()
            .map(|mating| {
                let (first, second) = mating.parents;
                let (first, second) = (self.member(first)?, self.member(second)?);
                let (receiver, donor) = if second.fitness > first.fitness {
                    (second, first)
                } else {
                    (first, second)
                };
                let mut child_rng = StdRng::seed_from_u64(mating.seed);
                receiver
                    .genome
                    .crossover(&donor.genome, environment, rate, &mut child_rng)
                    .map(|child| (mating.child, child))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut carried = Vec::with_capacity(elites.len());
        for &id in elites {
            let mut genome = self.member(id)?.genome.clone();
            genome.reset();
            carried.push((id, genome));
        }

        Ok(Generation::from_genomes(
            self.index + 1,
            carried.into_iter().chain(children),
        ))
    }

    fn member(&self, id: GenomeId) -> Result<&Member<G>> {
        self.members.get(&id).ok_or_else(|| {
            Error::genome(format!(
                "genome {} is not a member of generation {}",
                id, self.index
            ))
        })
    }
}

impl<G> Generation<G> {
    /// Returns the generation's number, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the generation has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the member with the specified id.
    pub fn get(&self, id: &GenomeId) -> Option<&Member<G>> {
        self.members.get(id)
    }

    /// Returns all member ids in ascending order.
    pub fn ids(&self) -> Vec<GenomeId> {
        let mut ids: Vec<GenomeId> = self.members.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns an iterator over all members.
    ///
    /// # Notes
    /// No ordering is guaranteed.
    pub fn members(&self) -> impl Iterator<Item = (&GenomeId, &Member<G>)> {
        self.members.iter()
    }

    /// Returns the currently best-performing member,
    /// preferring the lowest id on ties.
    pub fn champion(&self) -> Option<(GenomeId, &Member<G>)> {
        self.members
            .iter()
            .max_by(|(id1, m1), (id2, m2)| {
                m1.fitness
                    .total_cmp(&m2.fitness)
                    .then_with(|| id2.cmp(id1))
            })
            .map(|(id, member)| (*id, member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_genome::Scalar;

    fn generation(values: &[f64], rng: &mut StdRng) -> Generation<Scalar> {
        Generation::from_genomes(
            0,
            values
                .iter()
                .map(|v| (GenomeId::random(rng), Scalar::new(*v)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn random_ids_are_reproducible() {
        let a = GenomeId::random(&mut StdRng::seed_from_u64(5));
        let b = GenomeId::random(&mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn evaluate_sets_every_fitness() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut g = generation(&[1.0, 2.0, 3.0], &mut rng);
        g.evaluate(&|s: &Scalar| s.value() as f32 * 2.0).unwrap();
        let mut fitnesses: Vec<f32> = g.members().map(|(_, m)| m.fitness).collect();
        fitnesses.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(fitnesses, vec![2.0, 4.0, 6.0]);
        let (_, champion) = g.champion().unwrap();
        assert_eq!(champion.genome.value(), 3.0);
    }

    #[test]
    fn invalid_fitness_aborts_evaluation() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut g = generation(&[1.0, -2.0], &mut rng);
        let result = g.evaluate(&|s: &Scalar| s.value() as f32);
        assert!(matches!(result, Err(Error::InvalidFitness { fitness, .. }) if fitness == -2.0));
        assert!(g.members().all(|(_, m)| m.fitness == 0.0));
        assert!(g.evaluate(&|_: &Scalar| f32::NAN).is_err());
    }

    #[test]
    fn seed_fills_generation() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = Generation::seed(Scalar::new(1.0), 10, &(), 0.5, &mut rng).unwrap();
        assert_eq!(g.len(), 10);
        assert_eq!(g.index(), 0);
        assert_eq!(g.ids().len(), 10);
    }

    #[test]
    fn reproduce_keeps_elites_and_fills_children() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut g = generation(&[1.0, 4.0, 9.0], &mut rng);
        g.evaluate(&|s: &Scalar| s.value() as f32).unwrap();
        let (best, _) = g.champion().unwrap();
        let ids = g.ids();
        let parents = vec![(ids[0], ids[1]), (ids[1], ids[2]), (ids[2], ids[2])];

        let next = g.reproduce(&[best], &parents, &(), 1.0, &mut rng).unwrap();

        assert_eq!(next.len(), 4);
        assert_eq!(next.index(), 1);
        let elite = next.get(&best).unwrap();
        assert_eq!(elite.genome.value(), 9.0);
        assert_eq!(elite.fitness, 0.0);
        assert!(!elite.genome.has_transient_state());
    }

    #[test]
    fn fitter_parent_receives_crossover() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut g = generation(&[1.0, 5.0], &mut rng);
        g.evaluate(&|s: &Scalar| s.value() as f32).unwrap();
        let ids = g.ids();
        let (low, high) = if g.get(&ids[0]).unwrap().genome.value() < 5.0 {
            (ids[0], ids[1])
        } else {
            (ids[1], ids[0])
        };
        // A crossover rate of 0 makes the child a copy of its receiver.
        let next = g.reproduce(&[], &[(low, high)], &(), 0.0, &mut rng).unwrap();
        let (_, child) = next.members().next().unwrap();
        assert_eq!(child.genome.value(), 5.0);
    }

    #[test]
    fn unknown_parents_fail_reproduction() {
        let mut rng = StdRng::seed_from_u64(4);
        let g = generation(&[1.0], &mut rng);
        let stranger = GenomeId::random(&mut rng);
        assert!(g
            .reproduce(&[], &[(stranger, stranger)], &(), 0.5, &mut rng)
            .is_err());
        assert!(g.reproduce(&[stranger], &[], &(), 0.5, &mut rng).is_err());
    }

    #[test]
    fn failing_crossover_aborts_reproduction() {
        let mut rng = StdRng::seed_from_u64(4);
        let g = generation(&[1.0, f64::INFINITY], &mut rng);
        let ids = g.ids();
        assert!(g
            .reproduce(&[], &[(ids[0], ids[1])], &(), 0.5, &mut rng)
            .is_err());
    }
}
