use super::compatibility::CompatibilityManager;
use super::generation::{Generation, GenomeId};
use super::logging::NicheReport;
use super::selection::SurvivorSelector;
use super::species::{Species, SpeciesId, SpeciesMember};
use super::stagnation::StagnationControl;
use super::PopulationSettings;
use crate::distance::{DistanceCache, DistanceControl};
use crate::{Genome, Result};

use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use std::cmp::Ordering;

/// Owns the set of active species and carries them
/// across generations: assigns members to species,
/// shares fitness, prunes stagnant species, and
/// drives the compatibility threshold.
#[derive(Debug)]
pub struct SpeciesManager<G> {
    species: Vec<Species<G>>,
    cache: DistanceCache,
    compatibility: CompatibilityManager,
    stagnation: StagnationControl,
    distance: DistanceControl,
    // (generation, species born in it so far)
    births: (usize, usize),
}

impl<G: Genome> SpeciesManager<G> {
    /// Creates a manager with no species.
    pub fn new(settings: &PopulationSettings) -> SpeciesManager<G> {
        SpeciesManager {
            species: vec![],
            cache: DistanceCache::new(),
            compatibility: CompatibilityManager::new(settings.compatibility_control()),
            stagnation: settings.stagnation_control(),
            distance: settings.distance,
            births: (0, 0),
        }
    }

    /// Reassigns every member of `generation` to a species.
    ///
    /// Members are visited in id order. Each joins the species
    /// whose mascot is closest, provided that distance is below
    /// the compatibility threshold (ties go to the oldest
    /// species); otherwise it founds a new species as its mascot.
    /// Species left without members are dropped, and the rest
    /// age by one generation.
    ///
    /// # Errors
    /// Fails if any distance computation fails, in which case
    /// the species assignment is left incomplete and the
    /// generation cycle must be abandoned.
    pub fn assign_species(&mut self, generation: &Generation<G>) -> Result<()> {
        self.cache.clear();
        for species in &mut self.species {
            species.clear_members();
        }
        let existing = self.species.len();
        let threshold = self.compatibility.threshold();

        for id in generation.ids() {
            let member = match generation.get(&id) {
                Some(member) => member,
                None => continue,
            };
            let cache = &self.cache;
            let control = &self.distance;
            let closest = self
                .species
                .par_iter()
                .enumerate()
                .map(|(i, species)| {
                    cache
                        .distance(
                            (id, &member.genome),
                            (species.mascot().genome_id, species.mascot_genome()),
                            control,
                        )
                        .map(|d| (i, d))
                })
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .filter(|(_, d)| *d < threshold)
                .min_by(|(i1, d1), (i2, d2)| {
                    d1.partial_cmp(d2)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| i1.cmp(i2))
                });

            let entry = SpeciesMember::new(id, member.fitness);
            match closest {
                Some((i, _)) => self.species[i].add_member(entry),
                None => {
                    let species_id = self.next_species_id(generation.index());
                    debug!(species = %species_id, founder = %id, "new species");
                    self.species.push(Species::new(
                        species_id,
                        entry,
                        member.genome.clone(),
                        self.stagnation,
                    ));
                }
            }
        }

        let mut index = 0;
        self.species.retain_mut(|species| {
            let old = index < existing;
            index += 1;
            if species.is_empty() {
                debug!(species = %species.id(), "species went extinct");
                return false;
            }
            if old {
                species.grow_older();
            }
            true
        });
        debug!(
            members = generation.len(),
            species = self.species.len(),
            created = self.species.len().saturating_sub(existing),
            cached = self.cache.len(),
            "speciation complete"
        );
        Ok(())
    }

    fn next_species_id(&mut self, generation: usize) -> SpeciesId {
        if self.births.0 != generation {
            self.births = (generation, 0);
        }
        let id = SpeciesId(generation, self.births.1);
        self.births.1 += 1;
        id
    }

    /// Applies explicit fitness sharing within every
    /// species and updates each species' stagnation record.
    /// Returns the total adjusted fitness of the population.
    pub fn adjust_fitness(&mut self) -> f64 {
        self.species
            .iter_mut()
            .map(|species| {
                let total = species.share_fitness();
                if species.update_stagnation() {
                    debug!(
                        species = %species.id(),
                        generations = species.time_stagnated(),
                        "species stagnated"
                    );
                }
                total
            })
            .sum()
    }

    /// Culls every species down to its top `fraction` of
    /// members and re-shares their fitness. Returns the ids
    /// of all culled members.
    pub fn clean(&mut self, fraction: f32) -> Vec<GenomeId> {
        let culled: Vec<GenomeId> = self
            .species
            .iter_mut()
            .flat_map(|species| {
                let culled = species.cull(fraction);
                species.share_fitness();
                culled
            })
            .collect();
        debug!(culled = culled.len(), "population cleaned");
        culled
    }

    /// Removes stagnant species, updates the compatibility
    /// threshold with the resulting species count, and returns
    /// the best member of every surviving species.
    ///
    /// If every species is stagnant, the one with the highest
    /// best fitness (the oldest one, on ties) is kept, so the
    /// population never goes extinct.
    pub fn survivors(&mut self) -> Vec<GenomeId> {
        if !self.species.is_empty() && self.species.iter().all(Species::is_stagnant) {
            let keep = self
                .species
                .iter()
                .enumerate()
                .max_by(|(i1, s1), (i2, s2)| {
                    s1.max_fitness()
                        .total_cmp(&s2.max_fitness())
                        .then_with(|| i2.cmp(i1))
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            warn!(
                species = self.species.len(),
                kept = %self.species[keep].id(),
                "every species is stagnant, keeping the best one"
            );
            let kept = self.species.swap_remove(keep);
            self.species = vec![kept];
        } else {
            self.species.retain(|species| {
                if species.is_stagnant() {
                    debug!(species = %species.id(), "removing stagnant species");
                }
                !species.is_stagnant()
            });
        }

        self.compatibility.update(self.species.len());
        SurvivorSelector::select(&self.species)
    }

    /// Replaces every species' mascot with one of its
    /// current members, chosen at random.
    pub fn rotate_mascots<R: Rng + ?Sized>(&mut self, generation: &Generation<G>, rng: &mut R) {
        for species in &mut self.species {
            species.rotate_mascot(generation, rng);
        }
    }
}

impl<G> SpeciesManager<G> {
    /// Returns the active species, oldest first.
    pub fn species(&self) -> &[Species<G>] {
        &self.species
    }

    /// Returns the current compatibility threshold.
    pub fn threshold(&self) -> f64 {
        self.compatibility.threshold()
    }

    /// Returns the distance cache, for instrumentation.
    pub fn cache(&self) -> &DistanceCache {
        &self.cache
    }
}

impl<G: Genome> SpeciesManager<G> {
    /// Returns a snapshot of every active species.
    pub fn reports(&self) -> Vec<NicheReport> {
        self.species.iter().map(Species::report).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_genome::Scalar;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::num::NonZeroUsize;

    fn settings(threshold: f64) -> PopulationSettings {
        PopulationSettings {
            compatibility_distance: threshold,
            stagnation_limit: NonZeroUsize::new(2).unwrap(),
            stagnation_tolerance: 1e-6,
            ..PopulationSettings::zero()
        }
    }

    fn generation(values: &[f64], rng: &mut StdRng) -> Generation<Scalar> {
        let mut g = Generation::from_genomes(
            0,
            values
                .iter()
                .map(|v| (GenomeId::random(rng), Scalar::new(*v)))
                .collect::<Vec<_>>(),
        );
        g.evaluate(&|s: &Scalar| s.value() as f32).unwrap();
        g
    }

    fn sizes(manager: &SpeciesManager<Scalar>) -> Vec<usize> {
        let mut sizes: Vec<usize> = manager.species().iter().map(Species::len).collect();
        sizes.sort_unstable();
        sizes
    }

    #[test]
    fn close_genomes_share_a_species() {
        let mut rng = StdRng::seed_from_u64(0);
        let g = generation(&[0.0, 2.0, 2.0, 2.0], &mut rng);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager.assign_species(&g).unwrap();
        assert_eq!(sizes(&manager), vec![1, 3]);
    }

    #[test]
    fn distant_genomes_found_their_own_species() {
        let mut rng = StdRng::seed_from_u64(0);
        let g = generation(&[0.0, 2.0, 4.0, 6.0], &mut rng);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager.assign_species(&g).unwrap();
        assert_eq!(sizes(&manager), vec![1, 1, 1, 1]);
        let mut ids: Vec<SpeciesId> = manager.species().iter().map(Species::id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn every_member_is_assigned_exactly_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let values: Vec<f64> = (0..40).map(|i| (i % 7) as f64 * 0.8).collect();
        let g = generation(&values, &mut rng);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager.assign_species(&g).unwrap();
        let mut assigned: Vec<GenomeId> = manager
            .species()
            .iter()
            .flat_map(|s| s.members().map(|m| m.genome_id))
            .collect();
        assigned.sort_unstable();
        assert_eq!(assigned, g.ids());
    }

    #[test]
    fn members_join_the_closest_mascot() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut manager = SpeciesManager::new(&settings(1.5));
        manager
            .assign_species(&generation(&[0.0, 2.0], &mut rng))
            .unwrap();
        assert_eq!(manager.species().len(), 2);

        // 1.2 is within the threshold of both mascots, but closer to 2.0.
        let next = generation(&[1.2, 0.1, 2.1], &mut rng);
        manager.assign_species(&next).unwrap();
        let species = manager
            .species()
            .iter()
            .find(|s| s.mascot_genome().value() == 2.0)
            .unwrap();
        assert_eq!(species.len(), 2);
        assert!(manager.species().iter().all(|s| s.age() == 1));
    }

    #[test]
    fn each_pair_is_compared_at_most_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let g = generation(&[0.0, 0.5, 5.0, 5.5], &mut rng);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager.assign_species(&g).unwrap();
        let computed = manager.cache().computations();
        assert!(computed <= 6);
        assert!(manager.cache().len() >= 2);
    }

    #[test]
    fn empty_species_are_dropped() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager
            .assign_species(&generation(&[0.0, 10.0], &mut rng))
            .unwrap();
        manager
            .assign_species(&generation(&[0.2, 0.3], &mut rng))
            .unwrap();
        assert_eq!(manager.species().len(), 1);
        assert_eq!(manager.species()[0].len(), 2);
    }

    #[test]
    fn survivors_are_species_champions() {
        let mut rng = StdRng::seed_from_u64(5);
        let values = [0.1, 0.9, 0.3, 0.5, 0.2, 5.1, 5.7, 5.3, 5.0, 5.2];
        let g = generation(&values, &mut rng);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager.assign_species(&g).unwrap();
        manager.adjust_fitness();

        let survivors = manager.survivors();

        let mut champions: Vec<f64> = survivors
            .iter()
            .map(|id| g.get(id).unwrap().genome.value())
            .collect();
        champions.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(champions, vec![0.9, 5.7]);
    }

    #[test]
    fn stagnant_species_are_removed_but_not_the_last() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut manager = SpeciesManager::new(&settings(1.0));
        let values = [1.0, 5.0];
        for _ in 0..3 {
            manager
                .assign_species(&generation(&values, &mut rng))
                .unwrap();
            manager.adjust_fitness();
        }
        assert!(manager.species().iter().all(Species::is_stagnant));
        let survivors = manager.survivors();
        assert_eq!(survivors.len(), 1);
        assert_eq!(manager.species().len(), 1);
        assert_eq!(manager.species()[0].max_fitness(), 5.0);
    }

    #[test]
    fn clean_culls_every_species() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = [0.1, 0.2, 0.3, 0.4, 5.0, 5.1];
        let g = generation(&values, &mut rng);
        let mut manager = SpeciesManager::new(&settings(1.0));
        manager.assign_species(&g).unwrap();
        manager.adjust_fitness();
        let culled = manager.clean(0.5);
        assert_eq!(culled.len(), 3);
        assert_eq!(sizes(&manager), vec![1, 2]);
    }

    #[test]
    fn dynamic_threshold_moves_with_survivors() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut manager = SpeciesManager::new(&PopulationSettings {
            dynamic_threshold: true,
            species_target: 4,
            threshold_step: 0.25,
            ..settings(1.0)
        });
        manager
            .assign_species(&generation(&[0.0, 0.1], &mut rng))
            .unwrap();
        manager.adjust_fitness();
        manager.survivors();
        assert_eq!(manager.threshold(), 0.75);
    }
}
