use super::generation::GenomeId;
use super::species::{Species, SpeciesMember};
use crate::{Error, Result};

use rand::Rng;

/// Fitness-proportionate parent selection with
/// inbreeding control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentSelector {
    /// Probability of drawing both parents from
    /// the same species.
    pub inbreed_rate: f32,
}

impl ParentSelector {
    /// Creates a selector drawing both parents from the
    /// same species with probability `inbreed_rate`.
    pub fn new(inbreed_rate: f32) -> ParentSelector {
        ParentSelector { inbreed_rate }
    }

    /// Draws a pair of parents from `species`.
    ///
    /// With probability `inbreed_rate`, a single species is
    /// chosen by roulette over the species' adjusted fitness
    /// and both parents are drawn from it by their adjusted
    /// fitness. Otherwise two species are drawn independently
    /// (possibly the same one twice) and one parent is drawn
    /// from each.
    ///
    /// Stagnant species are only eligible when every species
    /// is stagnant.
    ///
    /// # Errors
    /// Returns [`Error::NoSpecies`] if `species` is empty, and
    /// [`Error::EmptySpecies`] if a drawn species has no members.
    pub fn select<G: Clone, R: Rng + ?Sized>(
        &self,
        species: &[Species<G>],
        rng: &mut R,
    ) -> Result<(GenomeId, GenomeId)> {
        let mut candidates: Vec<&Species<G>> =
            species.iter().filter(|s| !s.is_stagnant()).collect();
        if candidates.is_empty() {
            candidates = species.iter().collect();
        }
        let species_weights: Vec<f64> = candidates.iter().map(|s| s.adjusted_fitness()).collect();

        if rng.gen::<f32>() < self.inbreed_rate {
            let chosen = candidates[roulette(&species_weights, rng).ok_or(Error::NoSpecies)?];
            Ok((
                draw_member(chosen, rng)?.genome_id,
                draw_member(chosen, rng)?.genome_id,
            ))
        } else {
            let first = candidates[roulette(&species_weights, rng).ok_or(Error::NoSpecies)?];
            let second = candidates[roulette(&species_weights, rng).ok_or(Error::NoSpecies)?];
            Ok((
                draw_member(first, rng)?.genome_id,
                draw_member(second, rng)?.genome_id,
            ))
        }
    }
}

fn draw_member<'a, G: Clone, R: Rng + ?Sized>(
    species: &'a Species<G>,
    rng: &mut R,
) -> Result<&'a SpeciesMember> {
    let weights: Vec<f64> = species.members.iter().map(|m| m.adjusted_fitness).collect();
    roulette(&weights, rng)
        .map(|i| &species.members[i])
        .ok_or(Error::EmptySpecies(species.id()))
}

/// Fitness-proportionate draw over `weights`. Candidates are
/// visited in order, and the first whose running sum reaches
/// `draw * total` is picked. When every weight is zero the
/// pick is uniform, and a miss due to rounding falls back to
/// the first candidate. Returns `None` only if `weights`
/// is empty.
fn roulette<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return Some(rng.gen_range(0..weights.len()));
    }
    Some(walk(weights, rng.gen::<f64>() * total))
}

/// Index of the first weight whose running sum reaches
/// `target`, or 0 if none does.
fn walk(weights: &[f64], target: f64) -> usize {
    let mut running = 0.0;
    for (i, w) in weights.iter().enumerate() {
        running += w;
        if running >= target {
            return i;
        }
    }
    0
}

/// Elitist survivor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurvivorSelector;

impl SurvivorSelector {
    /// Returns the best member of every non-empty species,
    /// in species order.
    pub fn select<G>(species: &[Species<G>]) -> Vec<GenomeId> {
        species
            .iter()
            .filter_map(|s| {
                s.members.iter().max_by(|m1, m2| {
                    m1.fitness
                        .total_cmp(&m2.fitness)
                        .then_with(|| m2.genome_id.cmp(&m1.genome_id))
                })
            })
            .map(|m| m.genome_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::stagnation::StagnationControl;
    use crate::populations::species::SpeciesId;
    use crate::test_genome::Scalar;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::num::NonZeroUsize;

    const CONTROL: StagnationControl = StagnationControl {
        limit: NonZeroUsize::MIN,
        tolerance: 1e-6,
    };

    fn species(index: usize, fitnesses: &[f32], rng: &mut StdRng) -> Species<Scalar> {
        let mut members = fitnesses
            .iter()
            .map(|f| SpeciesMember::new(GenomeId::random(rng), *f));
        let founder = members.next().unwrap();
        let mut s = Species::new(SpeciesId(0, index), founder, Scalar::new(0.0), CONTROL);
        for m in members {
            s.add_member(m);
        }
        s.share_fitness();
        s
    }

    fn owner(all: &[Species<Scalar>], id: GenomeId) -> SpeciesId {
        all.iter()
            .find(|s| s.members().any(|m| m.genome_id == id))
            .unwrap()
            .id()
    }

    #[test]
    fn full_inbreeding_keeps_parents_together() {
        let mut rng = StdRng::seed_from_u64(0);
        let all = vec![
            species(0, &[0.5, 0.4, 0.3], &mut rng),
            species(1, &[0.6, 0.2, 0.1], &mut rng),
            species(2, &[0.9, 0.8], &mut rng),
        ];
        let selector = ParentSelector::new(1.0);
        for _ in 0..100 {
            let (a, b) = selector.select(&all, &mut rng).unwrap();
            assert_eq!(owner(&all, a), owner(&all, b));
        }
    }

    #[test]
    fn no_inbreeding_mixes_species() {
        let mut rng = StdRng::seed_from_u64(1);
        let all = vec![
            species(0, &[1.0, 1.0], &mut rng),
            species(1, &[1.0, 1.0], &mut rng),
        ];
        let selector = ParentSelector::new(0.0);
        let mixed = (0..200)
            .map(|_| selector.select(&all, &mut rng).unwrap())
            .filter(|(a, b)| owner(&all, *a) != owner(&all, *b))
            .count();
        // Independent draws from two equally fit species
        // land in different species about half the time.
        assert!(mixed > 50 && mixed < 150, "{} mixed pairs", mixed);
    }

    #[test]
    fn fitter_species_are_drawn_more_often() {
        let mut rng = StdRng::seed_from_u64(2);
        let all = vec![
            species(0, &[0.1], &mut rng),
            species(1, &[0.9], &mut rng),
        ];
        let fit = all[1].mascot().genome_id;
        let selector = ParentSelector::new(1.0);
        let hits = (0..1000)
            .filter(|_| selector.select(&all, &mut rng).unwrap().0 == fit)
            .count();
        assert!(hits > 800, "{} hits", hits);
    }

    #[test]
    fn stagnant_species_are_skipped() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut all = vec![
            species(0, &[0.5, 0.5], &mut rng),
            species(1, &[0.5, 0.5], &mut rng),
        ];
        // Limit is one generation: no improvement over the
        // initial best stagnates species 0 immediately.
        all[0].members.iter_mut().for_each(|m| m.fitness = 0.0);
        all[0].update_stagnation();
        all[1].update_stagnation();
        assert!(all[0].is_stagnant());
        assert!(!all[1].is_stagnant());

        let selector = ParentSelector::new(0.5);
        for _ in 0..50 {
            let (a, b) = selector.select(&all, &mut rng).unwrap();
            assert_eq!(owner(&all, a), SpeciesId(0, 1));
            assert_eq!(owner(&all, b), SpeciesId(0, 1));
        }
    }

    #[test]
    fn zero_fitness_is_drawn_uniformly() {
        let mut rng = StdRng::seed_from_u64(4);
        let all = vec![species(0, &[0.0, 0.0, 0.0], &mut rng)];
        let selector = ParentSelector::new(1.0);
        let mut seen: Vec<GenomeId> = (0..100)
            .map(|_| selector.select(&all, &mut rng).unwrap().0)
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn no_species_is_an_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let all: Vec<Species<Scalar>> = vec![];
        assert!(matches!(
            ParentSelector::new(0.5).select(&all, &mut rng),
            Err(Error::NoSpecies)
        ));
    }

    #[test]
    fn empty_species_is_an_error() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut all = vec![species(0, &[1.0], &mut rng)];
        all[0].clear_members();
        assert!(matches!(
            ParentSelector::new(1.0).select(&all, &mut rng),
            Err(Error::EmptySpecies(SpeciesId(0, 0)))
        ));
    }

    #[test]
    fn roulette_handles_degenerate_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(roulette(&[], &mut rng), None);
        for _ in 0..20 {
            assert!(roulette(&[1.0, f64::MIN_POSITIVE], &mut rng).is_some());
        }
        assert_eq!(roulette(&[1.0, 0.0, 0.0], &mut rng), Some(0));
    }

    #[test]
    fn walk_picks_first_reaching_candidate() {
        assert_eq!(walk(&[1.0, 2.0, 3.0], 0.5), 0);
        assert_eq!(walk(&[1.0, 2.0, 3.0], 1.0), 0);
        assert_eq!(walk(&[1.0, 2.0, 3.0], 2.5), 1);
        assert_eq!(walk(&[1.0, 2.0, 3.0], 6.0), 2);
    }

    #[test]
    fn walk_falls_back_to_first_candidate() {
        assert_eq!(walk(&[1.0, 2.0, 3.0], 6.5), 0);
        assert_eq!(walk(&[0.1, 0.2], f64::NAN), 0);
    }

    #[test]
    fn survivors_are_species_champions() {
        let mut rng = StdRng::seed_from_u64(8);
        let all = vec![
            species(0, &[0.1, 0.9, 0.3, 0.5, 0.2], &mut rng),
            species(1, &[0.4, 0.7, 0.6, 0.2, 0.3], &mut rng),
        ];
        let survivors = SurvivorSelector::select(&all);
        let expected: Vec<GenomeId> = all
            .iter()
            .map(|s| s.members().find(|m| m.fitness > 0.65).unwrap().genome_id)
            .collect();
        assert_eq!(survivors, expected);
    }
}
