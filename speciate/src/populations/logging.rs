use super::generation::{GenomeId, Member};
use super::species::SpeciesId;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use std::fmt;

/// A read-only snapshot of one species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NicheReport {
    pub species: SpeciesId,
    pub mascot: GenomeId,
    pub age: usize,
    pub adjusted_fitness: f64,
    pub min_fitness: f32,
    pub max_fitness: f32,
    pub stagnation: usize,
    pub members: usize,
}

/// A read-only snapshot of a completed generation,
/// for external monitoring only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub member_count: usize,
    pub species_count: usize,
    pub top_fitness: f32,
    pub compatibility_threshold: f64,
    pub fitness: Stats,
    pub niches: Vec<NicheReport>,
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Report {{\n\
            \tgeneration: {:?}\n\
            \tmember_count: {:?}\n\
            \tspecies_count: {:?}\n\
            \ttop_fitness: {:?}\n\
            \tcompatibility_threshold: {:?}\n\
            \tfitness: {:?}\n\
            {}\
            }}",
            &self.generation,
            &self.member_count,
            &self.species_count,
            &self.top_fitness,
            &self.compatibility_threshold,
            &self.fitness,
            self.niches
                .iter()
                .map(|n| format!(
                    "\tspecies {}: {} members, age {}, fitness {:.3}..{:.3}, stagnant for {}\n",
                    n.species, n.members, n.age, n.min_fitness, n.max_fitness, n.stagnation
                ))
                .collect::<Vec<_>>()
                .join("")
        )
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// An empty sequence yields all zeroes.
    ///
    /// # Examples
    /// ```
    /// use speciate::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Stats {
        let mut data: Vec<f32> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
            };
        }
        data.sort_unstable_by(|a, b| a.total_cmp(b));
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        }
    }
}

/// Hooks fired by [`Population::evolve`] at the boundaries
/// of each generation. All methods default to doing nothing.
///
/// Observers may log, draw progress bars, or record reports,
/// but have no way of influencing the population.
///
/// [`Population::evolve`]: crate::Population::evolve
pub trait EvolutionObserver<G> {
    /// Called before a generation is evaluated.
    fn on_generation_start(&mut self, _generation: usize) {}

    /// Called once a generation has been evaluated
    /// and speciated.
    fn on_generation_complete(&mut self, _report: &GenerationReport) {}

    /// Called once the termination predicate is satisfied.
    fn on_training_complete(&mut self, _champion: &Member<G>, _generations: usize) {}
}

/// Observes nothing.
impl<G> EvolutionObserver<G> for () {}

impl<G, A, B> EvolutionObserver<G> for (A, B)
where
    A: EvolutionObserver<G>,
    B: EvolutionObserver<G>,
{
    fn on_generation_start(&mut self, generation: usize) {
        self.0.on_generation_start(generation);
        self.1.on_generation_start(generation);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport) {
        self.0.on_generation_complete(report);
        self.1.on_generation_complete(report);
    }

    fn on_training_complete(&mut self, champion: &Member<G>, generations: usize) {
        self.0.on_training_complete(champion, generations);
        self.1.on_training_complete(champion, generations);
    }
}

/// Emits a `tracing` event for every generation.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl<G> EvolutionObserver<G> for LoggingObserver {
    fn on_generation_start(&mut self, generation: usize) {
        debug!(generation, "starting generation");
    }

    fn on_generation_complete(&mut self, report: &GenerationReport) {
        info!(
            generation = report.generation,
            members = report.member_count,
            species = report.species_count,
            top_fitness = report.top_fitness,
            mean_fitness = report.fitness.mean,
            threshold = report.compatibility_threshold,
            "generation complete"
        );
        for niche in &report.niches {
            debug!(
                species = %niche.species,
                members = niche.members,
                age = niche.age,
                max_fitness = niche.max_fitness,
                stagnation = niche.stagnation,
                "species"
            );
        }
    }

    fn on_training_complete(&mut self, champion: &Member<G>, generations: usize) {
        info!(generations, fitness = champion.fitness, "training complete");
    }
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug, Default)]
pub struct EvolutionLogger {
    reports: Vec<GenerationReport>,
}

impl EvolutionLogger {
    /// Returns an empty logger.
    pub fn new() -> EvolutionLogger {
        EvolutionLogger::default()
    }

    /// Iterate over all recorded reports.
    pub fn iter(&self) -> impl Iterator<Item = &GenerationReport> {
        self.reports.iter()
    }

    /// Returns the most recent report.
    pub fn last(&self) -> Option<&GenerationReport> {
        self.reports.last()
    }
}

impl<G> EvolutionObserver<G> for EvolutionLogger {
    fn on_generation_complete(&mut self, report: &GenerationReport) {
        self.reports.push(report.clone());
    }
}

impl<G, O: EvolutionObserver<G> + ?Sized> EvolutionObserver<G> for &mut O {
    fn on_generation_start(&mut self, generation: usize) {
        (**self).on_generation_start(generation);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport) {
        (**self).on_generation_complete(report);
    }

    fn on_training_complete(&mut self, champion: &Member<G>, generations: usize) {
        (**self).on_training_complete(champion, generations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_even_sequence() {
        let stats = Stats::from([4.0, 1.0, 3.0, 2.0].iter().copied());
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.maximum, 4.0);
        assert_eq!(stats.minimum, 1.0);
    }

    #[test]
    fn stats_of_nothing() {
        assert_eq!(Stats::from(std::iter::empty()).maximum, 0.0);
    }
}
