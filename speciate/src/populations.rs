//! A Population evolves genomes generation by generation.
//! Members of each generation are grouped into species,
//! which protect novel genomes from competing directly
//! with the whole population, and the evaluation
//! function is the source of selective pressure.
mod compatibility;
mod config;
mod generation;
pub mod logging;
mod selection;
mod species;
mod species_manager;
mod stagnation;

pub use compatibility::{CompatibilityControl, CompatibilityManager};
pub use config::PopulationSettings;
pub use generation::{Generation, GenomeId, Member};
pub use logging::{EvolutionLogger, EvolutionObserver, GenerationReport, LoggingObserver, NicheReport};
pub use selection::{ParentSelector, SurvivorSelector};
pub use species::{Species, SpeciesId, SpeciesMember};
pub use species_manager::SpeciesManager;
pub use stagnation::{StagnationControl, StagnationManager};

use crate::{Error, Genome, Result};
use logging::Stats;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// A population of genomes, together with
/// everything needed to evolve it: the settings,
/// the genomes' environment, and the fitness function.
///
/// The fitness function is called concurrently from
/// several threads, and must return finite,
/// non-negative values.
pub struct Population<G: Genome, F> {
    settings: PopulationSettings,
    environment: G::Environment,
    fitness: F,
}

impl<G, F> Population<G, F>
where
    G: Genome,
    F: Fn(&G) -> f32 + Sync,
{
    /// Creates a new population.
    ///
    /// The type of `environment` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSettings`] if `settings`
    /// fail validation.
    ///
    /// [`Genome`]: crate::Genome
    ///
    /// # Examples
    /// ```
    /// use speciate::{Population, PopulationSettings};
    /// use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
    ///
    /// let population = Population::new(
    ///     PopulationSettings::default(),
    ///     WeightEnvironment::new(WeightConfig::default()),
    ///     |g: &WeightGenome| g.weights().map(|(_, w)| w.abs()).sum::<f64>() as f32,
    /// );
    /// assert!(population.is_ok());
    ///
    /// let population = Population::new(
    ///     PopulationSettings {
    ///         clean_pct: 2.0,
    ///         ..PopulationSettings::default()
    ///     },
    ///     WeightEnvironment::new(WeightConfig::default()),
    ///     |_: &WeightGenome| 1.0_f32,
    /// );
    /// assert!(population.is_err());
    /// ```
    pub fn new(
        settings: PopulationSettings,
        environment: G::Environment,
        fitness: F,
    ) -> Result<Population<G, F>> {
        settings.validate()?;
        Ok(Population {
            settings,
            environment,
            fitness,
        })
    }

    /// Returns the population's settings.
    pub fn settings(&self) -> &PopulationSettings {
        &self.settings
    }

    /// Returns the environment shared by all genomes.
    pub fn environment(&self) -> &G::Environment {
        &self.environment
    }

    /// Evolves a population grown out of `genome` until
    /// `run_predicate` is satisfied, and returns the best
    /// member of the final generation.
    ///
    /// The first generation holds `genome` itself plus
    /// enough crossovers of `genome` with itself to fill
    /// the population. Each generation is then evaluated,
    /// speciated and reproduced in turn; `run_predicate`
    /// is given the generation's best member and index
    /// after evaluation, and ends the run by returning `true`.
    ///
    /// Progress is logged through `tracing`; see
    /// [`evolve_observed`] to use other observers.
    ///
    /// # Errors
    /// Evolution stops at the first error: an invalid
    /// fitness value, a failed genome operation, or a
    /// population that has lost every species.
    ///
    /// [`evolve_observed`]: Population::evolve_observed
    ///
    /// # Examples
    /// ```
    /// use speciate::{Population, PopulationSettings};
    /// use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let environment = WeightEnvironment::new(WeightConfig::default());
    /// let genome = WeightGenome::new(&environment, 3);
    ///
    /// // Genomes with weights closer to 0.5 score higher.
    /// let population = Population::new(
    ///     PopulationSettings {
    ///         size: NonZeroUsize::new(30).unwrap(),
    ///         seed: Some(17),
    ///         ..PopulationSettings::default()
    ///     },
    ///     environment,
    ///     |g: &WeightGenome| {
    ///         let error: f64 = g.weights().map(|(_, w)| (w - 0.5).abs()).sum();
    ///         (1.0 / (1.0 + error)) as f32
    ///     },
    /// )
    /// .unwrap();
    ///
    /// let champion = population
    ///     .evolve(genome, |_, generation| generation == 10)
    ///     .unwrap();
    /// assert!(champion.fitness > 0.0);
    /// ```
    pub fn evolve<P>(&self, genome: G, run_predicate: P) -> Result<Member<G>>
    where
        P: FnMut(&Member<G>, usize) -> bool,
    {
        self.evolve_observed(genome, run_predicate, &mut LoggingObserver)
    }

    /// Like [`evolve`], reporting to `observer` instead of
    /// the default logging observer.
    ///
    /// # Examples
    /// ```
    /// use speciate::{EvolutionLogger, LoggingObserver, Population, PopulationSettings};
    /// use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let environment = WeightEnvironment::new(WeightConfig::default());
    /// let genome = WeightGenome::new(&environment, 2);
    /// let population = Population::new(
    ///     PopulationSettings {
    ///         size: NonZeroUsize::new(10).unwrap(),
    ///         ..PopulationSettings::default()
    ///     },
    ///     environment,
    ///     |g: &WeightGenome| g.len() as f32,
    /// )
    /// .unwrap();
    ///
    /// let mut logger = EvolutionLogger::new();
    /// population
    ///     .evolve_observed(
    ///         genome,
    ///         |_, generation| generation == 4,
    ///         &mut (LoggingObserver, &mut logger),
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(logger.iter().count(), 5);
    /// assert!(logger.iter().all(|report| report.member_count == 10));
    /// ```
    ///
    /// [`evolve`]: Population::evolve
    pub fn evolve_observed<P, O>(
        &self,
        genome: G,
        mut run_predicate: P,
        observer: &mut O,
    ) -> Result<Member<G>>
    where
        P: FnMut(&Member<G>, usize) -> bool,
        O: EvolutionObserver<G> + ?Sized,
    {
        let settings = &self.settings;
        let size = settings.size.get();
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let parent_selector = ParentSelector::new(settings.inbreed_rate);
        let mut species = SpeciesManager::new(settings);
        let mut progress = StagnationManager::new(settings.stagnation_control());

        let mut generation = Generation::seed(
            genome,
            size,
            &self.environment,
            settings.crossover_rate,
            &mut rng,
        )?;

        loop {
            let index = generation.index();
            observer.on_generation_start(index);

            generation.evaluate(&self.fitness)?;
            species.assign_species(&generation)?;
            species.adjust_fitness();

            let champion = match generation.champion() {
                Some((_, member)) => member.clone(),
                None => return Err(Error::NoSpecies),
            };
            if progress.update(champion.fitness as f64) {
                let culled = species.clean(settings.clean_pct);
                info!(
                    generation = index,
                    culled = culled.len(),
                    "population stagnated, cleaning every species"
                );
                progress.reset();
            }

            let elites = species.survivors();
            let report = GenerationReport {
                generation: index,
                member_count: generation.len(),
                species_count: species.species().len(),
                top_fitness: champion.fitness,
                compatibility_threshold: species.threshold(),
                fitness: Stats::from(generation.members().map(|(_, m)| m.fitness)),
                niches: species.reports(),
            };
            observer.on_generation_complete(&report);

            if run_predicate(&champion, index) {
                observer.on_training_complete(&champion, index + 1);
                return Ok(champion);
            }

            species.rotate_mascots(&generation, &mut rng);
            let parents = (elites.len()..size)
                .map(|_| parent_selector.select(species.species(), &mut rng))
                .collect::<Result<Vec<_>>>()?;
            generation = generation.reproduce(
                &elites,
                &parents,
                &self.environment,
                settings.crossover_rate,
                &mut rng,
            )?;
        }
    }
}
