use speciate::logging::Stats;
use speciate::{EvolutionObserver, LoggingObserver, Member, Population, PopulationSettings};
use speciate_weights::{WeightConfig, WeightEnvironment, WeightGenome};

use std::error::Error;
use std::num::NonZeroUsize;
use std::{env, fs};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Everything describing a run: the weights to match,
/// when to stop, and the population and genome settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct Experiment {
    target: Vec<f64>,
    fitness_goal: f32,
    max_generations: usize,
    population: PopulationSettings,
    genome: WeightConfig,
}

impl Default for Experiment {
    fn default() -> Experiment {
        Experiment {
            target: vec![0.5, -1.25, 2.0, 0.0, -0.75],
            fitness_goal: 0.99,
            max_generations: 200,
            population: PopulationSettings {
                size: NonZeroUsize::new(100).unwrap(),
                compatibility_distance: 0.5,
                species_target: 6,
                threshold_step: 0.05,
                ..PopulationSettings::default()
            },
            genome: WeightConfig {
                weight_bound: 3.0,
                weight_mutation_chance: 0.6,
                weight_reset_chance: 0.05,
                weight_perturbation: 0.3,
                mate_by_averaging_chance: 0.4,
                gene_addition_chance: 0.01,
                gene_removal_chance: 0.01,
            },
        }
    }
}

/// Fitness is 1 for an exact match, falling towards 0 as the
/// squared error grows. Missing genes count as zero weights,
/// and extra genes are matched against zero.
fn evaluate(genome: &WeightGenome, target: &[f64]) -> f32 {
    let weights: Vec<f64> = genome.weights().map(|(_, w)| w).collect();
    let error: f64 = (0..weights.len().max(target.len()))
        .map(|i| {
            let w = weights.get(i).copied().unwrap_or(0.0);
            let t = target.get(i).copied().unwrap_or(0.0);
            (w - t).powi(2)
        })
        .sum();
    (1.0 / (1.0 + error)) as f32
}

/// Runs one experiment to completion. Returns the final
/// champion, and the generation the goal was reached in.
fn run<O: EvolutionObserver<WeightGenome>>(
    experiment: &Experiment,
    observer: &mut O,
) -> speciate::Result<(Member<WeightGenome>, Option<usize>)> {
    let environment = match experiment.population.seed {
        Some(seed) => WeightEnvironment::seeded(experiment.genome.clone(), seed),
        None => WeightEnvironment::new(experiment.genome.clone()),
    };
    let genome = WeightGenome::random(&environment, experiment.target.len());
    let target = experiment.target.clone();
    let population = Population::new(
        experiment.population.clone(),
        environment,
        move |g: &WeightGenome| evaluate(g, &target),
    )?;

    let mut solved = None;
    let champion = population.evolve_observed(
        genome,
        |best, generation| {
            if best.fitness >= experiment.fitness_goal {
                solved = Some(generation);
            }
            solved.is_some() || generation + 1 >= experiment.max_generations
        },
        observer,
    )?;
    Ok((champion, solved))
}

fn single_run(experiment: &Experiment) -> Result<(), Box<dyn Error>> {
    let (champion, solved) = run(experiment, &mut LoggingObserver)?;
    match solved {
        Some(generation) => info!(generation, fitness = champion.fitness, "target matched"),
        None => warn!(
            generations = experiment.max_generations,
            fitness = champion.fitness,
            "target not matched"
        ),
    }
    println!("{}", ron::to_string(&champion.genome)?);
    Ok(())
}

fn stress_test(experiment: &Experiment, iterations: usize) -> Result<(), Box<dyn Error>> {
    let solved = (0..iterations)
        .into_par_iter()
        .map(|i| {
            let mut experiment = experiment.clone();
            experiment.population.seed = experiment
                .population
                .seed
                .map(|s| s.wrapping_add(i as u64));
            run(&experiment, &mut ()).map(|(_, solved)| solved)
        })
        .collect::<speciate::Result<Vec<_>>>()?;

    println!(
        "Successful run generation count {:?}, {}% failure rate over {} iterations",
        Stats::from(solved.iter().filter_map(|g| g.map(|g| g as f32))),
        solved.iter().filter(|g| g.is_none()).count() as f32 * 100.0 / iterations as f32,
        iterations
    );
    Ok(())
}

/// Usage: `target-match [EXPERIMENT.ron] [ITERATIONS]`
///
/// Without an experiment file, the built-in default is used.
/// With an iteration count, that many runs are made in
/// parallel and summarized instead of logging a single run.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let experiment: Experiment = match args.next() {
        Some(path) => ron::from_str(&fs::read_to_string(path)?)?,
        None => Experiment::default(),
    };
    experiment.population.validate()?;

    match args.next() {
        Some(iterations) => stress_test(&experiment, iterations.parse()?),
        None => single_run(&experiment),
    }
}
