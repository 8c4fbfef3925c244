//! Generational search for circuits realizing a set of functions

use crate::block::MAX_INPUTS;
use crate::{ClbError, Evaluator, Fitness, Genome};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, Instant};

/// Parameters of the search
#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    /// Number of genomes in each generation
    pub pop_size: usize,
    /// Number of blocks in each circuit
    pub num_blocks: usize,
    /// Number of inputs of each block
    pub inputs_per_block: usize,
    /// Number of mutated clones tried for each parent
    pub mutations_per_parent: usize,
    /// Number of generations in a pass
    pub max_generations: usize,
    /// Probability of each individual change during a mutation
    pub mutation_chance: f64,
    /// Stop as soon as a circuit without error is found
    pub first_acceptable: bool,
    /// Ask the observer whether to run another pass at the end of each pass
    pub iterative: bool,
    /// Size of the worker pool, defaults to the available parallelism
    pub threads: Option<usize>,
    /// Seed of the random generator, taken from the system if missing
    pub seed: Option<u64>,
}

impl Config {
    pub const DEFAULT_POP_SIZE: usize = 50;
    pub const DEFAULT_GENERATIONS: usize = 500;
    pub const DEFAULT_MUTATIONS_PER_PARENT: usize = 4;
    pub const DEFAULT_MUTATION_CHANCE: f64 = 0.025;

    pub fn new(num_blocks: usize, inputs_per_block: usize) -> Self {
        Self {
            pop_size: Self::DEFAULT_POP_SIZE,
            num_blocks,
            inputs_per_block,
            mutations_per_parent: Self::DEFAULT_MUTATIONS_PER_PARENT,
            max_generations: Self::DEFAULT_GENERATIONS,
            mutation_chance: Self::DEFAULT_MUTATION_CHANCE,
            first_acceptable: false,
            iterative: false,
            threads: None,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), ClbError> {
        let positive = [
            ("population size", self.pop_size),
            ("number of blocks", self.num_blocks),
            ("number of mutations per parent", self.mutations_per_parent),
            ("number of generations", self.max_generations),
        ];
        for (name, value) in positive {
            if value < 1 {
                return Err(ClbError::parameter(name, value, "at least 1"));
            }
        }
        if self.inputs_per_block < 1 || self.inputs_per_block > MAX_INPUTS {
            return Err(ClbError::parameter(
                "inputs per block",
                self.inputs_per_block,
                "between 1 and 16",
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_chance) {
            return Err(ClbError::parameter(
                "mutation chance",
                self.mutation_chance,
                "between 0 and 1",
            ));
        }
        if self.threads == Some(0) {
            return Err(ClbError::parameter("number of threads", 0, "at least 1"));
        }
        Ok(())
    }
}

/// Progress of a search
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Idle,
    /// The first generation is created
    Initialized,
    /// The first generation is evaluated
    Evaluated,
    /// Running a pass of generations
    Iterating,
    /// A pass ended without reaching a stop condition
    Converged,
    Done,
}

/// Summary of a generation
#[derive(Clone, Debug)]
pub struct GenerationReport {
    pub generation: usize,
    pub elapsed: Duration,
    /// Best genome found so far
    pub best: Fitness,
    /// Best genome of this generation
    pub generation_best: Fitness,
    pub average_error: f64,
    pub average_used_blocks: f64,
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Generation: {}, current best: {}, generation best: {}, average: ({}, {}).",
            self.generation,
            self.best,
            self.generation_best,
            self.average_error,
            self.average_used_blocks
        )
    }
}

/// Follow the progress of a search and control its continuation
pub trait Observer {
    /// Called after the evaluation of the first generation and after each new generation
    fn on_generation(&mut self, _report: &GenerationReport) {}

    /// Called at the end of each pass in iterative mode: return true to run another pass
    fn continue_iterating(&mut self) -> bool {
        false
    }
}

/// Send the generation reports to the log
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_generation(&mut self, report: &GenerationReport) {
        info!("{}", report);
    }
}

/// Evolve a population of random circuits towards the functions of an evaluator.
///
/// Each generation, every parent spawns a fixed number of mutated clones. The best clone
/// replaces its parent if it is better, and one of them is picked randomly if they are
/// equivalent. The fitness of all genomes of a generation is computed in parallel.
///
/// ```
/// use clbmap::{parse_functions, Config, Evaluator, LogObserver, Solver};
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let evaluator = Evaluator::new(parse_functions("f <= A and not B;")?)?;
/// let mut config = Config::new(2, 2);
/// config.pop_size = 10;
/// config.max_generations = 20;
/// config.seed = Some(3);
///
/// let mut solver = Solver::new(config, &evaluator)?;
/// let best = solver.solve(&mut LogObserver)?;
/// assert!(best.fitness().used_blocks <= 2);
/// # Ok(())
/// # }
/// ```
pub struct Solver<'a> {
    config: Config,
    evaluator: &'a Evaluator,
    pool: ThreadPool,
    rng: ChaCha8Rng,
    phase: Phase,
    population: Vec<Genome>,
    best: Option<Genome>,
    generation: usize,
    total_time: Duration,
}

impl<'a> Solver<'a> {
    pub fn new(config: Config, evaluator: &'a Evaluator) -> Result<Self, ClbError> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(0))
            .build()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            config,
            evaluator,
            pool,
            rng,
            phase: Phase::Idle,
            population: vec![],
            best: None,
            generation: 0,
            total_time: Duration::ZERO,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    /// Best genome found so far
    pub fn best(&self) -> Option<&Genome> {
        self.best.as_ref()
    }

    /// Number of evaluated generations
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Time spent searching, excluding the time spent waiting for the observer
    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    /// Run the whole search and return the best genome
    pub fn solve(&mut self, observer: &mut dyn Observer) -> Result<Genome, ClbError> {
        info!(
            "Searching with {} genomes of {} blocks with {} inputs",
            self.config.pop_size, self.config.num_blocks, self.config.inputs_per_block
        );
        let start = Instant::now();
        self.initialize()?;
        self.evaluate_population(observer)?;
        self.total_time += start.elapsed();

        loop {
            match self.phase {
                Phase::Done => break,
                Phase::Converged => {
                    if self.config.iterative && observer.continue_iterating() {
                        self.timed_pass(observer)?;
                    } else {
                        self.phase = Phase::Done;
                    }
                }
                _ => self.timed_pass(observer)?,
            }
        }

        let best = self.best.clone().ok_or(ClbError::EmptyPopulation)?;
        info!(
            "Best fitness {} after {} generations",
            best.fitness(),
            self.generation
        );
        Ok(best)
    }

    fn timed_pass(&mut self, observer: &mut dyn Observer) -> Result<(), ClbError> {
        let start = Instant::now();
        let result = self.run_pass(observer);
        self.total_time += start.elapsed();
        result
    }

    /// Create the first generation of random genomes
    pub fn initialize(&mut self) -> Result<(), ClbError> {
        if self.phase != Phase::Idle {
            return Err(ClbError::InvalidState("the search is already initialized"));
        }
        let shape = self
            .evaluator
            .shape(self.config.num_blocks, self.config.inputs_per_block);
        self.population = (0..self.config.pop_size)
            .map(|_| Genome::random(&shape, &mut self.rng))
            .collect::<Result<Vec<_>, _>>()?;
        self.phase = Phase::Initialized;
        Ok(())
    }

    /// Evaluate the first generation and select the first best genome
    pub fn evaluate_population(&mut self, observer: &mut dyn Observer) -> Result<(), ClbError> {
        if self.phase != Phase::Initialized {
            return Err(ClbError::InvalidState("the first generation is not created"));
        }
        let start = Instant::now();
        let evaluator = self.evaluator;
        let population = std::mem::take(&mut self.population);
        let results: Vec<Result<Genome, ClbError>> = self.pool.install(|| {
            population
                .into_par_iter()
                .map(|mut genome| evaluator.evaluate(&mut genome).map(|_| genome))
                .collect()
        });
        self.population = collect_successes(results)?;

        let generation_best = first_best(&self.population)?.clone();
        self.best = Some(generation_best);
        self.report(observer, start.elapsed())?;

        self.phase = match self.found_acceptable() {
            true => Phase::Done,
            false => Phase::Evaluated,
        };
        Ok(())
    }

    /// Run up to ```max_generations``` generations
    pub fn run_pass(&mut self, observer: &mut dyn Observer) -> Result<(), ClbError> {
        match self.phase {
            Phase::Evaluated | Phase::Converged => (),
            _ => return Err(ClbError::InvalidState("no evaluated generation to iterate on")),
        }
        self.phase = Phase::Iterating;
        for _ in 0..self.config.max_generations {
            self.step(observer)?;
            if self.found_acceptable() {
                self.phase = Phase::Done;
                return Ok(());
            }
        }
        self.phase = Phase::Converged;
        Ok(())
    }

    /// Replace the population with the next generation
    pub fn step(&mut self, observer: &mut dyn Observer) -> Result<(), ClbError> {
        match self.phase {
            Phase::Evaluated | Phase::Iterating | Phase::Converged => (),
            _ => return Err(ClbError::InvalidState("no evaluated generation to iterate on")),
        }
        let start = Instant::now();

        // Draw the seeds serially: the result does not depend on the scheduling of tasks
        let seeds: Vec<u64> = (0..self.population.len())
            .map(|_| self.rng.random())
            .collect();
        let config = &self.config;
        let evaluator = self.evaluator;
        let population = &self.population;
        let results: Vec<Result<Genome, ClbError>> = self.pool.install(|| {
            population
                .par_iter()
                .zip(seeds)
                .map(|(parent, seed)| breed(parent, config, evaluator, seed))
                .collect()
        });
        self.population = collect_successes(results)?;

        let generation_best = first_best(&self.population)?;
        let improved = match &self.best {
            None => true,
            Some(best) => generation_best.compare_better(best) == Ordering::Less,
        };
        if improved {
            debug!("New best genome: {}", generation_best.fitness());
            self.best = Some(generation_best.clone());
        }
        self.report(observer, start.elapsed())
    }

    fn found_acceptable(&self) -> bool {
        self.config.first_acceptable
            && self.best.as_ref().map(|b| b.fitness().error == 0) == Some(true)
    }

    fn report(&mut self, observer: &mut dyn Observer, elapsed: Duration) -> Result<(), ClbError> {
        let generation_best = first_best(&self.population)?.fitness();
        let best = self.best.as_ref().map(Genome::fitness).unwrap_or(generation_best);
        let size = self.population.len() as f64;
        let error: usize = self.population.iter().map(|g| g.fitness().error).sum();
        let used: usize = self.population.iter().map(|g| g.fitness().used_blocks).sum();

        let report = GenerationReport {
            generation: self.generation,
            elapsed,
            best,
            generation_best,
            average_error: error as f64 / size,
            average_used_blocks: used as f64 / size,
        };
        debug!("{}", &report);
        observer.on_generation(&report);
        self.generation += 1;
        Ok(())
    }
}

/// Produce the successor of a parent: the best of its mutated clones if it is not worse
fn breed(
    parent: &Genome,
    config: &Config,
    evaluator: &Evaluator,
    seed: u64,
) -> Result<Genome, ClbError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut best_child: Option<Genome> = None;
    for _ in 0..config.mutations_per_parent {
        let mut child = parent.clone();
        // An unchanged child keeps the fitness of its parent
        if child.mutate(config.mutation_chance, &mut rng)? {
            evaluator.evaluate(&mut child)?;
        }
        best_child = match best_child {
            Some(best) if best.compare_better(&child) != Ordering::Greater => Some(best),
            _ => Some(child),
        };
    }

    let child = best_child.ok_or(ClbError::EmptyPopulation)?;
    let successor = match child.compare_better(parent) {
        Ordering::Less => child,
        Ordering::Greater => parent.clone(),
        Ordering::Equal => match rng.random_bool(0.5) {
            true => child,
            false => parent.clone(),
        },
    };
    Ok(successor)
}

fn collect_successes(results: Vec<Result<Genome, ClbError>>) -> Result<Vec<Genome>, ClbError> {
    let population: Vec<Genome> = results
        .into_iter()
        .filter_map(|r| match r {
            Ok(genome) => Some(genome),
            Err(e) => {
                warn!("Discarding a genome: {}", e);
                None
            }
        })
        .collect();
    if population.is_empty() {
        return Err(ClbError::EmptyPopulation);
    }
    Ok(population)
}

/// The best genome, the first one in case of ties
fn first_best(population: &[Genome]) -> Result<&Genome, ClbError> {
    population
        .iter()
        .min_by(|a, b| a.compare_better(b))
        .ok_or(ClbError::EmptyPopulation)
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[derive(Default)]
    struct Recorder {
        reports: Vec<GenerationReport>,
        passes: usize,
        max_passes: usize,
    }

    impl Observer for Recorder {
        fn on_generation(&mut self, report: &GenerationReport) {
            self.reports.push(report.clone());
        }

        fn continue_iterating(&mut self) -> bool {
            self.passes += 1;
            self.passes < self.max_passes
        }
    }

    fn evaluator(text: &str) -> Result<Evaluator, ClbError> {
        Evaluator::new(parse_functions(text)?)
    }

    #[test]
    fn config_validation() {
        let config = Config::new(4, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.pop_size, 50);
        assert_eq!(config.max_generations, 500);

        let invalid = [
            Config {
                pop_size: 0,
                ..config.clone()
            },
            Config {
                num_blocks: 0,
                ..config.clone()
            },
            Config {
                inputs_per_block: 17,
                ..config.clone()
            },
            Config {
                mutations_per_parent: 0,
                ..config.clone()
            },
            Config {
                mutation_chance: 1.5,
                ..config.clone()
            },
            Config {
                mutation_chance: f64::NAN,
                ..config.clone()
            },
            Config {
                threads: Some(0),
                ..config.clone()
            },
        ];
        for c in invalid {
            assert!(c.validate().is_err(), "{:?}", c);
        }
    }

    #[test_log::test]
    fn finds_simple_mapping() -> Result<(), ClbError> {
        let evaluator = evaluator("f <= A and not B;")?;
        let mut config = Config::new(2, 2);
        config.pop_size = 20;
        config.max_generations = 300;
        config.mutation_chance = 0.1;
        config.first_acceptable = true;
        config.seed = Some(5);

        let mut solver = Solver::new(config, &evaluator)?;
        assert_eq!(solver.phase(), Phase::Idle);
        let best = solver.solve(&mut LogObserver)?;

        assert_eq!(solver.phase(), Phase::Done);
        assert_eq!(best.fitness().error, 0);
        assert!(best.fitness().used_blocks <= 2);

        // the reported fitness is consistent with a new evaluation
        let mut copy = best.clone();
        assert_eq!(evaluator.evaluate(&mut copy)?, best.fitness());
        Ok(())
    }

    #[test]
    fn best_never_regresses() -> Result<(), ClbError> {
        let evaluator = evaluator("s <= A xor B xor C; c <= A and B or C and (A xor B);")?;
        let mut config = Config::new(4, 2);
        config.pop_size = 8;
        config.max_generations = 30;
        config.seed = Some(9);

        let mut recorder = Recorder::default();
        let mut solver = Solver::new(config, &evaluator)?;
        let best = solver.solve(&mut recorder)?;

        assert_eq!(recorder.reports.len(), 31);
        for (idx, report) in recorder.reports.iter().enumerate() {
            assert_eq!(report.generation, idx);
            assert!(report.best <= report.generation_best);
            assert!(report.average_error >= report.generation_best.error as f64);
        }
        for pair in recorder.reports.windows(2) {
            assert!(pair[1].best <= pair[0].best);
        }
        assert_eq!(recorder.reports[30].best, best.fitness());
        assert!(best.fitness().used_blocks <= 4);
        // continuation is only requested in iterative mode
        assert_eq!(recorder.passes, 0);
        Ok(())
    }

    #[test]
    fn iterative_passes() -> Result<(), ClbError> {
        let evaluator = evaluator("f <= A xnor B;")?;
        let mut config = Config::new(3, 2);
        config.pop_size = 4;
        config.max_generations = 5;
        config.iterative = true;
        config.seed = Some(1);

        let mut recorder = Recorder {
            max_passes: 3,
            ..Recorder::default()
        };
        let mut solver = Solver::new(config, &evaluator)?;
        solver.solve(&mut recorder)?;

        assert_eq!(recorder.passes, 3);
        assert_eq!(recorder.reports.len(), 1 + 3 * 5);
        assert_eq!(solver.generation(), 16);
        Ok(())
    }

    #[test]
    fn reproducible_with_seed() -> Result<(), ClbError> {
        let evaluator = evaluator("f <= A or B and C; g <= not (A nand C);")?;
        let run = |threads: usize| -> Result<Genome, ClbError> {
            let mut config = Config::new(5, 2);
            config.pop_size = 12;
            config.max_generations = 25;
            config.seed = Some(2024);
            config.threads = Some(threads);
            Solver::new(config, &evaluator)?.solve(&mut Recorder::default())
        };

        let first = run(1)?;
        let second = run(4)?;
        assert_eq!(first.fitness(), second.fitness());
        assert_eq!(first.blocks(), second.blocks());
        assert_eq!(first.outputs(), second.outputs());
        Ok(())
    }

    #[test]
    fn invalid_transitions() -> Result<(), ClbError> {
        let evaluator = evaluator("f <= A;")?;
        let mut solver = Solver::new(Config::new(1, 1), &evaluator)?;
        let mut observer = Recorder::default();

        assert!(solver.run_pass(&mut observer).is_err());
        assert!(matches!(
            solver.step(&mut observer),
            Err(ClbError::InvalidState(_))
        ));
        assert!(solver.evaluate_population(&mut observer).is_err());
        solver.initialize()?;
        assert_eq!(solver.phase(), Phase::Initialized);
        assert_eq!(solver.population().len(), 50);
        assert!(solver.initialize().is_err());
        assert!(matches!(
            solver.step(&mut observer),
            Err(ClbError::InvalidState(_))
        ));
        solver.evaluate_population(&mut observer)?;
        assert_eq!(solver.phase(), Phase::Evaluated);
        assert!(solver.best().is_some());
        solver.step(&mut observer)?;
        assert_eq!(solver.phase(), Phase::Evaluated);

        // A finished search can not be stepped further
        let mut config = Config::new(1, 1);
        config.max_generations = 2;
        config.seed = Some(5);
        let mut done = Solver::new(config, &evaluator)?;
        done.solve(&mut observer)?;
        assert_eq!(done.phase(), Phase::Done);
        assert!(matches!(
            done.step(&mut observer),
            Err(ClbError::InvalidState(_))
        ));
        Ok(())
    }
}
