//! Generational GA loop.
//!
//! Generic over [`GaProblem`]: tournament selection, crossover with
//! probability `crossover_rate`, mutation with probability
//! `mutation_rate`, `elite_count` best individuals carried over.
//! Fitness evaluation of a generation runs on the rayon pool when
//! `parallel` is set; individuals are independent and the problem is
//! read-only, so the result does not depend on it.
//!
//! One generation is one iteration of the [`SearchControl`].
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization, and
//! Machine Learning"

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::operators::{tournament_select, GeneticOperators};
use crate::error::{EngineError, EngineResult};
use crate::solver::SearchControl;

/// GA parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generation limit (the run's budget may stop it earlier).
    pub max_generations: usize,
    /// Contestants per tournament.
    pub tournament_size: usize,
    /// Probability of crossover per child.
    pub crossover_rate: f64,
    /// Probability of mutation per child.
    pub mutation_rate: f64,
    /// Best individuals copied unchanged into the next generation.
    pub elite_count: usize,
    /// Fitness weight of one hard conflict.
    pub hard_weight: f64,
    /// Fitness weight of one unit of soft penalty.
    pub soft_weight: f64,
    /// RNG seed (`None` = from OS entropy).
    pub seed: Option<u64>,
    /// Evaluate fitness in parallel.
    pub parallel: bool,
    /// Operator selection.
    pub operators: GeneticOperators,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 60,
            max_generations: 300,
            tournament_size: 3,
            crossover_rate: 0.9,
            mutation_rate: 0.2,
            elite_count: 2,
            hard_weight: 1000.0,
            soft_weight: 1.0,
            seed: None,
            parallel: true,
            operators: GeneticOperators::default(),
        }
    }
}

impl GaConfig {
    /// Sets the population size (at least 2).
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the generation limit.
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = n;
        self
    }

    /// Sets the tournament size (at least 1).
    pub fn with_tournament_size(mut self, k: usize) -> Self {
        self.tournament_size = k.max(1);
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, n: usize) -> Self {
        self.elite_count = n;
        self
    }

    /// Sets the hard/soft fitness weights.
    pub fn with_weights(mut self, hard: f64, soft: f64) -> Self {
        self.hard_weight = hard.max(0.0);
        self.soft_weight = soft.max(0.0);
        self
    }

    /// Fixes the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: &str| Err(EngineError::InvalidConfig(format!("genetic.{msg}")));
        if self.population_size < 2 {
            return invalid("population_size must be at least 2");
        }
        if self.tournament_size == 0 {
            return invalid("tournament_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return invalid("crossover_rate must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid("mutation_rate must lie in [0, 1]");
        }
        if !(self.hard_weight.is_finite() && self.hard_weight >= 0.0) {
            return invalid("hard_weight must be finite and non-negative");
        }
        if !(self.soft_weight.is_finite() && self.soft_weight >= 0.0) {
            return invalid("soft_weight must be finite and non-negative");
        }
        Ok(())
    }

    pub(crate) fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }
}

/// A member of the population. Higher fitness is better; 0 is optimal.
pub trait Individual: Clone + Send + Sync {
    /// Fitness set by the last evaluation.
    fn fitness(&self) -> f64;
}

/// Problem definition driven by [`GaRunner`].
pub trait GaProblem: Sync {
    /// Individual type.
    type Individual: Individual;

    /// Creates the `index`-th member of the initial population.
    fn create_individual<R: Rng>(&self, index: usize, rng: &mut R) -> Self::Individual;

    /// Computes and stores the fitness of an individual.
    fn evaluate(&self, individual: &mut Self::Individual);

    /// Produces one child from two parents.
    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        parent2: &Self::Individual,
        rng: &mut R,
    ) -> Self::Individual;

    /// Mutates an individual in place.
    fn mutate<R: Rng>(&self, individual: &mut Self::Individual, rng: &mut R);

    /// Hard violations of an individual (for progress reporting).
    fn violations(&self, individual: &Self::Individual) -> usize;
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I> {
    /// Best individual ever seen.
    pub best: I,
    /// Generations completed.
    pub generations: usize,
    /// Best fitness after each generation (index 0 = initial population).
    pub history: Vec<f64>,
}

/// Runs the generational loop.
pub struct GaRunner;

const OPTIMAL: f64 = -1e-12;

impl GaRunner {
    /// Runs until the generation limit, an optimal individual, or a stop
    /// from `control`.
    pub fn run<P: GaProblem>(problem: &P, config: &GaConfig, control: &mut SearchControl) -> GaResult<P::Individual> {
        let mut rng = config.rng();
        let size = config.population_size.max(2);
        let elite = config.elite_count.min(size);

        let mut population: Vec<P::Individual> = (0..size)
            .map(|i| problem.create_individual(i, &mut rng))
            .collect();
        evaluate_all(problem, &mut population, config.parallel);
        sort_by_fitness(&mut population);

        let mut best = population[0].clone();
        let mut history = vec![best.fitness()];
        let mut generations = 0;
        control.report_best(problem.violations(&best));

        while generations < config.max_generations {
            if best.fitness() >= OPTIMAL || !control.tick() {
                break;
            }

            let mut next: Vec<P::Individual> = population[..elite].to_vec();
            while next.len() < size {
                let p1 = tournament_select(&population, config.tournament_size, &mut rng);
                let p2 = tournament_select(&population, config.tournament_size, &mut rng);
                let mut child = if rng.random_bool(config.crossover_rate) {
                    problem.crossover(p1, p2, &mut rng)
                } else {
                    p1.clone()
                };
                if rng.random_bool(config.mutation_rate) {
                    problem.mutate(&mut child, &mut rng);
                }
                next.push(child);
            }
            evaluate_all(problem, &mut next[elite..], config.parallel);
            sort_by_fitness(&mut next);
            population = next;
            generations += 1;

            if population[0].fitness() > best.fitness() {
                best = population[0].clone();
                control.report_best(problem.violations(&best));
            }
            history.push(best.fitness());
            trace!(generation = generations, best = best.fitness(), "ga generation");
        }

        GaResult {
            best,
            generations,
            history,
        }
    }
}

fn evaluate_all<P: GaProblem>(problem: &P, individuals: &mut [P::Individual], parallel: bool) {
    if parallel {
        individuals.par_iter_mut().for_each(|ind| problem.evaluate(ind));
    } else {
        individuals.iter_mut().for_each(|ind| problem.evaluate(ind));
    }
}

fn sort_by_fitness<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
}
