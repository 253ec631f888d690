//! Timetabling GA problem definition.
//!
//! Implements [`GaProblem`] over a [`SchedulingProblem`]. Fitness is
//! `-(hard * hard_weight + soft * soft_weight)`, so any hard conflict
//! outweighs the whole soft score at the default weights.
//!
//! # Initial population
//! - individual 0: the greedy placement
//! - odd indices: greedy placement with a few random reassignments
//! - even indices: uniformly random candidates

use rand::Rng;

use super::chromosome::TimetableChromosome;
use super::operators::GeneticOperators;
use super::runner::{GaConfig, GaProblem};
use crate::solver::{place_remaining, placement_order, Occupancy, SchedulingProblem};

/// GA problem for timetabling.
#[derive(Debug)]
pub struct TimetableGaProblem<'p> {
    problem: &'p SchedulingProblem<'p>,
    operators: GeneticOperators,
    hard_weight: f64,
    soft_weight: f64,
    greedy: Vec<usize>,
}

impl<'p> TimetableGaProblem<'p> {
    /// Creates the GA problem; runs the greedy pass once for seeding.
    pub fn new(problem: &'p SchedulingProblem<'p>, config: &GaConfig) -> Self {
        let mut occ = Occupancy::new(problem);
        place_remaining(problem, &placement_order(problem), &mut occ, || true);
        let greedy = TimetableChromosome::from_placement(occ.placement()).genes;
        Self {
            problem,
            operators: config.operators,
            hard_weight: config.hard_weight,
            soft_weight: config.soft_weight,
            greedy,
        }
    }

    /// The underlying problem.
    pub fn problem(&self) -> &SchedulingProblem<'p> {
        self.problem
    }

    /// Genes of the greedy seed.
    pub fn greedy_genes(&self) -> &[usize] {
        &self.greedy
    }

    fn random_genes<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        (0..self.problem.len())
            .map(|s| rng.random_range(0..self.problem.candidates(s).len()))
            .collect()
    }
}

impl GaProblem for TimetableGaProblem<'_> {
    type Individual = TimetableChromosome;

    fn create_individual<R: Rng>(&self, index: usize, rng: &mut R) -> TimetableChromosome {
        if index == 0 {
            return TimetableChromosome::new(self.greedy.clone());
        }
        if index % 2 == 1 {
            let mut genes = self.greedy.clone();
            let n = genes.len();
            if n > 0 {
                for _ in 0..(n / 10).max(1) {
                    let s = rng.random_range(0..n);
                    genes[s] = rng.random_range(0..self.problem.candidates(s).len());
                }
            }
            return TimetableChromosome::new(genes);
        }
        TimetableChromosome::new(self.random_genes(rng))
    }

    fn evaluate(&self, individual: &mut TimetableChromosome) {
        let (hard, soft) = self.problem.evaluate(&individual.placement());
        individual.hard = hard;
        individual.soft = soft;
        individual.fitness = -(hard as f64 * self.hard_weight + soft * self.soft_weight);
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &TimetableChromosome,
        parent2: &TimetableChromosome,
        rng: &mut R,
    ) -> TimetableChromosome {
        self.operators.crossover(self.problem, parent1, parent2, rng)
    }

    fn mutate<R: Rng>(&self, individual: &mut TimetableChromosome, rng: &mut R) {
        self.operators.mutate(self.problem, individual, rng);
    }

    fn violations(&self, individual: &TimetableChromosome) -> usize {
        individual.hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintStore, SoftWeights};
    use crate::models::{Classroom, Section, Teacher};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn fixture() -> (Vec<Section>, ConstraintStore) {
        let store = ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("R1", 50))
            .with_slots(ConstraintStore::weekly_grid(2, 3, 8, 2))
            .with_weights(SoftWeights::default());
        let secs = (0..5)
            .map(|i| Section::new(format!("S{i}"), if i < 3 { "T1" } else { "T2" }))
            .collect();
        (secs, store)
    }

    #[test]
    fn test_greedy_seed_is_first() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let ga = TimetableGaProblem::new(&p, &GaConfig::default());
        let mut rng = SmallRng::seed_from_u64(1);
        let first = ga.create_individual(0, &mut rng);
        assert_eq!(first.genes, ga.greedy_genes());
    }

    #[test]
    fn test_evaluate_fitness() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let config = GaConfig::default().with_weights(1000.0, 1.0);
        let ga = TimetableGaProblem::new(&p, &config);

        let mut seed = ga.create_individual(0, &mut SmallRng::seed_from_u64(1));
        ga.evaluate(&mut seed);
        assert_eq!(seed.hard, 0);
        assert!((seed.fitness + seed.soft).abs() < 1e-9);

        let mut clash = TimetableChromosome::new(vec![0; 5]);
        ga.evaluate(&mut clash);
        assert!(clash.hard > 0);
        assert!(clash.fitness < seed.fitness);
        assert_eq!(ga.violations(&clash), clash.hard);
    }

    #[test]
    fn test_random_individuals_in_range() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let ga = TimetableGaProblem::new(&p, &GaConfig::default());
        let mut rng = SmallRng::seed_from_u64(5);
        for i in 0..20 {
            let ind = ga.create_individual(i, &mut rng);
            assert_eq!(ind.genes.len(), 5);
            assert!(ind.genes.iter().enumerate().all(|(s, &g)| g < p.candidates(s).len()));
        }
    }
}
