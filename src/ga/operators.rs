//! Configurable genetic operators for timetabling.
//!
//! Provides runtime-selectable crossover and mutation strategies
//! via [`GeneticOperators`].
//!
//! # Usage
//!
//! ```
//! use u_timetable::ga::operators::{CrossoverType, GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::Uniform);
//! assert_eq!(ops.mutation_type, MutationType::Reassign);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::TimetableChromosome;
use super::runner::Individual;
use crate::solver::{best_candidate, Occupancy, SchedulingProblem};

/// Which sections a child inherits from the second parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrossoverType {
    /// Each section independently with probability 1/2.
    #[default]
    Uniform,
    /// A contiguous block of sections between two cut points.
    TwoPoint,
}

/// How a child is perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MutationType {
    /// Move a random section to a random compatible candidate.
    #[default]
    Reassign,
    /// Move a conflicting section (random one if none) to its
    /// min-conflict candidate.
    MinConflict,
}

/// Runtime-selectable genetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Mutation strategy.
    pub mutation_type: MutationType,
}

impl GeneticOperators {
    /// Performs crossover using the configured strategy.
    pub fn crossover<R: Rng>(
        &self,
        problem: &SchedulingProblem<'_>,
        p1: &TimetableChromosome,
        p2: &TimetableChromosome,
        rng: &mut R,
    ) -> TimetableChromosome {
        let n = p1.genes.len();
        let subset: Vec<usize> = match self.crossover_type {
            CrossoverType::Uniform => (0..n).filter(|_| rng.random_bool(0.5)).collect(),
            CrossoverType::TwoPoint => {
                if n == 0 {
                    Vec::new()
                } else {
                    let a = rng.random_range(0..n);
                    let b = rng.random_range(0..n);
                    (a.min(b)..=a.max(b)).collect()
                }
            }
        };
        subset_exchange(problem, p1, p2, &subset)
    }

    /// Performs mutation using the configured strategy.
    pub fn mutate<R: Rng>(
        &self,
        problem: &SchedulingProblem<'_>,
        chromosome: &mut TimetableChromosome,
        rng: &mut R,
    ) {
        match self.mutation_type {
            MutationType::Reassign => reassign_mutation(problem, chromosome, rng),
            MutationType::MinConflict => min_conflict_mutation(problem, chromosome, rng),
        }
    }
}

/// Tournament selection: best of `k` uniformly drawn individuals.
pub fn tournament_select<'p, I: Individual, R: Rng>(population: &'p [I], k: usize, rng: &mut R) -> &'p I {
    let mut best = &population[rng.random_range(0..population.len())];
    for _ in 1..k.max(1) {
        let other = &population[rng.random_range(0..population.len())];
        if other.fitness() > best.fitness() {
            best = other;
        }
    }
    best
}

/// Child of `p1` with the sections in `subset` taken from `p2`.
///
/// Sections taken from `p2` that now clash are re-placed greedily on
/// their min-conflict candidate.
pub fn subset_exchange(
    problem: &SchedulingProblem<'_>,
    p1: &TimetableChromosome,
    p2: &TimetableChromosome,
    subset: &[usize],
) -> TimetableChromosome {
    let mut genes = p1.genes.clone();
    for &s in subset {
        genes[s] = p2.genes[s];
    }
    let mut child = TimetableChromosome::new(genes);
    repair(problem, &mut child, subset);
    child
}

/// Re-places every section of `sections` that takes part in a hard
/// conflict.
pub fn repair(problem: &SchedulingProblem<'_>, chromosome: &mut TimetableChromosome, sections: &[usize]) {
    let mut occ = Occupancy::from_placement(problem, &chromosome.placement());
    let mut changed = false;
    for &s in sections {
        if occ.conflicts_of(problem, s) == 0 {
            continue;
        }
        if let Some((ci, _)) = best_candidate(problem, &occ, s) {
            if Some(ci) != occ.placed(s) {
                occ.assign(problem, s, ci);
                changed = true;
            }
        }
    }
    if changed {
        *chromosome = TimetableChromosome::from_placement(occ.placement());
    }
}

/// Moves one random section to a random compatible candidate.
pub fn reassign_mutation<R: Rng>(problem: &SchedulingProblem<'_>, chromosome: &mut TimetableChromosome, rng: &mut R) {
    if chromosome.genes.is_empty() {
        return;
    }
    let s = rng.random_range(0..chromosome.genes.len());
    let count = problem.candidates(s).len();
    if count > 0 {
        chromosome.genes[s] = rng.random_range(0..count);
        chromosome.invalidate();
    }
}

/// Moves a conflicting section to its min-conflict candidate.
pub fn min_conflict_mutation<R: Rng>(problem: &SchedulingProblem<'_>, chromosome: &mut TimetableChromosome, rng: &mut R) {
    let n = chromosome.genes.len();
    if n == 0 {
        return;
    }
    let mut occ = Occupancy::from_placement(problem, &chromosome.placement());
    let conflicting: Vec<usize> = (0..n).filter(|&s| occ.conflicts_of(problem, s) > 0).collect();
    let s = if conflicting.is_empty() {
        rng.random_range(0..n)
    } else {
        conflicting[rng.random_range(0..conflicting.len())]
    };
    if let Some((ci, _)) = best_candidate(problem, &occ, s) {
        occ.assign(problem, s, ci);
        *chromosome = TimetableChromosome::from_placement(occ.placement());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintStore;
    use crate::models::{Classroom, Section, Teacher};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn fixture() -> (Vec<Section>, ConstraintStore) {
        let store = ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("R1", 50))
            .with_classroom(Classroom::new("R2", 50))
            .with_slots(ConstraintStore::weekly_grid(2, 3, 8, 2));
        let secs = (0..6)
            .map(|i| Section::new(format!("S{i}"), if i < 3 { "T1" } else { "T2" }))
            .collect();
        (secs, store)
    }

    #[test]
    fn test_default_operators() {
        let ops = GeneticOperators::default();
        assert_eq!(ops.crossover_type, CrossoverType::Uniform);
        assert_eq!(ops.mutation_type, MutationType::Reassign);
    }

    #[test]
    fn test_subset_exchange_takes_genes_and_repairs() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        // every section on candidate 0: heavy clashes
        let p1 = TimetableChromosome::new(vec![0; 6]);
        let p2 = TimetableChromosome::new(vec![0; 6]);
        let child = subset_exchange(&p, &p1, &p2, &[0, 1, 2, 3, 4, 5]);

        let (hard, _) = p.evaluate(&child.placement());
        let (parent_hard, _) = p.evaluate(&p1.placement());
        assert!(hard < parent_hard);
    }

    #[test]
    fn test_subset_exchange_keeps_p1_outside_subset() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let p1 = TimetableChromosome::new(vec![0, 2, 4, 0, 2, 4]);
        let p2 = TimetableChromosome::new(vec![1, 3, 5, 1, 3, 5]);
        let child = subset_exchange(&p, &p1, &p2, &[1]);
        assert_eq!(child.genes[0], 0);
        assert_eq!(child.genes[2], 4);
        assert_eq!(child.genes[5], 4);
    }

    #[test]
    fn test_crossover_two_point_len() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let ops = GeneticOperators {
            crossover_type: CrossoverType::TwoPoint,
            mutation_type: MutationType::Reassign,
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let p1 = TimetableChromosome::new(vec![0; 6]);
        let p2 = TimetableChromosome::new(vec![3; 6]);
        let child = ops.crossover(&p, &p1, &p2, &mut rng);
        assert_eq!(child.genes.len(), 6);
    }

    #[test]
    fn test_reassign_stays_in_range() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut ch = TimetableChromosome::new(vec![0; 6]);
        let mut changed = false;
        for _ in 0..50 {
            reassign_mutation(&p, &mut ch, &mut rng);
            changed |= ch.genes.iter().any(|&g| g != 0);
            assert!(ch.genes.iter().enumerate().all(|(s, &g)| g < p.candidates(s).len()));
        }
        assert!(changed);
    }

    #[test]
    fn test_min_conflict_mutation_reduces_conflicts() {
        let (secs, store) = fixture();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut ch = TimetableChromosome::new(vec![0; 6]);
        let before = p.evaluate(&ch.placement()).0;
        min_conflict_mutation(&p, &mut ch, &mut rng);
        assert!(p.evaluate(&ch.placement()).0 < before);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut a = TimetableChromosome::new(vec![0]);
        a.fitness = -10.0;
        let mut b = TimetableChromosome::new(vec![1]);
        b.fitness = -1.0;
        let pop = vec![a, b];
        let mut rng = SmallRng::seed_from_u64(3);
        let mut wins = 0;
        for _ in 0..100 {
            if tournament_select(&pop, 4, &mut rng).genes[0] == 1 {
                wins += 1;
            }
        }
        assert!(wins > 80);
    }
}
