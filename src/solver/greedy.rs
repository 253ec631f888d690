//! Greedy constructive strategy.
//!
//! Places sections one at a time in scarcity order. Each section takes
//! the conflict-free candidate with the lowest soft penalty; if every
//! candidate clashes, it takes the one adding the fewest conflicts and
//! stays unresolved.
//!
//! # Algorithm
//! 1. Order sections by [`RuleEngine::scarcity_first`]
//! 2. For each section, scan its candidates: minimize
//!    (new hard conflicts, soft delta, candidate rank)
//! 3. Place and continue; one iteration per placed section
//!
//! # Complexity
//! O(n·m·b) for n sections, m candidates per section and b the average
//! bucket size.
//!
//! # Reference
//! Carter, Laporte & Lee (1996), "Examination timetabling: Algorithmic
//! strategies and applications", sequential heuristics.

use super::{Occupancy, Placement, SchedulingProblem, SearchControl, Solver};
use crate::error::EngineResult;
use crate::ordering::RuleEngine;

/// Scarcity-ordered greedy placement.
#[derive(Debug, Clone, Default)]
pub struct GreedySolver;

impl GreedySolver {
    /// Creates a greedy solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&self, problem: &SchedulingProblem<'_>, control: &mut SearchControl) -> EngineResult<Placement> {
        let order = placement_order(problem);
        let mut occ = Occupancy::new(problem);
        place_remaining(problem, &order, &mut occ, || control.tick());
        control.report_assigned(occ.assigned());
        control.report_best(occ.hard_conflicts());
        Ok(occ.into_placement())
    }
}

/// Section indices in scarcity order.
pub(crate) fn placement_order(problem: &SchedulingProblem<'_>) -> Vec<usize> {
    RuleEngine::scarcity_first().sort_indices(problem.sections(), &problem.ordering_context())
}

/// Best candidate for a section against the current occupancy:
/// (candidate, new hard conflicts).
pub(crate) fn best_candidate(problem: &SchedulingProblem<'_>, occ: &Occupancy, section: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, f64, usize)> = None;
    for ci in 0..problem.candidates(section).len() {
        let hard = occ.new_conflicts(problem, section, ci);
        if let Some((bh, _, _)) = best {
            if hard > bh {
                continue;
            }
        }
        let soft = occ.soft_delta(problem, section, ci);
        let better = match best {
            None => true,
            Some((bh, bs, _)) => hard < bh || (hard == bh && soft < bs),
        };
        if better {
            best = Some((hard, soft, ci));
        }
    }
    best.map(|(hard, _, ci)| (ci, hard))
}

/// Places every unplaced section of `order`, stopping when `tick` says so.
pub(crate) fn place_remaining(
    problem: &SchedulingProblem<'_>,
    order: &[usize],
    occ: &mut Occupancy,
    mut tick: impl FnMut() -> bool,
) {
    for &s in order {
        if occ.placed(s).is_some() {
            continue;
        }
        if !tick() {
            break;
        }
        if let Some((ci, _)) = best_candidate(problem, occ, s) {
            occ.assign(problem, s, ci);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintStore, SoftWeights};
    use crate::models::{Classroom, Section, Teacher};
    use crate::solver::{SolveBudget, Termination};

    fn tight_store() -> ConstraintStore {
        ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("R1", 50))
            .with_classroom(Classroom::new("R2", 200))
            .with_slots(ConstraintStore::weekly_grid(1, 2, 8, 2))
    }

    #[test]
    fn test_greedy_feasible() {
        let store = tight_store();
        let secs = vec![
            Section::new("S1", "T1").with_capacity(150),
            Section::new("S2", "T1").with_capacity(30),
            Section::new("S3", "T2").with_capacity(30),
            Section::new("S4", "T2").with_capacity(150),
        ];
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let mut ctl = SearchControl::standalone(SolveBudget::unlimited());
        let placement = GreedySolver::new().solve(&p, &mut ctl).unwrap();

        assert!(placement.iter().all(Option::is_some));
        assert_eq!(p.evaluate(&placement).0, 0);
        assert_eq!(ctl.iterations(), 4);
        assert_eq!(ctl.termination(), Termination::Completed);
    }

    #[test]
    fn test_greedy_overloaded_minimizes_conflicts() {
        let store = tight_store();
        // 3 sections of one teacher, 2 slots: one clash unavoidable
        let secs = vec![
            Section::new("S1", "T1"),
            Section::new("S2", "T1"),
            Section::new("S3", "T1"),
        ];
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let mut ctl = SearchControl::standalone(SolveBudget::unlimited());
        let placement = GreedySolver::new().solve(&p, &mut ctl).unwrap();
        assert!(placement.iter().all(Option::is_some));
        assert_eq!(p.evaluate(&placement).0, 1);
    }

    #[test]
    fn test_greedy_deterministic() {
        let store = tight_store().with_weights(SoftWeights::default());
        let secs: Vec<Section> = (0..4)
            .map(|i| Section::new(format!("S{i}"), if i % 2 == 0 { "T1" } else { "T2" }))
            .collect();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let a = GreedySolver::new()
            .solve(&p, &mut SearchControl::standalone(SolveBudget::unlimited()))
            .unwrap();
        let b = GreedySolver::new()
            .solve(&p, &mut SearchControl::standalone(SolveBudget::unlimited()))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_greedy_respects_iteration_cap() {
        let store = tight_store();
        let secs: Vec<Section> = (0..4).map(|i| Section::new(format!("S{i}"), "T1")).collect();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let mut ctl = SearchControl::standalone(SolveBudget::unlimited().with_max_iterations(2));
        let placement = GreedySolver::new().solve(&p, &mut ctl).unwrap();
        assert_eq!(placement.iter().filter(|c| c.is_some()).count(), 2);
        assert_eq!(ctl.termination(), Termination::IterationCap);
    }

    #[test]
    fn test_greedy_prefers_morning() {
        let store = ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_classroom(Classroom::new("R1", 50))
            .with_slots(ConstraintStore::weekly_grid(1, 4, 8, 2))
            .with_weights(SoftWeights::none().with_morning(5.0));
        let secs = vec![Section::new("S1", "T1")];
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let placement = GreedySolver::new()
            .solve(&p, &mut SearchControl::standalone(SolveBudget::unlimited()))
            .unwrap();
        let state = p.to_state(&placement);
        assert!(state.get("S1").unwrap().time_slot.start_hour() < 12);
    }
}
