//! GA-based timetable optimization.
//!
//! A small generational GA framework ([`GaProblem`], [`GaRunner`]) and
//! the timetabling encoding on top of it.
//!
//! # Encoding
//!
//! One gene per section: an index into the section's compatible
//! candidates. Capacity and calendars are always respected, so the
//! search only has to remove double bookings and lower soft penalty.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//!
//! # Reference
//! - Burke, Elliman & Weare (1994), "A Genetic Algorithm Based University
//!   Timetabling System"
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization, and
//!   Machine Learning"

mod chromosome;
pub mod operators;
mod problem;
mod runner;

pub use chromosome::TimetableChromosome;
pub use problem::TimetableGaProblem;
pub use runner::{GaConfig, GaProblem, GaResult, GaRunner, Individual};

use tracing::debug;

use crate::error::EngineResult;
use crate::solver::{Placement, SchedulingProblem, SearchControl, Solver};

/// Genetic algorithm strategy.
///
/// # Example
/// ```
/// use u_timetable::constraints::ConstraintStore;
/// use u_timetable::ga::{GaConfig, GeneticSolver};
/// use u_timetable::models::{Classroom, Section, Teacher};
/// use u_timetable::solver::{SchedulingProblem, SearchControl, SolveBudget, Solver};
///
/// let store = ConstraintStore::new("F26")
///     .with_teacher(Teacher::new("T1"))
///     .with_classroom(Classroom::new("R1", 40))
///     .with_slots(ConstraintStore::weekly_grid(1, 4, 8, 2));
/// let sections = vec![Section::new("S1", "T1"), Section::new("S2", "T1")];
/// let problem = SchedulingProblem::new(&sections, &store).unwrap();
///
/// let solver = GeneticSolver::new(GaConfig::default().with_seed(1));
/// let mut control = SearchControl::standalone(SolveBudget::default());
/// let placement = solver.solve(&problem, &mut control).unwrap();
/// assert_eq!(problem.evaluate(&placement).0, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeneticSolver {
    config: GaConfig,
}

impl GeneticSolver {
    /// Creates a GA solver.
    pub fn new(config: GaConfig) -> Self {
        Self { config }
    }

    /// The GA configuration.
    pub fn config(&self) -> &GaConfig {
        &self.config
    }
}

impl Solver for GeneticSolver {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn solve(&self, problem: &SchedulingProblem<'_>, control: &mut SearchControl) -> EngineResult<Placement> {
        if problem.is_empty() {
            return Ok(Vec::new());
        }
        let ga = TimetableGaProblem::new(problem, &self.config);
        let result = GaRunner::run(&ga, &self.config, control);
        debug!(
            generations = result.generations,
            hard = result.best.hard,
            soft = result.best.soft,
            "ga finished"
        );
        control.report_assigned(problem.len());
        Ok(result.best.placement())
    }
}
