//! Solver strategies.
//!
//! Every strategy implements [`Solver`]: take the compact problem and a
//! [`SearchControl`], return the best placement found before the budget
//! ran out. [`solve`] wraps a strategy with problem construction and
//! turns the placement into a validated [`SolveOutcome`].
//!
//! The strategy is always chosen by the caller; nothing here guesses.
//!
//! # Strategies
//! - [`GreedySolver`]: scarcity-ordered single pass
//! - [`BacktrackingSolver`]: DFS with forward checking
//! - [`crate::ga::GeneticSolver`]: population search for soft quality

mod backtrack;
mod budget;
mod greedy;
mod outcome;
mod problem;

pub use backtrack::BacktrackingSolver;
pub use budget::{CancelToken, Progress, ProgressSnapshot, SearchControl, SolveBudget};
pub use greedy::GreedySolver;
pub use outcome::{SolveOutcome, SolveStats, Termination};
pub use problem::{Candidate, Occupancy, Placement, SchedulingProblem};

pub(crate) use greedy::{best_candidate, placement_order, place_remaining};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constraints::ConstraintStore;
use crate::detection::{validate_state, SectionIndex};
use crate::error::{EngineError, EngineResult};
use crate::ga::{GaConfig, GeneticSolver};
use crate::models::Section;

/// A scheduling algorithm.
pub trait Solver: Send + Sync + fmt::Debug {
    /// Strategy name (e.g., "greedy").
    fn name(&self) -> &'static str;

    /// Searches for a placement. Must poll `control.tick()` at every
    /// iteration boundary and return the best placement once it says stop.
    fn solve(&self, problem: &SchedulingProblem<'_>, control: &mut SearchControl) -> EngineResult<Placement>;
}

/// Caller-selected strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// [`GreedySolver`].
    Greedy,
    /// [`BacktrackingSolver`].
    Backtracking,
    /// [`GeneticSolver`] with its configuration.
    Genetic(GaConfig),
}

impl Strategy {
    /// Strategy name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Backtracking => "backtracking",
            Self::Genetic(_) => "genetic",
        }
    }

    /// Checks the strategy's own settings.
    ///
    /// # Errors
    /// `InvalidConfig` for out-of-range GA parameters.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            Self::Genetic(config) => config.validate(),
            Self::Greedy | Self::Backtracking => Ok(()),
        }
    }

    /// Instantiates the solver.
    pub fn solver(&self) -> Box<dyn Solver> {
        match self {
            Self::Greedy => Box::new(GreedySolver::new()),
            Self::Backtracking => Box::new(BacktrackingSolver::new()),
            Self::Genetic(config) => Box::new(GeneticSolver::new(config.clone())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognized strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}' (expected greedy, constraint or genetic)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    /// Parses `greedy`, `constraint` / `backtracking`, or `genetic`
    /// (default GA settings).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "constraint" | "backtracking" => Ok(Self::Backtracking),
            "genetic" | "ga" => Ok(Self::Genetic(GaConfig::default())),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Runs a strategy over sections with a fresh, unobserved control.
///
/// # Errors
/// `Validation` or `InvalidConstraints` before the search starts;
/// whatever the strategy reports as an internal error.
pub fn solve(
    strategy: &Strategy,
    sections: &[Section],
    store: &ConstraintStore,
    budget: SolveBudget,
) -> EngineResult<SolveOutcome> {
    solve_with(strategy, sections, store, &mut SearchControl::standalone(budget))
}

/// Runs a strategy under an existing control (shared cancel flag and
/// progress).
pub fn solve_with(
    strategy: &Strategy,
    sections: &[Section],
    store: &ConstraintStore,
    control: &mut SearchControl,
) -> EngineResult<SolveOutcome> {
    strategy.validate()?;
    let problem = SchedulingProblem::new(sections, store)?;
    let solver = strategy.solver();
    debug!(strategy = solver.name(), sections = problem.len(), "solver started");

    let placement = solver.solve(&problem, control)?;
    if placement.len() != problem.len() {
        return Err(EngineError::InternalSolverError(format!(
            "{} returned {} placements for {} sections",
            solver.name(),
            placement.len(),
            problem.len()
        )));
    }
    finish(&problem, &placement, solver.name(), control)
}

fn finish(
    problem: &SchedulingProblem<'_>,
    placement: &[Option<usize>],
    strategy: &str,
    control: &SearchControl,
) -> EngineResult<SolveOutcome> {
    let state = problem.to_state(placement);
    let index = SectionIndex::new(problem.sections(), problem.store());
    let conflicts = validate_state(&state, &index)?;
    let occ = Occupancy::from_placement(problem, placement);
    if occ.hard_conflicts() != conflicts.len() {
        return Err(EngineError::InternalSolverError(format!(
            "{strategy}: occupancy counted {} conflicts, validation found {}",
            occ.hard_conflicts(),
            conflicts.len()
        )));
    }

    let mut unresolved: Vec<String> = problem
        .sections()
        .iter()
        .filter(|s| !state.contains(&s.id) || conflicts.iter().any(|c| c.involves(&s.id)))
        .map(|s| s.id.clone())
        .collect();
    unresolved.sort();

    let stats = SolveStats {
        strategy: strategy.to_string(),
        termination: control.termination(),
        iterations: control.iterations(),
        elapsed_ms: control.elapsed().as_millis() as u64,
        hard_conflicts: conflicts.len(),
        soft_penalty: occ.soft_penalty(problem),
        unresolved,
    };
    info!(
        strategy,
        termination = ?stats.termination,
        iterations = stats.iterations,
        hard_conflicts = stats.hard_conflicts,
        soft_penalty = stats.soft_penalty,
        elapsed_ms = stats.elapsed_ms,
        "solver finished"
    );
    control.report_best(stats.hard_conflicts);

    Ok(SolveOutcome {
        state,
        conflicts,
        stats,
    })
}
