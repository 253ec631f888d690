//! Solver results.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{Conflict, ScheduleState};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The strategy finished on its own.
    Completed,
    /// The wall-clock limit was reached.
    Deadline,
    /// The iteration cap was reached.
    IterationCap,
    /// The caller cancelled the run.
    Cancelled,
}

/// Statistics of one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Strategy name.
    pub strategy: String,
    /// How the run stopped.
    pub termination: Termination,
    /// Iterations completed (strategy-specific unit).
    pub iterations: u64,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
    /// Hard conflicts in the returned state.
    pub hard_conflicts: usize,
    /// Soft penalty of the returned state.
    pub soft_penalty: f64,
    /// Sections left unplaced or involved in a hard conflict, sorted.
    pub unresolved: Vec<String>,
}

/// Best state found by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOutcome {
    /// The schedule.
    pub state: ScheduleState,
    /// Hard conflicts remaining in `state`, as validated.
    pub conflicts: Vec<Conflict>,
    /// Run statistics.
    pub stats: SolveStats,
}

impl SolveOutcome {
    /// Whether every section is placed without hard conflicts.
    pub fn is_feasible(&self) -> bool {
        self.conflicts.is_empty() && self.stats.unresolved.is_empty()
    }

    /// Sections the run left without an assignment.
    pub fn unplaced(&self) -> usize {
        self.stats
            .unresolved
            .iter()
            .filter(|id| !self.state.contains(id))
            .count()
    }

    /// `Infeasible` when conflicts or unplaced sections remain. This is a
    /// caveat on a usable result, not a failure.
    pub fn infeasibility(&self) -> Option<EngineError> {
        (!self.is_feasible()).then(|| EngineError::Infeasible {
            hard_conflicts: self.conflicts.len(),
            unplaced: self.unplaced(),
        })
    }
}
