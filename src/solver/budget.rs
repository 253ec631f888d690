//! Search budgets, cancellation and progress.
//!
//! Every strategy drives its main loop through [`SearchControl::tick`],
//! which is the single place where the deadline, the iteration cap and
//! the cancellation flag are checked. A stop is a normal outcome: the
//! strategy returns the best state it has.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::Termination;

/// Limits of one solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveBudget {
    /// Wall-clock limit.
    pub time_limit: Option<Duration>,
    /// Maximum iterations (strategy-specific unit).
    pub max_iterations: Option<u64>,
}

impl Default for SolveBudget {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(30)),
            max_iterations: None,
        }
    }
}

impl SolveBudget {
    /// No deadline and no iteration cap.
    pub fn unlimited() -> Self {
        Self {
            time_limit: None,
            max_iterations: None,
        }
    }

    /// Sets the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }
}

/// Cooperative cancellation flag shared between a job and its solver.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

const UNKNOWN: usize = usize::MAX;

#[derive(Debug)]
struct ProgressCells {
    iterations: AtomicU64,
    assigned: AtomicUsize,
    best_hard_conflicts: AtomicUsize,
}

/// Live progress of a run, written by the solver and polled by clients.
///
/// The iteration counter only increases.
#[derive(Debug, Clone)]
pub struct Progress(Arc<ProgressCells>);

impl Default for Progress {
    fn default() -> Self {
        Self(Arc::new(ProgressCells {
            iterations: AtomicU64::new(0),
            assigned: AtomicUsize::new(0),
            best_hard_conflicts: AtomicUsize::new(UNKNOWN),
        }))
    }
}

/// Point-in-time copy of [`Progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Iterations completed.
    pub iterations: u64,
    /// Sections with a placement in the current search state.
    pub assigned: usize,
    /// Hard conflicts of the best state so far, once known.
    pub best_hard_conflicts: Option<usize>,
}

impl Progress {
    /// Creates zeroed progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the current values.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let best = self.0.best_hard_conflicts.load(Ordering::Relaxed);
        ProgressSnapshot {
            iterations: self.0.iterations.load(Ordering::Relaxed),
            assigned: self.0.assigned.load(Ordering::Relaxed),
            best_hard_conflicts: (best != UNKNOWN).then_some(best),
        }
    }

    fn set_iterations(&self, n: u64) {
        self.0.iterations.fetch_max(n, Ordering::Relaxed);
    }

    fn set_assigned(&self, n: usize) {
        self.0.assigned.store(n, Ordering::Relaxed);
    }

    fn set_best(&self, hard: usize) {
        self.0.best_hard_conflicts.store(hard, Ordering::Relaxed);
    }
}

/// Budget enforcement for one run.
#[derive(Debug)]
pub struct SearchControl {
    started: Instant,
    deadline: Option<Instant>,
    max_iterations: Option<u64>,
    iterations: u64,
    cancel: CancelToken,
    progress: Progress,
    stopped: Option<Termination>,
}

impl SearchControl {
    /// Starts the clock for a run.
    pub fn new(budget: SolveBudget, cancel: CancelToken, progress: Progress) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: budget.time_limit.map(|d| started + d),
            max_iterations: budget.max_iterations,
            iterations: 0,
            cancel,
            progress,
            stopped: None,
        }
    }

    /// A control nobody else observes.
    pub fn standalone(budget: SolveBudget) -> Self {
        Self::new(budget, CancelToken::new(), Progress::new())
    }

    /// Accounts for one iteration.
    ///
    /// Returns `false`, and keeps returning `false`, once the run must stop.
    pub fn tick(&mut self) -> bool {
        if self.stopped.is_some() {
            return false;
        }
        let reason = if self.cancel.is_cancelled() {
            Some(Termination::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Termination::Deadline)
        } else if self.max_iterations.is_some_and(|m| self.iterations >= m) {
            Some(Termination::IterationCap)
        } else {
            None
        };
        if let Some(reason) = reason {
            self.stopped = Some(reason);
            return false;
        }
        self.iterations += 1;
        self.progress.set_iterations(self.iterations);
        true
    }

    /// Whether a stop condition has been observed.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    /// Whether the caller cancelled the run.
    pub fn is_cancelled(&self) -> bool {
        self.stopped == Some(Termination::Cancelled) || self.cancel.is_cancelled()
    }

    /// How the run ended (`Completed` if no limit was hit).
    pub fn termination(&self) -> Termination {
        self.stopped.unwrap_or(Termination::Completed)
    }

    /// Iterations completed.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Publishes the number of placed sections.
    pub fn report_assigned(&self, assigned: usize) {
        self.progress.set_assigned(assigned);
    }

    /// Publishes the hard-conflict count of the best state so far.
    pub fn report_best(&self, hard_conflicts: usize) {
        self.progress.set_best(hard_conflicts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_cap() {
        let mut ctl = SearchControl::standalone(SolveBudget::unlimited().with_max_iterations(3));
        assert!(ctl.tick());
        assert!(ctl.tick());
        assert!(ctl.tick());
        assert!(!ctl.tick());
        assert!(!ctl.tick());
        assert_eq!(ctl.iterations(), 3);
        assert_eq!(ctl.termination(), Termination::IterationCap);
    }

    #[test]
    fn test_deadline() {
        let mut ctl = SearchControl::standalone(SolveBudget::unlimited().with_time_limit(Duration::ZERO));
        assert!(!ctl.tick());
        assert_eq!(ctl.termination(), Termination::Deadline);
    }

    #[test]
    fn test_cancel_observed_at_tick() {
        let token = CancelToken::new();
        let mut ctl = SearchControl::new(SolveBudget::unlimited(), token.clone(), Progress::new());
        assert!(ctl.tick());
        token.cancel();
        assert!(!ctl.tick());
        assert!(ctl.is_cancelled());
        assert_eq!(ctl.termination(), Termination::Cancelled);
    }

    #[test]
    fn test_unlimited_completes() {
        let mut ctl = SearchControl::standalone(SolveBudget::unlimited());
        for _ in 0..100 {
            assert!(ctl.tick());
        }
        assert_eq!(ctl.termination(), Termination::Completed);
    }

    #[test]
    fn test_progress_published() {
        let progress = Progress::new();
        assert_eq!(progress.snapshot().best_hard_conflicts, None);

        let mut ctl = SearchControl::new(SolveBudget::unlimited(), CancelToken::new(), progress.clone());
        ctl.tick();
        ctl.tick();
        ctl.report_assigned(7);
        ctl.report_best(2);

        let snap = progress.snapshot();
        assert_eq!(snap.iterations, 2);
        assert_eq!(snap.assigned, 7);
        assert_eq!(snap.best_hard_conflicts, Some(2));
    }

    #[test]
    fn test_budget_serde_defaults() {
        let b: SolveBudget = serde_json::from_str("{}").unwrap();
        assert_eq!(b, SolveBudget::default());
        assert_eq!(b.time_limit, Some(Duration::from_secs(30)));
    }
}
