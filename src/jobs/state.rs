//! Job records and their client-facing views.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::constraints::ConstraintStore;
use crate::error::EngineError;
use crate::kpi::ScheduleKpi;
use crate::models::Section;
use crate::solver::{CancelToken, Progress, ProgressSnapshot, SolveBudget, SolveOutcome, Strategy, Termination};

/// Lifecycle of a job.
///
/// `Queued -> Running -> Completed | Failed`, and `Queued | Running ->
/// Cancelled`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// A solver is running.
    Running,
    /// Finished with a result (possibly with conflicts left).
    Completed,
    /// Finished with an error.
    Failed,
    /// Stopped by the caller.
    Cancelled,
}

impl JobStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Everything a job needs to run, captured at submission.
///
/// Kept after the job ends so a failed job can be retried.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Semester being scheduled.
    pub semester: String,
    /// Sections to place.
    pub sections: Vec<Section>,
    /// Snapshot of the constraints.
    pub store: ConstraintStore,
    /// Algorithm.
    pub strategy: Strategy,
    /// Search limits.
    pub budget: SolveBudget,
}

/// Summary of a completed job's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// How the search stopped.
    pub termination: Termination,
    /// Iterations completed.
    pub iterations: u64,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
    /// Sections unplaced or in a conflict.
    pub unresolved: Vec<String>,
    /// Quality metrics of the schedule.
    pub kpi: ScheduleKpi,
    /// Set when conflicts or unplaced sections remain.
    pub caveat: Option<String>,
}

impl ResultSummary {
    /// Summarizes an outcome.
    pub fn from_outcome(outcome: &SolveOutcome, request: &JobRequest) -> Self {
        let kpi = ScheduleKpi::calculate(&outcome.state, &request.sections, &request.store, &outcome.conflicts);
        let caveat = outcome.infeasibility().map(|_| {
            format!(
                "schedule produced with {} unresolved conflicts, {} unplaced sections",
                outcome.conflicts.len(),
                outcome.unplaced()
            )
        });
        Self {
            termination: outcome.stats.termination,
            iterations: outcome.stats.iterations,
            elapsed_ms: outcome.stats.elapsed_ms,
            unresolved: outcome.stats.unresolved.clone(),
            kpi,
            caveat,
        }
    }
}

/// One asynchronous solver execution.
#[derive(Debug)]
pub struct SchedulingJob {
    pub(crate) id: Uuid,
    pub(crate) status: JobStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
    pub(crate) request: Arc<JobRequest>,
    pub(crate) cancel: CancelToken,
    pub(crate) progress: Progress,
    pub(crate) outcome: Option<Arc<SolveOutcome>>,
    pub(crate) summary: Option<ResultSummary>,
    pub(crate) error: Option<EngineError>,
    pub(crate) status_tx: watch::Sender<JobStatus>,
}

impl SchedulingJob {
    pub(crate) fn new(request: JobRequest) -> Self {
        let (status_tx, _) = watch::channel(JobStatus::Queued);
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            request: Arc::new(request),
            cancel: CancelToken::new(),
            progress: Progress::new(),
            outcome: None,
            summary: None,
            error: None,
            status_tx,
        }
    }

    /// Job ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Semester being scheduled.
    pub fn semester(&self) -> &str {
        &self.request.semester
    }

    /// Chosen strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.request.strategy
    }

    /// Submission time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Result, once `Completed`.
    pub fn outcome(&self) -> Option<&Arc<SolveOutcome>> {
        self.outcome.as_ref()
    }

    /// Error, once `Failed` or `Cancelled`.
    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    /// Moves to a new status and wakes waiters. Terminal states stick.
    pub(crate) fn set_status(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || self.status == status {
            return false;
        }
        self.status = status;
        match status {
            JobStatus::Running => self.started_at = Some(Utc::now()),
            s if s.is_terminal() => self.finished_at = Some(Utc::now()),
            _ => {}
        }
        self.status_tx.send_replace(status);
        true
    }

    /// Ends the job with a result.
    pub(crate) fn complete(&mut self, outcome: SolveOutcome) {
        let summary = ResultSummary::from_outcome(&outcome, &self.request);
        if self.set_status(JobStatus::Completed) {
            self.summary = Some(summary);
            self.outcome = Some(Arc::new(outcome));
        }
    }

    /// Ends the job with an error.
    pub(crate) fn fail(&mut self, error: EngineError) {
        if self.set_status(JobStatus::Failed) {
            self.error = Some(error);
        }
    }

    /// Ends the job as cancelled.
    pub(crate) fn mark_cancelled(&mut self) {
        if self.set_status(JobStatus::Cancelled) {
            self.error = Some(EngineError::Cancelled);
        }
    }

    /// Client-facing view.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            semester: self.request.semester.clone(),
            strategy: self.request.strategy.name().to_string(),
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            progress: (self.status == JobStatus::Running).then(|| self.progress.snapshot()),
            result: self.summary.clone(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job ID.
    pub job_id: Uuid,
    /// Semester.
    pub semester: String,
    /// Strategy name.
    pub strategy: String,
    /// Status.
    pub status: JobStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When a worker picked the job up.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Live progress, only while running.
    pub progress: Option<ProgressSnapshot>,
    /// Result summary, only when completed.
    pub result: Option<ResultSummary>,
    /// Error message, only when failed or cancelled.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleState;
    use crate::solver::SolveStats;

    fn request() -> JobRequest {
        JobRequest {
            semester: "F26".into(),
            sections: Vec::new(),
            store: ConstraintStore::new("F26"),
            strategy: Strategy::Greedy,
            budget: SolveBudget::unlimited(),
        }
    }

    fn outcome() -> SolveOutcome {
        SolveOutcome {
            state: ScheduleState::new("F26"),
            conflicts: Vec::new(),
            stats: SolveStats {
                strategy: "greedy".into(),
                termination: Termination::Completed,
                iterations: 0,
                elapsed_ms: 0,
                hard_conflicts: 0,
                soft_penalty: 0.0,
                unresolved: Vec::new(),
            },
        }
    }

    #[test]
    fn test_terminal_states_stick() {
        let mut job = SchedulingJob::new(request());
        assert!(job.set_status(JobStatus::Running));
        job.complete(outcome());
        assert_eq!(job.status(), JobStatus::Completed);

        job.mark_cancelled();
        job.fail(EngineError::Cancelled);
        assert_eq!(job.status(), JobStatus::Completed);
        assert!(job.error().is_none());
        assert!(job.outcome().is_some());
    }

    #[test]
    fn test_result_xor_error() {
        let mut cancelled = SchedulingJob::new(request());
        cancelled.mark_cancelled();
        let snap = cancelled.snapshot();
        assert_eq!(snap.status, JobStatus::Cancelled);
        assert!(snap.result.is_none());
        assert_eq!(snap.error.as_deref(), Some("cancelled"));

        let mut done = SchedulingJob::new(request());
        done.set_status(JobStatus::Running);
        done.complete(outcome());
        let snap = done.snapshot();
        assert!(snap.result.is_some());
        assert!(snap.error.is_none());
        assert!(snap.finished_at.is_some());
    }

    #[test]
    fn test_progress_only_while_running() {
        let mut job = SchedulingJob::new(request());
        assert!(job.snapshot().progress.is_none());
        job.set_status(JobStatus::Running);
        assert!(job.snapshot().progress.is_some());
    }

    #[test]
    fn test_status_channel_follows() {
        let mut job = SchedulingJob::new(request());
        let rx = job.status_tx.subscribe();
        job.set_status(JobStatus::Running);
        assert_eq!(*rx.borrow(), JobStatus::Running);
    }
}
