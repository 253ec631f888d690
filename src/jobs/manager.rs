//! Bounded pool of scheduling jobs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{JobRequest, JobSnapshot, JobStatus, SchedulingJob};
use crate::error::{EngineError, EngineResult};
use crate::solver::{solve_with, SchedulingProblem, SearchControl, SolveOutcome};

/// Runs scheduling jobs on at most `max_concurrent` workers.
///
/// Jobs are submitted synchronously and run on the Tokio runtime of the
/// caller; each solver runs on the blocking pool. Excess jobs wait in
/// `Queued` until a worker frees up.
///
/// # Example
/// ```no_run
/// # async fn demo(request: u_timetable::jobs::JobRequest) -> u_timetable::error::EngineResult<()> {
/// use u_timetable::jobs::{JobManager, JobStatus};
///
/// let manager = JobManager::new(2);
/// let job_id = manager.submit(request)?;
/// let done = manager.wait(job_id).await?;
/// assert!(done.status.is_terminal());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    jobs: RwLock<HashMap<Uuid, SchedulingJob>>,
    workers: Arc<Semaphore>,
    max_concurrent: usize,
}

impl JobManager {
    /// Creates a manager running at most `max_concurrent` jobs at once
    /// (at least 1).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner: Arc::new(Inner {
                jobs: RwLock::new(HashMap::new()),
                workers: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
            }),
        }
    }

    /// Worker pool size.
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Queues a job.
    ///
    /// The input is checked before anything is queued, so a job whose
    /// constraints leave a section without candidates never exists.
    ///
    /// # Errors
    /// - `InvalidConfig` for out-of-range strategy settings
    /// - `Validation` / `InvalidConstraints` for unusable input
    /// - `InternalSolverError` when called outside a Tokio runtime
    pub fn submit(&self, request: JobRequest) -> EngineResult<Uuid> {
        request.strategy.validate()?;
        SchedulingProblem::new(&request.sections, &request.store)?;
        let handle = Handle::try_current()
            .map_err(|e| EngineError::InternalSolverError(format!("no async runtime: {e}")))?;

        let job = SchedulingJob::new(request);
        let job_id = job.id;
        info!(
            job_id = %job_id,
            semester = %job.request.semester,
            strategy = job.request.strategy.name(),
            sections = job.request.sections.len(),
            "job queued"
        );
        self.inner.jobs.write().insert(job_id, job);

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move { inner.run(job_id).await });
        Ok(job_id)
    }

    /// Current view of a job.
    pub fn status(&self, job_id: Uuid) -> EngineResult<JobSnapshot> {
        self.inner
            .jobs
            .read()
            .get(&job_id)
            .map(SchedulingJob::snapshot)
            .ok_or(EngineError::UnknownJob(job_id))
    }

    /// Requests cancellation. A queued job is cancelled at once; a running
    /// one stops at its next iteration boundary. No-op on terminal jobs.
    pub fn cancel(&self, job_id: Uuid) -> EngineResult<JobStatus> {
        let mut jobs = self.inner.jobs.write();
        let job = jobs.get_mut(&job_id).ok_or(EngineError::UnknownJob(job_id))?;
        match job.status {
            JobStatus::Queued => {
                job.cancel.cancel();
                job.mark_cancelled();
                info!(job_id = %job_id, "job cancelled while queued");
            }
            JobStatus::Running => {
                job.cancel.cancel();
                debug!(job_id = %job_id, "cancellation requested");
            }
            _ => {}
        }
        Ok(job.status)
    }

    /// Waits until the job is terminal.
    pub async fn wait(&self, job_id: Uuid) -> EngineResult<JobSnapshot> {
        let mut rx = self.subscribe(job_id)?;
        // the sender lives in the registry; an error means the job is gone
        if rx.wait_for(JobStatus::is_terminal).await.is_err() {
            return Err(EngineError::UnknownJob(job_id));
        }
        self.status(job_id)
    }

    /// Status updates of a job.
    pub fn subscribe(&self, job_id: Uuid) -> EngineResult<watch::Receiver<JobStatus>> {
        self.inner
            .jobs
            .read()
            .get(&job_id)
            .map(|job| job.status_tx.subscribe())
            .ok_or(EngineError::UnknownJob(job_id))
    }

    /// Result of a completed job.
    ///
    /// # Errors
    /// `JobNotCompleted` unless the job is `Completed`.
    pub fn result(&self, job_id: Uuid) -> EngineResult<Arc<SolveOutcome>> {
        let jobs = self.inner.jobs.read();
        let job = jobs.get(&job_id).ok_or(EngineError::UnknownJob(job_id))?;
        job.outcome
            .clone()
            .ok_or(EngineError::JobNotCompleted(job_id))
    }

    /// The input a job was submitted with.
    pub fn request(&self, job_id: Uuid) -> EngineResult<Arc<JobRequest>> {
        self.inner
            .jobs
            .read()
            .get(&job_id)
            .map(|job| Arc::clone(&job.request))
            .ok_or(EngineError::UnknownJob(job_id))
    }

    /// Submits a terminal job's original input again as a new job.
    ///
    /// # Errors
    /// `JobNotCompleted` if the job is still queued or running.
    pub fn retry(&self, job_id: Uuid) -> EngineResult<Uuid> {
        let request = {
            let jobs = self.inner.jobs.read();
            let job = jobs.get(&job_id).ok_or(EngineError::UnknownJob(job_id))?;
            if !job.status.is_terminal() {
                return Err(EngineError::JobNotCompleted(job_id));
            }
            JobRequest::clone(&job.request)
        };
        let retried = self.submit(request)?;
        info!(job_id = %retried, retry_of = %job_id, "job retried");
        Ok(retried)
    }

    /// Forgets a terminal job, releasing its input and result.
    ///
    /// # Errors
    /// `JobNotCompleted` if the job is still queued or running.
    pub fn remove(&self, job_id: Uuid) -> EngineResult<JobSnapshot> {
        let mut jobs = self.inner.jobs.write();
        let job = jobs.get(&job_id).ok_or(EngineError::UnknownJob(job_id))?;
        if !job.status.is_terminal() {
            return Err(EngineError::JobNotCompleted(job_id));
        }
        let snapshot = job.snapshot();
        jobs.remove(&job_id);
        debug!(job_id = %job_id, "job removed");
        Ok(snapshot)
    }

    /// Forgets every terminal job that finished before `cutoff`. Returns
    /// how many were removed.
    pub fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.inner.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| !(job.status.is_terminal() && job.finished_at.is_some_and(|t| t < cutoff)));
        let purged = before - jobs.len();
        if purged > 0 {
            info!(purged, remaining = jobs.len(), "finished jobs purged");
        }
        purged
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut all: Vec<JobSnapshot> = self
            .inner
            .jobs
            .read()
            .values()
            .map(SchedulingJob::snapshot)
            .collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.job_id.cmp(&b.job_id)));
        all
    }

    /// Number of jobs currently running.
    pub fn running(&self) -> usize {
        self.inner
            .jobs
            .read()
            .values()
            .filter(|job| job.status == JobStatus::Running)
            .count()
    }
}

impl Inner {
    async fn run(self: Arc<Self>, job_id: Uuid) {
        let Ok(_permit) = Arc::clone(&self.workers).acquire_owned().await else {
            self.finish(job_id, Err(EngineError::InternalSolverError("worker pool closed".into())));
            return;
        };

        let (request, cancel, progress) = {
            let mut jobs = self.jobs.write();
            let Some(job) = jobs.get_mut(&job_id) else { return };
            if job.status != JobStatus::Queued {
                return;
            }
            job.set_status(JobStatus::Running);
            (Arc::clone(&job.request), job.cancel.clone(), job.progress.clone())
        };
        info!(job_id = %job_id, strategy = request.strategy.name(), "job started");

        let token = cancel.clone();
        let joined = task::spawn_blocking(move || {
            let mut control = SearchControl::new(request.budget, token, progress);
            solve_with(&request.strategy, &request.sections, &request.store, &mut control)
        })
        .await;

        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(EngineError::InternalSolverError(format!("solver task failed: {e}"))),
        };
        if cancel.is_cancelled() {
            let mut jobs = self.jobs.write();
            if let Some(job) = jobs.get_mut(&job_id) {
                job.mark_cancelled();
            }
            info!(job_id = %job_id, "job cancelled");
            return;
        }
        self.finish(job_id, result);
    }

    fn finish(&self, job_id: Uuid, result: EngineResult<SolveOutcome>) {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(&job_id) else { return };
        match result {
            Ok(outcome) => {
                info!(
                    job_id = %job_id,
                    hard_conflicts = outcome.conflicts.len(),
                    termination = ?outcome.stats.termination,
                    elapsed_ms = outcome.stats.elapsed_ms,
                    "job completed"
                );
                job.complete(outcome);
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "job failed");
                job.fail(e);
            }
        }
    }
}
