//! Asynchronous scheduling jobs.
//!
//! A job is one solver run over a snapshot of its input. The
//! [`JobManager`] executes jobs on a bounded worker pool, exposes
//! polled progress while a job runs, and supports cooperative
//! cancellation: the cancel flag is the one the solver's
//! [`crate::solver::SearchControl`] checks at every iteration.
//!
//! Jobs never share mutable state. Each one owns its sections and a copy
//! of the constraints taken at submission.

mod manager;
mod state;

pub use manager::JobManager;
pub use state::{JobRequest, JobSnapshot, JobStatus, ResultSummary, SchedulingJob};
