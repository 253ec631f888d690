//! Engine facade.
//!
//! [`TimetableEngine`] holds, per semester, the constraint store, the
//! sections and the manually maintained working schedule, and exposes
//! the operations a front end calls:
//!
//! | Operation | Method |
//! |-----------|--------|
//! | Start auto-scheduling | [`TimetableEngine::submit_job`] |
//! | Job status / cancel | [`TimetableEngine::job_status`], [`TimetableEngine::cancel_job`] |
//! | Validate the schedule | [`TimetableEngine::conflicts`] |
//! | Suggest / apply a fix | [`TimetableEngine::suggest`], [`TimetableEngine::resolve`] |
//! | Manual edits | [`TimetableEngine::assign`], [`TimetableEngine::unassign`] |
//! | Adopt a job result | [`TimetableEngine::apply_job_result`] |
//!
//! Jobs run on a snapshot of the semester taken at submission, so
//! constraint updates never race with a running solver.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::advisor::{Advisor, Suggestion};
use crate::config::EngineConfig;
use crate::constraints::{ConstraintStore, SoftWeights};
use crate::detection::{detect, validate_state, SectionIndex};
use crate::error::{EngineError, EngineResult};
use crate::jobs::{JobManager, JobRequest, JobSnapshot, JobStatus};
use crate::kpi::ScheduleKpi;
use crate::models::{Assignment, Conflict, ScheduleState, Section};
use crate::solver::{SolveBudget, Strategy, UnknownStrategy};
use crate::validation::{validate_assignment, validate_input};

/// Auto-scheduling request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    /// Semester to schedule.
    pub semester: String,
    /// Sections to place; empty = every section of the semester.
    #[serde(default)]
    pub section_ids: Vec<String>,
    /// Algorithm.
    pub strategy: Strategy,
    /// Soft weights for this run only.
    #[serde(default)]
    pub weights: Option<SoftWeights>,
    /// Search limits; `None` = the configured default.
    #[serde(default)]
    pub budget: Option<SolveBudget>,
}

impl JobParams {
    /// Schedules every section of a semester.
    pub fn new(semester: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            semester: semester.into(),
            section_ids: Vec::new(),
            strategy,
            weights: None,
            budget: None,
        }
    }

    /// Restricts the run to some sections.
    pub fn with_sections<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.section_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the soft weights.
    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Overrides the budget.
    pub fn with_budget(mut self, budget: SolveBudget) -> Self {
        self.budget = Some(budget);
        self
    }
}

#[derive(Debug)]
struct Semester {
    store: ConstraintStore,
    sections: Vec<Section>,
    state: ScheduleState,
}

impl Semester {
    fn index(&self) -> SectionIndex<'_> {
        SectionIndex::new(&self.sections, &self.store)
    }

    fn conflicts(&self) -> EngineResult<Vec<Conflict>> {
        validate_state(&self.state, &self.index())
    }

    fn find_conflict(&self, conflict_id: &str) -> EngineResult<Conflict> {
        self.conflicts()?
            .into_iter()
            .find(|c| c.id() == conflict_id)
            .ok_or_else(|| EngineError::UnknownConflict(conflict_id.to_string()))
    }

    /// Checks a manual assignment and snaps its slot to the grid.
    fn normalize(&self, mut assignment: Assignment) -> EngineResult<Assignment> {
        validate_assignment(&assignment, self.sections.iter(), &self.store)?;
        if let Some(slot) = self.store.slot(assignment.time_slot.ordinal) {
            assignment.time_slot = *slot;
        }
        Ok(assignment)
    }

    /// Drops assignments the current sections and store no longer accept
    /// and re-snaps the rest to the grid. Returns the dropped section IDs.
    fn reconcile(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        for assignment in self.state.to_vec() {
            let section_id = assignment.section_id.clone();
            match self.normalize(assignment) {
                Ok(snapped) => {
                    self.state.insert(snapped);
                }
                Err(_) => {
                    self.state.remove(&section_id);
                    dropped.push(section_id);
                }
            }
        }
        dropped
    }
}

/// Timetable engine over any number of semesters.
#[derive(Debug)]
pub struct TimetableEngine {
    config: EngineConfig,
    jobs: JobManager,
    semesters: RwLock<HashMap<String, Semester>>,
}

impl Default for TimetableEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TimetableEngine {
    /// Creates an engine.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            jobs: JobManager::new(config.max_concurrent_jobs),
            config,
            semesters: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The job manager.
    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    /// Registers or replaces a semester's constraints and sections.
    ///
    /// Assignments that still reference a known section, classroom and
    /// slot are kept; the others are dropped.
    ///
    /// # Errors
    /// `Validation` if the sections don't fit the store.
    pub fn load_semester(&self, store: ConstraintStore, sections: Vec<Section>) -> EngineResult<()> {
        validate_input(&sections, &store)?;
        let key = store.semester.clone();
        let mut semesters = self.semesters.write();
        let state = semesters
            .remove(&key)
            .map_or_else(|| ScheduleState::new(key.clone()), |s| s.state);
        let mut semester = Semester { store, sections, state };
        let dropped = semester.reconcile();
        info!(
            semester = %key,
            sections = semester.sections.len(),
            kept = semester.state.len(),
            dropped = dropped.len(),
            "semester loaded"
        );
        semesters.insert(key, semester);
        Ok(())
    }

    /// Replaces a semester's constraints. Running jobs keep their snapshot.
    ///
    /// Returns the sections whose assignment referenced a classroom or
    /// slot the new store no longer has; those assignments are dropped.
    pub fn update_constraints(&self, store: ConstraintStore) -> EngineResult<Vec<String>> {
        let mut semesters = self.semesters.write();
        let semester = semesters
            .get_mut(&store.semester)
            .ok_or_else(|| EngineError::UnknownSemester(store.semester.clone()))?;
        validate_input(&semester.sections, &store)?;
        semester.store = store;
        let dropped = semester.reconcile();
        if !dropped.is_empty() {
            warn!(
                semester = %semester.store.semester,
                sections = ?dropped,
                "assignments dropped after constraint update"
            );
        }
        Ok(dropped)
    }

    /// Resolves a strategy name, using the configured GA settings for
    /// `genetic`.
    pub fn strategy_named(&self, name: &str) -> Result<Strategy, UnknownStrategy> {
        match name.parse::<Strategy>()? {
            Strategy::Genetic(_) => Ok(Strategy::Genetic(self.config.genetic.clone())),
            other => Ok(other),
        }
    }

    /// Starts an auto-scheduling job.
    ///
    /// # Errors
    /// `UnknownSemester`, `UnknownSection`, or whatever
    /// [`JobManager::submit`] rejects.
    pub fn submit_job(&self, params: JobParams) -> EngineResult<Uuid> {
        let request = {
            let semesters = self.semesters.read();
            let semester = semesters
                .get(&params.semester)
                .ok_or_else(|| EngineError::UnknownSemester(params.semester.clone()))?;

            let sections = if params.section_ids.is_empty() {
                semester.sections.clone()
            } else {
                let index = semester.index();
                params.section_ids
                    .iter()
                    .map(|id| index.section(id).cloned())
                    .collect::<EngineResult<Vec<Section>>>()?
            };
            let mut store = semester.store.clone();
            if let Some(weights) = params.weights {
                store.set_weights(weights);
            }
            JobRequest {
                semester: params.semester,
                sections,
                store,
                strategy: params.strategy,
                budget: params.budget.unwrap_or(self.config.default_budget),
            }
        };
        self.jobs.submit(request)
    }

    /// Status, progress and result summary of a job.
    pub fn job_status(&self, job_id: Uuid) -> EngineResult<JobSnapshot> {
        self.jobs.status(job_id)
    }

    /// Cancels a job; no-op if it already ended.
    pub fn cancel_job(&self, job_id: Uuid) -> EngineResult<JobStatus> {
        self.jobs.cancel(job_id)
    }

    /// Forgets a finished job and its result.
    pub fn remove_job(&self, job_id: Uuid) -> EngineResult<JobSnapshot> {
        self.jobs.remove(job_id)
    }

    /// Waits for a job to end.
    pub async fn wait_job(&self, job_id: Uuid) -> EngineResult<JobSnapshot> {
        self.jobs.wait(job_id).await
    }

    /// Copy of a semester's working schedule.
    pub fn schedule(&self, semester: &str) -> EngineResult<ScheduleState> {
        self.with_semester(semester, |s| Ok(s.state.clone()))
    }

    /// Validates a semester's working schedule.
    pub fn conflicts(&self, semester: &str) -> EngineResult<Vec<Conflict>> {
        self.with_semester(semester, Semester::conflicts)
    }

    /// Quality metrics of a semester's working schedule.
    pub fn kpi(&self, semester: &str) -> EngineResult<ScheduleKpi> {
        self.with_semester(semester, |s| {
            let conflicts = s.conflicts()?;
            Ok(ScheduleKpi::calculate(&s.state, &s.sections, &s.store, &conflicts))
        })
    }

    /// Ranked alternatives for a conflict of the working schedule.
    ///
    /// # Errors
    /// `UnknownConflict` if the conflict is not (or no longer) present.
    pub fn suggest(&self, semester: &str, conflict_id: &str) -> EngineResult<Vec<Suggestion>> {
        let advisor = Advisor::new(self.config.advisor_top_k);
        self.with_semester(semester, |s| {
            let conflict = s.find_conflict(conflict_id)?;
            advisor.suggest(&conflict, &s.state, &s.index())
        })
    }

    /// Applies a chosen assignment to a conflict and returns the updated
    /// conflict list, which may still contain conflicts.
    ///
    /// # Errors
    /// - `UnknownConflict` if the conflict is not present
    /// - `InvalidSuggestion` if the choice does not move one of its sections
    /// - `Validation` if the choice references unknown resources
    pub fn resolve(&self, semester: &str, conflict_id: &str, chosen: Assignment) -> EngineResult<Vec<Conflict>> {
        self.with_semester_mut(semester, |s| {
            let conflict = s.find_conflict(conflict_id)?;
            let chosen = s.normalize(chosen)?;
            Advisor::check_choice(&conflict, &chosen, &s.state)?;
            info!(semester = %s.store.semester, conflict = conflict_id, section = %chosen.section_id, "conflict resolved");
            s.state.insert(chosen);
            s.conflicts()
        })
    }

    /// Places or moves a section and returns the conflicts it now has.
    pub fn assign(&self, semester: &str, assignment: Assignment) -> EngineResult<Vec<Conflict>> {
        self.with_semester_mut(semester, |s| {
            let assignment = s.normalize(assignment)?;
            let conflicts = detect(&assignment, s.state.iter(), &s.index())?;
            debug!(section = %assignment.section_id, conflicts = conflicts.len(), "manual assignment");
            s.state.insert(assignment);
            Ok(conflicts)
        })
    }

    /// Removes a section's assignment.
    pub fn unassign(&self, semester: &str, section_id: &str) -> EngineResult<Option<Assignment>> {
        self.with_semester_mut(semester, |s| {
            s.index().section(section_id)?;
            Ok(s.state.remove(section_id))
        })
    }

    /// Copies a completed job's assignments into the working schedule.
    ///
    /// Only the job's sections change: placed ones take the job's
    /// assignment, unplaced ones lose theirs. Returns the updated
    /// conflict list.
    ///
    /// # Errors
    /// `JobNotCompleted` unless the job completed.
    pub fn apply_job_result(&self, job_id: Uuid) -> EngineResult<Vec<Conflict>> {
        let outcome = self.jobs.result(job_id)?;
        let request = self.jobs.request(job_id)?;
        self.with_semester_mut(&request.semester, |s| {
            for section in &request.sections {
                if !s.sections.iter().any(|x| x.id == section.id) {
                    continue;
                }
                match outcome.state.get(&section.id) {
                    Some(a) => {
                        s.state.insert(a.clone());
                    }
                    None => {
                        s.state.remove(&section.id);
                    }
                }
            }
            info!(job_id = %job_id, semester = %request.semester, "job result applied");
            s.conflicts()
        })
    }

    fn with_semester<T>(&self, semester: &str, f: impl FnOnce(&Semester) -> EngineResult<T>) -> EngineResult<T> {
        let semesters = self.semesters.read();
        let s = semesters
            .get(semester)
            .ok_or_else(|| EngineError::UnknownSemester(semester.to_string()))?;
        f(s)
    }

    fn with_semester_mut<T>(
        &self,
        semester: &str,
        f: impl FnOnce(&mut Semester) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut semesters = self.semesters.write();
        let s = semesters
            .get_mut(semester)
            .ok_or_else(|| EngineError::UnknownSemester(semester.to_string()))?;
        f(s)
    }
}
