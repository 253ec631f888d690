//! Engine error types.
//!
//! Only structural problems are errors. Overlaps and capacity mismatches
//! are reported as [`crate::models::Conflict`] values.

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Errors surfaced by the engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Constraints leave at least one section without any compatible
    /// (classroom, slot) pair. Fatal: the run never starts.
    #[error("invalid constraints: {}", sections_without_candidates.join(", "))]
    InvalidConstraints {
        /// Sections with no compatible candidate.
        sections_without_candidates: Vec<String>,
    },

    /// The search ended with hard conflicts or unplaced sections remaining.
    #[error("infeasible: {hard_conflicts} hard conflicts remain, {unplaced} sections unplaced")]
    Infeasible { hard_conflicts: usize, unplaced: usize },

    /// The run was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// A solver defect. The job is marked failed and its input kept for retry.
    #[error("internal solver error: {0}")]
    InternalSolverError(String),

    /// Input failed structural validation.
    #[error("input validation failed ({} errors)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("unknown classroom: {0}")]
    UnknownClassroom(String),

    #[error("unknown teacher: {0}")]
    UnknownTeacher(String),

    #[error("unknown semester: {0}")]
    UnknownSemester(String),

    #[error("unknown job: {0}")]
    UnknownJob(Uuid),

    #[error("unknown conflict: {0}")]
    UnknownConflict(String),

    /// A chosen assignment does not address the conflict it was applied to.
    #[error("suggestion does not apply to conflict '{conflict_id}': {reason}")]
    InvalidSuggestion { conflict_id: String, reason: String },

    /// The job has not reached `Completed`.
    #[error("job {0} has no result")]
    JobNotCompleted(Uuid),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<Vec<ValidationError>> for EngineError {
    fn from(errors: Vec<ValidationError>) -> Self {
        EngineError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_invalid_constraints_message() {
        let e = EngineError::InvalidConstraints {
            sections_without_candidates: vec!["S1".into(), "S2".into()],
        };
        assert_eq!(e.to_string(), "invalid constraints: S1, S2");
    }

    #[test]
    fn test_validation_from_vec() {
        let errs = vec![ValidationError::new(ValidationErrorKind::DuplicateId, "dup")];
        let e: EngineError = errs.into();
        assert!(matches!(e, EngineError::Validation(ref v) if v.len() == 1));
        assert!(e.to_string().contains("1 errors"));
    }
}
