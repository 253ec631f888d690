//! Input validation for timetabling problems.
//!
//! Checks structural integrity of sections, resources and the time grid
//! before scheduling. Detects:
//! - Duplicate section IDs, or section IDs containing `:`
//! - Sections referencing unknown teachers
//! - Blackout calendars keyed to unknown teachers or classrooms
//! - Empty or malformed time grids
//! - Week ranges that are inverted or fall outside the semester
//! - Sections belonging to another semester
//! - Assignments referencing unknown sections, classrooms or slots
//!
//! Overlaps and capacity mismatches are not validation errors; they are
//! reported as conflicts by [`crate::detection`].

use std::collections::HashSet;

use crate::constraints::ConstraintStore;
use crate::models::{Assignment, Section};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An ID contains the `:` separator of conflict IDs.
    InvalidId,
    /// A section references a teacher that doesn't exist.
    UnknownTeacher,
    /// An assignment references a classroom that doesn't exist.
    UnknownClassroom,
    /// An assignment references a section that doesn't exist.
    UnknownSection,
    /// An assignment references a slot ordinal outside the grid.
    UnknownSlot,
    /// A week range is inverted or lies outside the semester.
    InvalidWeekRange,
    /// A section belongs to a different semester than the store.
    SemesterMismatch,
    /// The store has no time slots.
    EmptyTimeGrid,
    /// A slot has an invalid day or its start is not before its end.
    MalformedSlot,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates the input of a scheduling run.
///
/// Checks:
/// 1. The time grid is non-empty and every slot is well formed
/// 2. No duplicate section IDs
/// 3. Every section's teacher exists in the store
/// 4. Every section's weeks are valid and inside the semester
/// 5. Every section belongs to the store's semester (empty = inherit)
/// 6. Blackout entries name known teachers and classrooms
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(sections: &[Section], store: &ConstraintStore) -> ValidationResult {
    let mut errors = Vec::new();

    if store.time_slots().is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyTimeGrid,
            format!("Semester '{}' has no time slots", store.semester),
        ));
    }
    for slot in store.time_slots() {
        if !slot.is_well_formed() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedSlot,
                format!("Time slot {} is malformed", slot.ordinal),
            ));
        }
    }

    let mut section_ids = HashSet::new();
    for s in sections {
        if !section_ids.insert(s.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate section ID: {}", s.id),
            ));
        }

        if s.id.contains(':') {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidId,
                format!("Section ID '{}' contains ':'", s.id),
            ));
        }

        if store.teacher(&s.teacher_id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTeacher,
                format!("Section '{}' references unknown teacher '{}'", s.id, s.teacher_id),
            ));
        }

        if !s.weeks.is_valid() || !store.weeks.covers(&s.weeks) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWeekRange,
                format!(
                    "Section '{}' weeks {}..{} outside semester {}..{}",
                    s.id, s.weeks.start, s.weeks.end, store.weeks.start, store.weeks.end
                ),
            ));
        }

        if !s.semester.is_empty() && s.semester != store.semester {
            errors.push(ValidationError::new(
                ValidationErrorKind::SemesterMismatch,
                format!(
                    "Section '{}' belongs to '{}', not '{}'",
                    s.id, s.semester, store.semester
                ),
            ));
        }
    }

    for teacher_id in store.blackout_teacher_ids() {
        if store.teacher(teacher_id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTeacher,
                format!("Blackout references unknown teacher '{teacher_id}'"),
            ));
        }
    }
    for classroom_id in store.blackout_classroom_ids() {
        if store.classroom(classroom_id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownClassroom,
                format!("Blackout references unknown classroom '{classroom_id}'"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates one manually entered assignment against the known sections
/// and the store.
///
/// The assignment's week range only needs to be well formed; it may
/// differ from the section's default weeks.
pub fn validate_assignment<'a>(
    assignment: &Assignment,
    mut sections: impl Iterator<Item = &'a Section>,
    store: &ConstraintStore,
) -> ValidationResult {
    let mut errors = Vec::new();

    if !sections.any(|s| s.id == assignment.section_id) {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnknownSection,
            format!("Unknown section '{}'", assignment.section_id),
        ));
    }
    if store.classroom(&assignment.classroom_id).is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnknownClassroom,
            format!(
                "Section '{}' assigned to unknown classroom '{}'",
                assignment.section_id, assignment.classroom_id
            ),
        ));
    }
    if store.slot(assignment.time_slot.ordinal).is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnknownSlot,
            format!(
                "Section '{}' assigned to unknown slot {}",
                assignment.section_id, assignment.time_slot.ordinal
            ),
        ));
    }
    if !assignment.week_range.is_valid() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidWeekRange,
            format!(
                "Section '{}' has inverted weeks {}..{}",
                assignment.section_id, assignment.week_range.start, assignment.week_range.end
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classroom, Teacher, WeekRange};

    fn sample_store() -> ConstraintStore {
        ConstraintStore::new("F26")
            .with_weeks(WeekRange::new(1, 18))
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("R1", 40))
            .with_slots(ConstraintStore::weekly_grid(5, 4, 8, 2))
    }

    fn sample_sections() -> Vec<Section> {
        vec![
            Section::new("S1", "T1").with_capacity(30),
            Section::new("S2", "T2").with_capacity(25).with_semester("F26"),
        ]
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_sections(), &sample_store()).is_ok());
    }

    #[test]
    fn test_duplicate_section_id() {
        let sections = vec![Section::new("S1", "T1"), Section::new("S1", "T2")];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("S1")));
    }

    #[test]
    fn test_unknown_teacher() {
        let sections = vec![Section::new("S1", "NOBODY")];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownTeacher));
    }

    #[test]
    fn test_week_range_outside_semester() {
        let sections = vec![Section::new("S1", "T1").with_weeks(WeekRange::new(10, 20))];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidWeekRange));
    }

    #[test]
    fn test_inverted_week_range() {
        let sections = vec![Section::new("S1", "T1").with_weeks(WeekRange::new(8, 4))];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidWeekRange);
    }

    #[test]
    fn test_semester_mismatch() {
        let sections = vec![Section::new("S1", "T1").with_semester("S27")];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::SemesterMismatch));
    }

    #[test]
    fn test_empty_time_grid() {
        let store = ConstraintStore::new("F26").with_teacher(Teacher::new("T1"));
        let errors = validate_input(&[Section::new("S1", "T1")], &store).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptyTimeGrid));
    }

    #[test]
    fn test_multiple_errors() {
        let sections = vec![
            Section::new("S1", "X"),
            Section::new("S1", "T1").with_weeks(WeekRange::new(3, 1)),
        ];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn test_blackouts_for_unknown_resources() {
        let store = sample_store()
            .with_teacher_blackout("T9", 0)
            .with_room_blackout("R9", WeekRange::new(1, 2));
        let errors = validate_input(&sample_sections(), &store).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownTeacher && e.message.contains("T9")));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownClassroom && e.message.contains("R9")));
    }

    #[test]
    fn test_colon_in_section_id() {
        // "a:b"/"c" and "a"/"b:c" would share the conflict ID "teacher:a:b:c"
        let sections = vec![Section::new("a:b", "T1"), Section::new("c", "T1")];
        let errors = validate_input(&sections, &sample_store()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidId);
    }

    #[test]
    fn test_validate_assignment() {
        let store = sample_store();
        let sections = sample_sections();
        let slot = *store.slot(0).unwrap();

        let ok = Assignment::new("S1", "R1", slot, WeekRange::new(1, 16));
        assert!(validate_assignment(&ok, sections.iter(), &store).is_ok());

        let bad = Assignment::new("S9", "R9", slot, WeekRange::new(5, 1));
        let errors = validate_assignment(&bad, sections.iter(), &store).unwrap_err();
        let kinds: Vec<_> = errors.iter().map(|e| e.kind.clone()).collect();
        assert!(kinds.contains(&ValidationErrorKind::UnknownSection));
        assert!(kinds.contains(&ValidationErrorKind::UnknownClassroom));
        assert!(kinds.contains(&ValidationErrorKind::InvalidWeekRange));
    }

    #[test]
    fn test_validate_assignment_unknown_slot() {
        let store = sample_store();
        let sections = sample_sections();
        let mut slot = *store.slot(0).unwrap();
        slot.ordinal = 999;
        let a = Assignment::new("S1", "R1", slot, WeekRange::new(1, 16));
        let errors = validate_assignment(&a, sections.iter(), &store).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::UnknownSlot);
    }
}
