//! Resolution advice for conflicts.
//!
//! For one conflict, enumerates alternative assignments for each section
//! involved, scores every alternative against the rest of the schedule
//! and returns the best few. The schedule is never modified; applying a
//! suggestion is the caller's explicit step.
//!
//! # Ranking
//! 1. Conflicts the alternative would have (fewest first)
//! 2. Soft penalty of the alternative
//! 3. Section ID, slot ordinal, classroom ID
//!
//! Alternatives respect capacity and calendars (see
//! [`ConstraintStore::compatible_candidates`]) and keep the week range of
//! the section's current assignment.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::{ConstraintStore, SoftScorer};
use crate::detection::{ConflictIndex, SectionIndex};
use crate::error::{EngineError, EngineResult};
use crate::models::{Assignment, Conflict, ScheduleState};

/// One alternative assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Section to move.
    pub section_id: String,
    /// Proposed assignment.
    pub assignment: Assignment,
    /// Conflicts the section would have after the move.
    pub conflict_count: usize,
    /// Soft penalty of the proposed assignment.
    pub soft_score: f64,
}

impl Suggestion {
    /// Whether the move leaves the section conflict-free.
    pub fn is_clean(&self) -> bool {
        self.conflict_count == 0
    }
}

/// Ranks alternative assignments for conflicts.
#[derive(Debug, Clone, Copy)]
pub struct Advisor {
    top_k: usize,
}

impl Default for Advisor {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

impl Advisor {
    /// Creates an advisor returning at most `top_k` suggestions.
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Maximum suggestions per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Suggestions for a conflict of `state`, best first.
    ///
    /// # Errors
    /// `UnknownSection` / `UnknownClassroom` if the state references
    /// something the index doesn't know.
    pub fn suggest(
        &self,
        conflict: &Conflict,
        state: &ScheduleState,
        index: &SectionIndex<'_>,
    ) -> EngineResult<Vec<Suggestion>> {
        let store: &ConstraintStore = index.store();
        let conflicts = ConflictIndex::build(state, index)?;
        let scorer = SoftScorer::new(store);

        let mut suggestions = Vec::new();
        for section_id in conflict.sections() {
            let section = index.section(section_id)?;
            let current = state.get(section_id);
            let weeks = current.map_or(section.weeks, |a| a.week_range);

            let mut teacher_assignments = Vec::new();
            for a in state.iter() {
                if index.section(&a.section_id)?.teacher_id == section.teacher_id {
                    teacher_assignments.push(a);
                }
            }

            for (room, slot) in store.compatible_candidates(section) {
                if current.is_some_and(|a| a.classroom_id == room.id && a.time_slot == *slot) {
                    continue;
                }
                let candidate = Assignment::new(section.id.clone(), room.id.clone(), *slot, weeks);
                let conflict_count = conflicts.count(&candidate)?;
                let soft_score =
                    scorer.candidate_penalty(section, &candidate, teacher_assignments.iter().copied());
                suggestions.push(Suggestion {
                    section_id: section.id.clone(),
                    assignment: candidate,
                    conflict_count,
                    soft_score,
                });
            }
        }

        suggestions.sort_by(|a, b| {
            a.conflict_count
                .cmp(&b.conflict_count)
                .then_with(|| a.soft_score.total_cmp(&b.soft_score))
                .then_with(|| a.section_id.cmp(&b.section_id))
                .then_with(|| a.assignment.time_slot.cmp(&b.assignment.time_slot))
                .then_with(|| a.assignment.classroom_id.cmp(&b.assignment.classroom_id))
        });
        suggestions.truncate(self.top_k);
        debug!(
            conflict = %conflict.id(),
            suggestions = suggestions.len(),
            "resolution advice"
        );
        Ok(suggestions)
    }

    /// Checks that `chosen` moves one of the conflict's sections.
    ///
    /// # Errors
    /// `InvalidSuggestion` if the assignment belongs to another section
    /// or leaves the section where it already is.
    pub fn check_choice(conflict: &Conflict, chosen: &Assignment, state: &ScheduleState) -> EngineResult<()> {
        if !conflict.involves(&chosen.section_id) {
            return Err(EngineError::InvalidSuggestion {
                conflict_id: conflict.id(),
                reason: format!("section '{}' is not part of the conflict", chosen.section_id),
            });
        }
        if state.get(&chosen.section_id) == Some(chosen) {
            return Err(EngineError::InvalidSuggestion {
                conflict_id: conflict.id(),
                reason: format!("'{}' is already assigned there", chosen.section_id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::SoftWeights;
    use crate::detection::validate_state;
    use crate::models::{Classroom, Section, Teacher, WeekRange};

    fn store() -> ConstraintStore {
        ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("R1", 40))
            .with_classroom(Classroom::new("R2", 100))
            .with_slots(ConstraintStore::weekly_grid(1, 3, 8, 2))
            .with_weights(SoftWeights::none().with_morning(1.0))
    }

    fn sections() -> Vec<Section> {
        vec![
            Section::new("S1", "T1").with_capacity(30),
            Section::new("S2", "T1").with_capacity(80),
            Section::new("S3", "T2").with_capacity(30),
        ]
    }

    fn clashing_state(store: &ConstraintStore) -> ScheduleState {
        let slot1 = *store.slot(1).unwrap();
        let slot2 = *store.slot(2).unwrap();
        ScheduleState::from_assignments(
            "F26",
            vec![
                Assignment::new("S1", "R1", slot1, WeekRange::default()),
                Assignment::new("S2", "R2", slot1, WeekRange::default()),
                Assignment::new("S3", "R1", slot2, WeekRange::default()),
            ],
        )
    }

    #[test]
    fn test_suggest_ranked_by_conflicts_then_soft() {
        let store = store();
        let secs = sections();
        let index = SectionIndex::new(&secs, &store);
        let state = clashing_state(&store);
        let conflicts = validate_state(&state, &index).unwrap();
        assert_eq!(conflicts.len(), 1);

        let suggestions = Advisor::new(10).suggest(&conflicts[0], &state, &index).unwrap();
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].is_clean());
        // morning alternative for S1: R2 at slot 2 (R1 taken by S3)
        assert_eq!(suggestions[0].section_id, "S1");
        assert_eq!(suggestions[0].assignment.time_slot.ordinal, 2);
        assert_eq!(suggestions[0].assignment.classroom_id, "R2");
        assert!(suggestions
            .windows(2)
            .all(|w| w[0].conflict_count <= w[1].conflict_count));
    }

    #[test]
    fn test_suggest_respects_capacity_and_top_k() {
        let store = store();
        let secs = sections();
        let index = SectionIndex::new(&secs, &store);
        let state = clashing_state(&store);
        let conflicts = validate_state(&state, &index).unwrap();

        let suggestions = Advisor::new(2).suggest(&conflicts[0], &state, &index).unwrap();
        assert_eq!(suggestions.len(), 2);

        let all = Advisor::new(100).suggest(&conflicts[0], &state, &index).unwrap();
        // S2 needs 80 seats: never R1
        assert!(all
            .iter()
            .filter(|s| s.section_id == "S2")
            .all(|s| s.assignment.classroom_id == "R2"));
        // the current placements are not proposed
        assert!(all.iter().all(|s| Some(&s.assignment) != state.get(&s.section_id)));
    }

    #[test]
    fn test_suggest_does_not_mutate() {
        let store = store();
        let secs = sections();
        let index = SectionIndex::new(&secs, &store);
        let state = clashing_state(&store);
        let before = state.clone();
        let conflicts = validate_state(&state, &index).unwrap();
        let _ = Advisor::default().suggest(&conflicts[0], &state, &index).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_check_choice() {
        let store = store();
        let secs = sections();
        let index = SectionIndex::new(&secs, &store);
        let state = clashing_state(&store);
        let conflict = &validate_state(&state, &index).unwrap()[0];

        let slot3 = *store.slot(3).unwrap();
        let ok = Assignment::new("S1", "R1", slot3, WeekRange::default());
        assert!(Advisor::check_choice(conflict, &ok, &state).is_ok());

        let other = Assignment::new("S3", "R1", slot3, WeekRange::default());
        assert!(matches!(
            Advisor::check_choice(conflict, &other, &state),
            Err(EngineError::InvalidSuggestion { .. })
        ));

        let same = state.get("S1").unwrap().clone();
        assert!(Advisor::check_choice(conflict, &same, &state).is_err());
    }
}
