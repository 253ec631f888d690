//! Schedule (working set) model.
//!
//! A schedule state holds at most one assignment per section for one
//! semester. It may contain conflicts; those are derived on demand by
//! [`crate::detection`], never stored alongside the assignments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{TimeSlot, WeekRange};

/// A section-classroom-time binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned section ID.
    pub section_id: String,
    /// Assigned classroom ID.
    pub classroom_id: String,
    /// Weekly time slot.
    pub time_slot: TimeSlot,
    /// Weeks the binding applies to.
    pub week_range: WeekRange,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(
        section_id: impl Into<String>,
        classroom_id: impl Into<String>,
        time_slot: TimeSlot,
        week_range: WeekRange,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            classroom_id: classroom_id.into(),
            time_slot,
            week_range,
        }
    }

    /// Whether two assignments occupy the same slot during a shared week.
    #[inline]
    pub fn collides_with(&self, other: &Self) -> bool {
        self.time_slot == other.time_slot && self.week_range.overlaps(&other.week_range)
    }
}

/// All assignments of a semester, keyed by section ID.
///
/// Iteration order is by section ID, so anything derived from the state
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Semester identifier.
    pub semester: String,
    assignments: BTreeMap<String, Assignment>,
}

impl ScheduleState {
    /// Creates an empty schedule for a semester.
    pub fn new(semester: impl Into<String>) -> Self {
        Self {
            semester: semester.into(),
            assignments: BTreeMap::new(),
        }
    }

    /// Builds a schedule from assignments. Later duplicates replace earlier ones.
    pub fn from_assignments(
        semester: impl Into<String>,
        assignments: impl IntoIterator<Item = Assignment>,
    ) -> Self {
        let mut state = Self::new(semester);
        for a in assignments {
            state.insert(a);
        }
        state
    }

    /// Inserts or replaces the assignment of a section.
    ///
    /// Returns the previous assignment, if any.
    pub fn insert(&mut self, assignment: Assignment) -> Option<Assignment> {
        self.assignments
            .insert(assignment.section_id.clone(), assignment)
    }

    /// Removes the assignment of a section.
    pub fn remove(&mut self, section_id: &str) -> Option<Assignment> {
        self.assignments.remove(section_id)
    }

    /// The assignment of a section.
    pub fn get(&self, section_id: &str) -> Option<&Assignment> {
        self.assignments.get(section_id)
    }

    /// Whether a section is assigned.
    pub fn contains(&self, section_id: &str) -> bool {
        self.assignments.contains_key(section_id)
    }

    /// Iterates assignments ordered by section ID.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    /// Clones all assignments into a vector ordered by section ID.
    pub fn to_vec(&self) -> Vec<Assignment> {
        self.assignments.values().cloned().collect()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the schedule has no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
