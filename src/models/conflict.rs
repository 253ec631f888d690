//! Conflict model.
//!
//! A conflict is a hard-constraint violation derived from an assignment
//! set. It is recomputed on demand and never stored independently of the
//! assignments that produced it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Assignment;

/// Classification of hard-constraint violations.
///
/// The declaration order is the sort order of conflict lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Same teacher, same slot, overlapping weeks.
    TeacherDoubleBook,
    /// Same classroom, same slot, overlapping weeks.
    RoomDoubleBook,
    /// Section needs more seats than the classroom has.
    CapacityExceeded,
    /// Same student group, same slot, overlapping weeks.
    StudentGroupOverlap,
}

impl ConflictKind {
    /// Stable identifier used in conflict IDs.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::TeacherDoubleBook => "teacher",
            Self::RoomDoubleBook => "room",
            Self::CapacityExceeded => "capacity",
            Self::StudentGroupOverlap => "group",
        }
    }

    /// Parses a slug produced by [`ConflictKind::slug`].
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "teacher" => Some(Self::TeacherDoubleBook),
            "room" => Some(Self::RoomDoubleBook),
            "capacity" => Some(Self::CapacityExceeded),
            "group" => Some(Self::StudentGroupOverlap),
            _ => None,
        }
    }

    /// Default severity (0-100, higher = worse).
    pub fn severity(&self) -> i32 {
        match self {
            Self::TeacherDoubleBook => 95,
            Self::StudentGroupOverlap => 90,
            Self::RoomDoubleBook => 85,
            Self::CapacityExceeded => 70,
        }
    }

    /// Whether the conflict involves two assignments.
    pub fn is_pairwise(&self) -> bool {
        !matches!(self, Self::CapacityExceeded)
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TeacherDoubleBook => "TeacherDoubleBook",
            Self::RoomDoubleBook => "RoomDoubleBook",
            Self::CapacityExceeded => "CapacityExceeded",
            Self::StudentGroupOverlap => "StudentGroupOverlap",
        };
        f.write_str(s)
    }
}

/// A hard-constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Type of violation.
    pub kind: ConflictKind,
    /// The assignment the conflict is reported for.
    pub assignment_a: Assignment,
    /// The other assignment involved (`None` for capacity conflicts).
    pub assignment_b: Option<Assignment>,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

impl Conflict {
    /// Creates a conflict between two assignments.
    pub fn pair(kind: ConflictKind, a: Assignment, b: Assignment) -> Self {
        Self {
            kind,
            assignment_a: a,
            assignment_b: Some(b),
            severity: kind.severity(),
        }
    }

    /// Creates a capacity conflict for a single assignment.
    pub fn capacity_exceeded(a: Assignment) -> Self {
        Self {
            kind: ConflictKind::CapacityExceeded,
            assignment_a: a,
            assignment_b: None,
            severity: ConflictKind::CapacityExceeded.severity(),
        }
    }

    /// Section ID of the other assignment, if any.
    pub fn other_section(&self) -> Option<&str> {
        self.assignment_b.as_ref().map(|b| b.section_id.as_str())
    }

    /// Section IDs involved, in ascending order.
    pub fn sections(&self) -> Vec<&str> {
        let mut ids = vec![self.assignment_a.section_id.as_str()];
        if let Some(b) = &self.assignment_b {
            ids.push(b.section_id.as_str());
        }
        ids.sort_unstable();
        ids
    }

    /// Whether the conflict involves a section.
    pub fn involves(&self, section_id: &str) -> bool {
        self.assignment_a.section_id == section_id || self.other_section() == Some(section_id)
    }

    /// Stable identifier: `kind:sectionA[:sectionB]` with sections ascending.
    ///
    /// Unambiguous because validated section IDs never contain `:`.
    pub fn id(&self) -> String {
        let mut id = String::from(self.kind.slug());
        for s in self.sections() {
            id.push(':');
            id.push_str(s);
        }
        id
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.assignment_b {
            Some(b) => write!(
                f,
                "{} between '{}' and '{}' at slot {}",
                self.kind, self.assignment_a.section_id, b.section_id, self.assignment_a.time_slot.ordinal
            ),
            None => write!(
                f,
                "{} for '{}' in room '{}'",
                self.kind, self.assignment_a.section_id, self.assignment_a.classroom_id
            ),
        }
    }
}
