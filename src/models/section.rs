//! Section (course offering) model.
//!
//! A section is one offering of a course for a term. It needs exactly one
//! assignment: a classroom, a weekly time slot, and the weeks it meets.
//! Sections are immutable once scheduling begins; re-scheduling builds a
//! new solver input instead of mutating them.

use serde::{Deserialize, Serialize};

use super::WeekRange;

/// A course section to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Unique section identifier.
    pub id: String,
    /// Course this section belongs to.
    pub course_id: String,
    /// Owning teacher.
    pub teacher_id: String,
    /// Student group attending the section.
    pub student_group_id: String,
    /// Seats needed.
    pub required_capacity: u32,
    /// Semester (term) identifier.
    pub semester: String,
    /// Weeks the section meets.
    pub weeks: WeekRange,
}

impl Section {
    /// Creates a section with an empty course, group and semester and a
    /// 16-week default range.
    pub fn new(id: impl Into<String>, teacher_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            course_id: String::new(),
            teacher_id: teacher_id.into(),
            student_group_id: String::new(),
            required_capacity: 0,
            semester: String::new(),
            weeks: WeekRange::new(1, 16),
        }
    }

    /// Sets the course.
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = course_id.into();
        self
    }

    /// Sets the student group.
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.student_group_id = group_id.into();
        self
    }

    /// Sets the required seat count.
    pub fn with_capacity(mut self, required: u32) -> Self {
        self.required_capacity = required;
        self
    }

    /// Sets the semester.
    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = semester.into();
        self
    }

    /// Sets the weeks the section meets.
    pub fn with_weeks(mut self, weeks: WeekRange) -> Self {
        self.weeks = weeks;
        self
    }

    /// Whether the section has a student group (empty = no group clash checks).
    #[inline]
    pub fn has_group(&self) -> bool {
        !self.student_group_id.is_empty()
    }
}
