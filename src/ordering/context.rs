//! Precomputed data for ordering rule evaluation.

use std::collections::HashMap;

/// Per-run statistics passed to ordering rules.
#[derive(Debug, Clone, Default)]
pub struct OrderingContext {
    /// Compatible (classroom, slot) pairs per section.
    pub candidate_counts: HashMap<String, usize>,
    /// Sections taught per teacher.
    pub teacher_load: HashMap<String, usize>,
    /// Sections attended per student group.
    pub group_load: HashMap<String, usize>,
}

impl OrderingContext {
    /// Sets the candidate count of a section.
    pub fn with_candidates(mut self, section_id: impl Into<String>, count: usize) -> Self {
        self.candidate_counts.insert(section_id.into(), count);
        self
    }

    /// Sets the load of a teacher.
    pub fn with_teacher_load(mut self, teacher_id: impl Into<String>, load: usize) -> Self {
        self.teacher_load.insert(teacher_id.into(), load);
        self
    }

    /// Sets the load of a student group.
    pub fn with_group_load(mut self, group_id: impl Into<String>, load: usize) -> Self {
        self.group_load.insert(group_id.into(), load);
        self
    }
}
