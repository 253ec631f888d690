//! Lookup structures shared by conflict queries.

use std::collections::HashMap;

use crate::constraints::ConstraintStore;
use crate::error::{EngineError, EngineResult};
use crate::models::{Assignment, Classroom, ScheduleState, Section};

/// Resolves the section and classroom behind an assignment.
#[derive(Debug, Clone)]
pub struct SectionIndex<'a> {
    sections: HashMap<&'a str, &'a Section>,
    store: &'a ConstraintStore,
}

impl<'a> SectionIndex<'a> {
    /// Indexes sections against a constraint store.
    pub fn new(sections: impl IntoIterator<Item = &'a Section>, store: &'a ConstraintStore) -> Self {
        Self {
            sections: sections.into_iter().map(|s| (s.id.as_str(), s)).collect(),
            store,
        }
    }

    /// Looks up a section.
    pub fn section(&self, id: &str) -> EngineResult<&'a Section> {
        self.sections
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownSection(id.to_string()))
    }

    /// Looks up a classroom.
    pub fn classroom(&self, id: &str) -> EngineResult<&'a Classroom> {
        self.store
            .classroom(id)
            .ok_or_else(|| EngineError::UnknownClassroom(id.to_string()))
    }

    /// The backing store.
    pub fn store(&self) -> &'a ConstraintStore {
        self.store
    }

    /// Section lookup map.
    pub fn sections(&self) -> &HashMap<&'a str, &'a Section> {
        &self.sections
    }

    /// Number of indexed sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether no section is indexed.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// A resource an assignment occupies at its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ResourceKey<'a> {
    Teacher(&'a str),
    Room(&'a str),
    Group(&'a str),
}

/// Resources held by one assignment.
pub(crate) fn resource_keys<'a>(
    section: &'a Section,
    assignment: &'a Assignment,
) -> impl Iterator<Item = ResourceKey<'a>> {
    let group = section
        .has_group()
        .then_some(ResourceKey::Group(section.student_group_id.as_str()));
    [
        Some(ResourceKey::Teacher(section.teacher_id.as_str())),
        Some(ResourceKey::Room(assignment.classroom_id.as_str())),
        group,
    ]
    .into_iter()
    .flatten()
}

/// Assignments of a schedule bucketed by (resource, slot ordinal).
///
/// Built once in O(n), then answers "what would this candidate conflict
/// with" by looking at three buckets instead of the whole schedule.
/// Used for repeated queries against one state (resolution advice,
/// manual edits).
#[derive(Debug, Clone)]
pub struct ConflictIndex<'a> {
    index: &'a SectionIndex<'a>,
    buckets: HashMap<(ResourceKey<'a>, u32), Vec<&'a Assignment>>,
}

impl<'a> ConflictIndex<'a> {
    /// Buckets every assignment of a state.
    ///
    /// # Errors
    /// `UnknownSection` if an assignment references an unindexed section.
    pub fn build(state: &'a ScheduleState, index: &'a SectionIndex<'a>) -> EngineResult<Self> {
        let mut buckets: HashMap<(ResourceKey<'a>, u32), Vec<&'a Assignment>> = HashMap::new();
        for a in state.iter() {
            let section = index.section(&a.section_id)?;
            for key in resource_keys(section, a) {
                buckets.entry((key, a.time_slot.ordinal)).or_default().push(a);
            }
        }
        Ok(Self { index, buckets })
    }

    /// Conflicts the candidate would have against the indexed state,
    /// ignoring the candidate's own section.
    ///
    /// Returns the same list, in the same order, as
    /// [`super::detect`] over the state's other assignments.
    pub fn detect(&self, candidate: &Assignment) -> EngineResult<Vec<super::Conflict>> {
        let section = self.index.section(&candidate.section_id)?;
        let room = self.index.classroom(&candidate.classroom_id)?;

        let mut conflicts = Vec::new();
        if !room.fits(section.required_capacity) {
            conflicts.push(super::Conflict::capacity_exceeded(candidate.clone()));
        }

        for key in resource_keys(section, candidate) {
            let Some(bucket) = self.buckets.get(&(key, candidate.time_slot.ordinal)) else {
                continue;
            };
            for other in bucket {
                if other.section_id == candidate.section_id
                    || !other.week_range.overlaps(&candidate.week_range)
                {
                    continue;
                }
                conflicts.push(super::Conflict::pair(
                    kind_of(key),
                    candidate.clone(),
                    (*other).clone(),
                ));
            }
        }

        super::sort_for_candidate(&mut conflicts);
        Ok(conflicts)
    }

    /// Number of new hard conflicts the candidate would introduce.
    pub fn count(&self, candidate: &Assignment) -> EngineResult<usize> {
        self.detect(candidate).map(|c| c.len())
    }
}

pub(crate) fn kind_of(key: ResourceKey<'_>) -> super::ConflictKind {
    match key {
        ResourceKey::Teacher(_) => super::ConflictKind::TeacherDoubleBook,
        ResourceKey::Room(_) => super::ConflictKind::RoomDoubleBook,
        ResourceKey::Group(_) => super::ConflictKind::StudentGroupOverlap,
    }
}
