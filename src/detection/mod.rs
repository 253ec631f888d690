//! Conflict detection.
//!
//! Pure evaluators over assignments. Nothing here mutates state or
//! fails on a domain condition: overlaps and capacity mismatches come
//! back as [`Conflict`] values. Only structural problems (an assignment
//! naming an unknown section or classroom) are errors.
//!
//! # Rules
//! Two assignments collide when their slot ordinals are equal and their
//! week ranges overlap. A collision is a conflict of kind:
//! - `TeacherDoubleBook` if both sections share a teacher
//! - `RoomDoubleBook` if both use the same classroom
//! - `StudentGroupOverlap` if both sections share a (non-empty) group
//!
//! One pair may produce several kinds. `CapacityExceeded` depends only on
//! a single assignment and its classroom.
//!
//! # Complexity
//! [`validate_state`] buckets assignments by (resource, slot) and sweeps
//! each bucket in week order: O(n log n + k) for k reported conflicts.

mod index;

pub use index::{ConflictIndex, SectionIndex};

use std::collections::HashMap;

use crate::error::EngineResult;
use crate::models::{Assignment, Conflict, ConflictKind, ScheduleState};
use index::{kind_of, resource_keys, ResourceKey};

/// Conflicts introduced by `candidate` against `existing`.
///
/// Assignments of the candidate's own section in `existing` are ignored.
/// Sorted by kind, then by the other assignment's section ID.
///
/// # Errors
/// `UnknownSection` / `UnknownClassroom` if an assignment references
/// something the index doesn't know.
pub fn detect<'e>(
    candidate: &Assignment,
    existing: impl IntoIterator<Item = &'e Assignment>,
    index: &SectionIndex<'_>,
) -> EngineResult<Vec<Conflict>> {
    let section = index.section(&candidate.section_id)?;
    let room = index.classroom(&candidate.classroom_id)?;

    let mut conflicts = Vec::new();
    if !room.fits(section.required_capacity) {
        conflicts.push(Conflict::capacity_exceeded(candidate.clone()));
    }

    for other in existing {
        if other.section_id == candidate.section_id || !candidate.collides_with(other) {
            continue;
        }
        let other_section = index.section(&other.section_id)?;

        if other_section.teacher_id == section.teacher_id {
            conflicts.push(Conflict::pair(
                ConflictKind::TeacherDoubleBook,
                candidate.clone(),
                other.clone(),
            ));
        }
        if other.classroom_id == candidate.classroom_id {
            conflicts.push(Conflict::pair(
                ConflictKind::RoomDoubleBook,
                candidate.clone(),
                other.clone(),
            ));
        }
        if section.has_group() && other_section.student_group_id == section.student_group_id {
            conflicts.push(Conflict::pair(
                ConflictKind::StudentGroupOverlap,
                candidate.clone(),
                other.clone(),
            ));
        }
    }

    sort_for_candidate(&mut conflicts);
    Ok(conflicts)
}

/// Validates a whole schedule.
///
/// Each conflicting pair is reported once per kind, with `assignment_a`
/// holding the smaller section ID. Sorted by (kind, section A, section B).
/// Validating the same state twice yields identical lists.
///
/// # Errors
/// `UnknownSection` / `UnknownClassroom` for dangling references.
pub fn validate_state(state: &ScheduleState, index: &SectionIndex<'_>) -> EngineResult<Vec<Conflict>> {
    let mut conflicts = Vec::new();
    let mut buckets: HashMap<(ResourceKey<'_>, u32), Vec<&Assignment>> = HashMap::new();

    for a in state.iter() {
        let section = index.section(&a.section_id)?;
        let room = index.classroom(&a.classroom_id)?;
        if !room.fits(section.required_capacity) {
            conflicts.push(Conflict::capacity_exceeded(a.clone()));
        }
        for key in resource_keys(section, a) {
            buckets.entry((key, a.time_slot.ordinal)).or_default().push(a);
        }
    }

    for ((key, _), mut list) in buckets {
        if list.len() < 2 {
            continue;
        }
        list.sort_by_key(|a| (a.week_range.start, a.week_range.end));
        for i in 0..list.len() {
            let a = list[i];
            for b in list[i + 1..]
                .iter()
                .take_while(|b| b.week_range.start <= a.week_range.end)
            {
                let (first, second) = if a.section_id <= b.section_id {
                    (a, *b)
                } else {
                    (*b, a)
                };
                conflicts.push(Conflict::pair(kind_of(key), first.clone(), second.clone()));
            }
        }
    }

    sort_for_state(&mut conflicts);
    Ok(conflicts)
}

/// Number of hard conflicts in a schedule.
pub fn count_conflicts(state: &ScheduleState, index: &SectionIndex<'_>) -> EngineResult<usize> {
    validate_state(state, index).map(|c| c.len())
}

/// Conflicts of `state` that involve a section.
pub fn conflicts_of(
    state: &ScheduleState,
    section_id: &str,
    index: &SectionIndex<'_>,
) -> EngineResult<Vec<Conflict>> {
    let Some(a) = state.get(section_id) else {
        return Ok(Vec::new());
    };
    detect(a, state.iter(), index)
}

pub(crate) fn sort_for_candidate(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|x, y| {
        x.kind
            .cmp(&y.kind)
            .then_with(|| x.other_section().cmp(&y.other_section()))
    });
}

fn sort_for_state(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|x, y| {
        x.kind
            .cmp(&y.kind)
            .then_with(|| x.assignment_a.section_id.cmp(&y.assignment_a.section_id))
            .then_with(|| x.other_section().cmp(&y.other_section()))
    });
}
