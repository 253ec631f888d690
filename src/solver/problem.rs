//! Compact solver model.
//!
//! Strategies work on indices instead of IDs: every section gets a list
//! of compatible candidates (classroom, slot), and an [`Occupancy`] keeps
//! per-(resource, slot) buckets so the cost of a tentative placement is
//! a few bucket scans.
//!
//! Candidates are compatible by construction (capacity and calendars
//! hold), so the only hard conflicts a solver can create are double
//! bookings of a teacher, a room or a student group.

use std::collections::HashMap;

use crate::constraints::{ConstraintStore, SoftWeights};
use crate::error::{EngineError, EngineResult};
use crate::models::{Assignment, Classroom, ScheduleState, Section, TimeSlot, WeekRange};
use crate::ordering::OrderingContext;
use crate::validation::validate_input;

/// One candidate placement: indices into the problem's rooms and slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Room index.
    pub room: usize,
    /// Slot index.
    pub slot: usize,
    /// Unary soft penalty of this placement.
    pub penalty: f64,
}

/// A candidate index per section (`None` = unplaced).
pub type Placement = Vec<Option<usize>>;

/// Index-based view of one scheduling run.
#[derive(Debug)]
pub struct SchedulingProblem<'a> {
    sections: &'a [Section],
    store: &'a ConstraintStore,
    rooms: Vec<&'a Classroom>,
    slots: Vec<TimeSlot>,
    next_slot: Vec<Option<usize>>,
    prev_slot: Vec<Option<usize>>,
    teacher_of: Vec<usize>,
    group_of: Vec<Option<usize>>,
    n_teachers: usize,
    n_groups: usize,
    candidates: Vec<Vec<Candidate>>,
    /// slot -> (section, candidate) pairs using it.
    at_slot: Vec<Vec<(usize, usize)>>,
}

impl<'a> SchedulingProblem<'a> {
    /// Builds the problem.
    ///
    /// # Errors
    /// - `Validation` if the input is structurally broken
    /// - `InvalidConstraints` if some section has no compatible candidate
    pub fn new(sections: &'a [Section], store: &'a ConstraintStore) -> EngineResult<Self> {
        validate_input(sections, store)?;

        let rooms: Vec<&Classroom> = store.classrooms().collect();
        let room_idx: HashMap<&str, usize> = rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();
        let slots: Vec<TimeSlot> = store.time_slots().to_vec();
        let slot_idx: HashMap<u32, usize> = slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.ordinal, i))
            .collect();

        let next_slot: Vec<Option<usize>> = slots
            .iter()
            .map(|s| {
                let next = s.ordinal.checked_add(1)?;
                slot_idx
                    .get(&next)
                    .copied()
                    .filter(|&j| s.is_followed_by(&slots[j]))
            })
            .collect();
        let mut prev_slot = vec![None; slots.len()];
        for (i, next) in next_slot.iter().enumerate() {
            if let Some(j) = next {
                prev_slot[*j] = Some(i);
            }
        }

        let mut teacher_ids: HashMap<&str, usize> = HashMap::new();
        let mut group_ids: HashMap<&str, usize> = HashMap::new();
        let mut teacher_of = Vec::with_capacity(sections.len());
        let mut group_of = Vec::with_capacity(sections.len());
        for s in sections {
            let n = teacher_ids.len();
            teacher_of.push(*teacher_ids.entry(s.teacher_id.as_str()).or_insert(n));
            if s.has_group() {
                let n = group_ids.len();
                group_of.push(Some(*group_ids.entry(s.student_group_id.as_str()).or_insert(n)));
            } else {
                group_of.push(None);
            }
        }

        let weights = store.weights();
        let mut candidates = Vec::with_capacity(sections.len());
        let mut missing = Vec::new();
        for s in sections {
            let mut list: Vec<Candidate> = store
                .compatible_candidates(s)
                .into_iter()
                .filter_map(|(room, slot)| {
                    Some(Candidate {
                        room: *room_idx.get(room.id.as_str())?,
                        slot: *slot_idx.get(&slot.ordinal)?,
                        penalty: weights.unary(s.required_capacity, room.capacity, slot),
                    })
                })
                .collect();
            if list.is_empty() {
                missing.push(s.id.clone());
            }
            // stable: ties keep (slot ordinal, room id) order
            list.sort_by(|a, b| a.penalty.total_cmp(&b.penalty));
            candidates.push(list);
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(EngineError::InvalidConstraints {
                sections_without_candidates: missing,
            });
        }

        let mut at_slot = vec![Vec::new(); slots.len()];
        for (s, list) in candidates.iter().enumerate() {
            for (ci, c) in list.iter().enumerate() {
                at_slot[c.slot].push((s, ci));
            }
        }

        Ok(Self {
            sections,
            store,
            rooms,
            slots,
            next_slot,
            prev_slot,
            teacher_of,
            group_of,
            n_teachers: teacher_ids.len(),
            n_groups: group_ids.len(),
            candidates,
            at_slot,
        })
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The sections being scheduled.
    pub fn sections(&self) -> &'a [Section] {
        self.sections
    }

    /// The constraint store.
    pub fn store(&self) -> &'a ConstraintStore {
        self.store
    }

    /// Soft weights of the run.
    pub fn weights(&self) -> &SoftWeights {
        self.store.weights()
    }

    /// Compatible candidates of a section, best unary penalty first.
    pub fn candidates(&self, section: usize) -> &[Candidate] {
        &self.candidates[section]
    }

    /// (section, candidate) pairs placed at a slot index.
    pub(crate) fn at_slot(&self, slot: usize) -> &[(usize, usize)] {
        &self.at_slot[slot]
    }

    /// Week range a section meets.
    pub fn weeks(&self, section: usize) -> &WeekRange {
        &self.sections[section].weeks
    }

    /// Whether two sections share a teacher.
    pub fn same_teacher(&self, a: usize, b: usize) -> bool {
        self.teacher_of[a] == self.teacher_of[b]
    }

    /// Whether two sections share a student group.
    pub fn same_group(&self, a: usize, b: usize) -> bool {
        self.group_of[a].is_some() && self.group_of[a] == self.group_of[b]
    }

    /// Whether two placements would clash.
    pub fn clashes(&self, a: usize, ca: usize, b: usize, cb: usize) -> bool {
        let x = &self.candidates[a][ca];
        let y = &self.candidates[b][cb];
        x.slot == y.slot
            && self.weeks(a).overlaps(self.weeks(b))
            && (x.room == y.room || self.same_teacher(a, b) || self.same_group(a, b))
    }

    /// Scarcity statistics for the ordering rules.
    pub fn ordering_context(&self) -> OrderingContext {
        let mut ctx = OrderingContext::default();
        for (s, section) in self.sections.iter().enumerate() {
            ctx.candidate_counts
                .insert(section.id.clone(), self.candidates[s].len());
            *ctx.teacher_load.entry(section.teacher_id.clone()).or_default() += 1;
            if section.has_group() {
                *ctx.group_load
                    .entry(section.student_group_id.clone())
                    .or_default() += 1;
            }
        }
        ctx
    }

    /// Builds the assignment of a section for a candidate.
    pub fn assignment(&self, section: usize, candidate: usize) -> Assignment {
        let c = &self.candidates[section][candidate];
        let s = &self.sections[section];
        Assignment::new(
            s.id.clone(),
            self.rooms[c.room].id.clone(),
            self.slots[c.slot],
            s.weeks,
        )
    }

    /// Converts a placement into a schedule.
    pub fn to_state(&self, placement: &[Option<usize>]) -> ScheduleState {
        ScheduleState::from_assignments(
            self.store.semester.clone(),
            placement
                .iter()
                .enumerate()
                .filter_map(|(s, ci)| ci.map(|ci| self.assignment(s, ci))),
        )
    }

    /// Hard conflicts and soft penalty of a placement.
    pub fn evaluate(&self, placement: &[Option<usize>]) -> (usize, f64) {
        let occ = Occupancy::from_placement(self, placement);
        (occ.hard_conflicts(), occ.soft_penalty(self))
    }

    fn resource_slots(&self, section: usize, candidate: usize) -> [Option<usize>; 3] {
        let c = &self.candidates[section][candidate];
        let n = self.slots.len();
        let teacher = self.teacher_of[section];
        let room = self.n_teachers + c.room;
        let group = self.group_of[section].map(|g| self.n_teachers + self.rooms.len() + g);
        [
            Some(teacher * n + c.slot),
            Some(room * n + c.slot),
            group.map(|g| g * n + c.slot),
        ]
    }

    fn bucket_count(&self) -> usize {
        (self.n_teachers + self.rooms.len() + self.n_groups) * self.slots.len()
    }
}

/// Mutable placement state with per-(resource, slot) buckets.
///
/// Keeps a running count of hard conflicts (one per clashing pair and
/// shared resource).
#[derive(Debug, Clone)]
pub struct Occupancy {
    buckets: Vec<Vec<usize>>,
    placement: Placement,
    assigned: usize,
    hard: usize,
}

impl Occupancy {
    /// An empty occupancy.
    pub fn new(problem: &SchedulingProblem<'_>) -> Self {
        Self {
            buckets: vec![Vec::new(); problem.bucket_count()],
            placement: vec![None; problem.len()],
            assigned: 0,
            hard: 0,
        }
    }

    /// Occupancy holding every placed section of `placement`.
    pub fn from_placement(problem: &SchedulingProblem<'_>, placement: &[Option<usize>]) -> Self {
        let mut occ = Self::new(problem);
        for (s, ci) in placement.iter().enumerate() {
            if let Some(ci) = ci {
                occ.assign(problem, s, *ci);
            }
        }
        occ
    }

    /// Hard conflicts the placement `(section, candidate)` would add.
    ///
    /// The section's own current placement is ignored.
    pub fn new_conflicts(&self, problem: &SchedulingProblem<'_>, section: usize, candidate: usize) -> usize {
        let weeks = problem.weeks(section);
        problem
            .resource_slots(section, candidate)
            .into_iter()
            .flatten()
            .map(|key| {
                self.buckets[key]
                    .iter()
                    .filter(|&&o| o != section && problem.weeks(o).overlaps(weeks))
                    .count()
            })
            .sum()
    }

    /// Hard conflicts the section's current placement takes part in.
    pub fn conflicts_of(&self, problem: &SchedulingProblem<'_>, section: usize) -> usize {
        self.placement[section].map_or(0, |ci| self.new_conflicts(problem, section, ci))
    }

    /// Soft penalty of placing a section: unary penalty plus room changes
    /// against the teacher's placements in adjacent slots.
    pub fn soft_delta(&self, problem: &SchedulingProblem<'_>, section: usize, candidate: usize) -> f64 {
        let c = &problem.candidates[section][candidate];
        let weights = problem.weights();
        let mut penalty = c.penalty;
        if weights.room_change <= 0.0 {
            return penalty;
        }
        let n = problem.slots.len();
        let teacher = problem.teacher_of[section];
        let weeks = problem.weeks(section);
        for adj in [problem.prev_slot[c.slot], problem.next_slot[c.slot]]
            .into_iter()
            .flatten()
        {
            for &o in &self.buckets[teacher * n + adj] {
                if o == section {
                    continue;
                }
                let Some(oc) = self.placement[o] else { continue };
                if problem.candidates[o][oc].room != c.room && problem.weeks(o).overlaps(weeks) {
                    penalty += weights.room_change;
                }
            }
        }
        penalty
    }

    /// Places a section, replacing its current placement.
    pub fn assign(&mut self, problem: &SchedulingProblem<'_>, section: usize, candidate: usize) {
        self.unassign(problem, section);
        self.hard += self.new_conflicts(problem, section, candidate);
        for key in problem.resource_slots(section, candidate).into_iter().flatten() {
            self.buckets[key].push(section);
        }
        self.placement[section] = Some(candidate);
        self.assigned += 1;
    }

    /// Removes a section's placement, if any.
    pub fn unassign(&mut self, problem: &SchedulingProblem<'_>, section: usize) {
        let Some(ci) = self.placement[section].take() else {
            return;
        };
        for key in problem.resource_slots(section, ci).into_iter().flatten() {
            let bucket = &mut self.buckets[key];
            if let Some(pos) = bucket.iter().position(|&o| o == section) {
                bucket.swap_remove(pos);
            }
        }
        self.hard -= self.new_conflicts(problem, section, ci);
        self.assigned -= 1;
    }

    /// Current candidate of a section.
    pub fn placed(&self, section: usize) -> Option<usize> {
        self.placement[section]
    }

    /// Current placement vector.
    pub fn placement(&self) -> &[Option<usize>] {
        &self.placement
    }

    /// Consumes the occupancy, returning its placement.
    pub fn into_placement(self) -> Placement {
        self.placement
    }

    /// Number of placed sections.
    pub fn assigned(&self) -> usize {
        self.assigned
    }

    /// Hard conflicts among placed sections.
    pub fn hard_conflicts(&self) -> usize {
        self.hard
    }

    /// Total soft penalty of placed sections.
    pub fn soft_penalty(&self, problem: &SchedulingProblem<'_>) -> f64 {
        let weights = problem.weights();
        let n = problem.slots.len();
        let mut total = 0.0;
        for (s, ci) in self.placement.iter().enumerate() {
            let Some(ci) = ci else { continue };
            let c = &problem.candidates[s][*ci];
            total += c.penalty;
            if weights.room_change <= 0.0 {
                continue;
            }
            // count each adjacent pair once, from its earlier slot
            let Some(next) = problem.next_slot[c.slot] else {
                continue;
            };
            let teacher = problem.teacher_of[s];
            for &o in &self.buckets[teacher * n + next] {
                let Some(oc) = self.placement[o] else { continue };
                if o != s
                    && problem.candidates[o][oc].room != c.room
                    && problem.weeks(o).overlaps(problem.weeks(s))
                {
                    total += weights.room_change;
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::SoftScorer;
    use crate::detection::{validate_state, SectionIndex};
    use crate::models::Teacher;

    fn store() -> ConstraintStore {
        ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("R1", 40))
            .with_classroom(Classroom::new("R2", 80))
            .with_slots(ConstraintStore::weekly_grid(2, 3, 8, 2))
    }

    fn sections() -> Vec<Section> {
        vec![
            Section::new("S1", "T1").with_capacity(30).with_group("G1"),
            Section::new("S2", "T1").with_capacity(60),
            Section::new("S3", "T2").with_capacity(30).with_group("G1"),
        ]
    }

    #[test]
    fn test_candidates_are_compatible() {
        let store = store();
        let secs = sections();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        assert_eq!(p.candidates(0).len(), 12);
        assert_eq!(p.candidates(1).len(), 6);
        // morning slots before afternoon ones
        let first = p.assignment(0, 0);
        assert!(first.time_slot.start_hour() < 12);
    }

    #[test]
    fn test_largest_ordinal_has_no_successor() {
        let eight = chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let ten = chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let store = ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_classroom(Classroom::new("R1", 40))
            .with_slots(vec![TimeSlot::new(u32::MAX, 1, eight, ten)])
            .with_weights(SoftWeights::default());
        let secs = vec![Section::new("S1", "T1")];
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        assert_eq!(p.next_slot, vec![None]);
        let occ = Occupancy::from_placement(&p, &[Some(0)]);
        assert_eq!(occ.hard_conflicts(), 0);
        assert!(occ.soft_penalty(&p).is_finite());
    }

    #[test]
    fn test_invalid_constraints() {
        let store = store();
        let secs = vec![
            Section::new("S1", "T1").with_capacity(500),
            Section::new("S0", "T2").with_capacity(100),
        ];
        match SchedulingProblem::new(&secs, &store) {
            Err(EngineError::InvalidConstraints {
                sections_without_candidates,
            }) => assert_eq!(sections_without_candidates, vec!["S0", "S1"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_surfaces() {
        let store = store();
        let secs = vec![Section::new("S1", "NOBODY")];
        assert!(matches!(
            SchedulingProblem::new(&secs, &store),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_occupancy_counts_match_detection() {
        let store = store();
        let secs = sections();
        let p = SchedulingProblem::new(&secs, &store).unwrap();

        // everything in the first candidate of S1's slot/room where possible
        let slot_room = |s: usize, slot: usize, room: usize| {
            p.candidates(s)
                .iter()
                .position(|c| c.slot == slot && c.room == room)
        };
        let placement = vec![slot_room(0, 0, 1), slot_room(1, 0, 1), slot_room(2, 0, 0)];
        let occ = Occupancy::from_placement(&p, &placement);

        let state = p.to_state(&placement);
        let index = SectionIndex::new(&secs, &store);
        let conflicts = validate_state(&state, &index).unwrap();
        // S1/S2 teacher + room, S1/S3 group
        assert_eq!(conflicts.len(), 3);
        assert_eq!(occ.hard_conflicts(), conflicts.len());
    }

    #[test]
    fn test_assign_unassign_restores_counts() {
        let store = store();
        let secs = sections();
        let p = SchedulingProblem::new(&secs, &store).unwrap();
        let mut occ = Occupancy::new(&p);

        occ.assign(&p, 0, 0);
        let clash = p
            .candidates(1)
            .iter()
            .position(|c| c.slot == p.candidates(0)[0].slot)
            .unwrap();
        assert_eq!(occ.new_conflicts(&p, 1, clash), 1);
        occ.assign(&p, 1, clash);
        assert!(occ.hard_conflicts() >= 1);
        occ.unassign(&p, 1);
        assert_eq!(occ.hard_conflicts(), 0);
        assert_eq!(occ.assigned(), 1);
        occ.unassign(&p, 0);
        assert_eq!(occ.assigned(), 0);
    }

    #[test]
    fn test_soft_penalty_matches_scorer() {
        let store = store().with_weights(SoftWeights::default());
        let secs = sections();
        let p = SchedulingProblem::new(&secs, &store).unwrap();

        let find = |s: usize, slot: usize, room: usize| {
            p.candidates(s)
                .iter()
                .position(|c| c.slot == slot && c.room == room)
        };
        // S1 at slot 0 in R1, S2 at slot 1 in R2: one room change
        let placement = vec![find(0, 0, 0), find(1, 1, 1), find(2, 4, 0)];
        let occ = Occupancy::from_placement(&p, &placement);

        let state = p.to_state(&placement);
        let lookup: HashMap<&str, &Section> = secs.iter().map(|s| (s.id.as_str(), s)).collect();
        let expected = SoftScorer::new(&store).state_penalty(&state, &lookup);
        assert!((occ.soft_penalty(&p) - expected).abs() < 1e-9);
        assert!(occ.soft_penalty(&p) >= 2.0);
    }
}
