//! Soft preferences.
//!
//! Soft preferences are scored but never block a placement. Each
//! preference contributes a non-negative penalty; lower totals are better.
//!
//! | Preference | Penalty |
//! |------------|---------|
//! | Morning slots | `morning` when the slot starts at/after `morning_cutoff_hour` |
//! | Tight room fit | `capacity_fit * (capacity - required) / capacity` |
//! | Teacher stays put | `room_change` per pair of back-to-back slots in different rooms |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ConstraintStore;
use crate::models::{Assignment, ScheduleState, Section, TimeSlot, WeekRange};

/// Weights of the soft preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftWeights {
    /// Penalty for a slot starting at or after the cutoff hour.
    pub morning: f64,
    /// Penalty per back-to-back room change of a teacher.
    pub room_change: f64,
    /// Weight of the unused-seat ratio.
    pub capacity_fit: f64,
    /// Hour of day at which "morning" ends.
    pub morning_cutoff_hour: u32,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            morning: 1.0,
            room_change: 2.0,
            capacity_fit: 0.5,
            morning_cutoff_hour: 12,
        }
    }
}

impl SoftWeights {
    /// All weights zero: every placement scores the same.
    pub fn none() -> Self {
        Self {
            morning: 0.0,
            room_change: 0.0,
            capacity_fit: 0.0,
            ..Self::default()
        }
    }

    /// Sets the morning weight.
    pub fn with_morning(mut self, weight: f64) -> Self {
        self.morning = weight.max(0.0);
        self
    }

    /// Sets the room-change weight.
    pub fn with_room_change(mut self, weight: f64) -> Self {
        self.room_change = weight.max(0.0);
        self
    }

    /// Sets the capacity-fit weight.
    pub fn with_capacity_fit(mut self, weight: f64) -> Self {
        self.capacity_fit = weight.max(0.0);
        self
    }

    /// Whether a slot counts as a morning slot.
    #[inline]
    pub fn is_morning(&self, slot: &TimeSlot) -> bool {
        slot.start_hour() < self.morning_cutoff_hour
    }

    /// Penalty that depends on a single placement.
    pub fn unary(&self, required: u32, room_capacity: u32, slot: &TimeSlot) -> f64 {
        let mut penalty = 0.0;
        if !self.is_morning(slot) {
            penalty += self.morning;
        }
        if room_capacity > 0 && room_capacity >= required {
            let unused = f64::from(room_capacity - required) / f64::from(room_capacity);
            penalty += self.capacity_fit * unused;
        }
        penalty
    }

    /// Penalty between two placements of the same teacher.
    pub fn room_change(
        &self,
        a_slot: &TimeSlot,
        a_weeks: &WeekRange,
        b_slot: &TimeSlot,
        b_weeks: &WeekRange,
        same_room: bool,
    ) -> f64 {
        let adjacent = a_slot.is_followed_by(b_slot) || b_slot.is_followed_by(a_slot);
        if adjacent && !same_room && a_weeks.overlaps(b_weeks) {
            self.room_change
        } else {
            0.0
        }
    }
}

/// Scores soft preferences over assignments.
#[derive(Debug, Clone, Copy)]
pub struct SoftScorer<'a> {
    store: &'a ConstraintStore,
}

impl<'a> SoftScorer<'a> {
    /// Creates a scorer using the store's weights and classrooms.
    pub fn new(store: &'a ConstraintStore) -> Self {
        Self { store }
    }

    /// Unary penalty of one assignment (0 if its classroom is unknown).
    pub fn assignment_penalty(&self, section: &Section, assignment: &Assignment) -> f64 {
        let capacity = self
            .store
            .classroom(&assignment.classroom_id)
            .map(|r| r.capacity)
            .unwrap_or(0);
        self.store
            .weights()
            .unary(section.required_capacity, capacity, &assignment.time_slot)
    }

    /// Penalty of placing `candidate` given the other assignments of the
    /// same teacher.
    pub fn candidate_penalty<'s>(
        &self,
        section: &Section,
        candidate: &Assignment,
        teacher_assignments: impl IntoIterator<Item = &'s Assignment>,
    ) -> f64 {
        let weights = self.store.weights();
        let mut penalty = self.assignment_penalty(section, candidate);
        for other in teacher_assignments {
            if other.section_id == candidate.section_id {
                continue;
            }
            penalty += weights.room_change(
                &candidate.time_slot,
                &candidate.week_range,
                &other.time_slot,
                &other.week_range,
                candidate.classroom_id == other.classroom_id,
            );
        }
        penalty
    }

    /// Total penalty of a schedule. Assignments of unknown sections are skipped.
    pub fn state_penalty(&self, state: &ScheduleState, sections: &HashMap<&str, &Section>) -> f64 {
        let weights = self.store.weights();
        let mut total = 0.0;
        let mut by_teacher: HashMap<&str, Vec<&Assignment>> = HashMap::new();

        for a in state.iter() {
            let Some(section) = sections.get(a.section_id.as_str()) else {
                continue;
            };
            total += self.assignment_penalty(section, a);
            by_teacher
                .entry(section.teacher_id.as_str())
                .or_default()
                .push(a);
        }

        for list in by_teacher.values_mut() {
            list.sort_by_key(|a| a.time_slot.ordinal);
            for i in 0..list.len() {
                let next = list[i].time_slot.ordinal.saturating_add(1);
                for b in list[i + 1..]
                    .iter()
                    .take_while(|b| b.time_slot.ordinal <= next)
                {
                    total += weights.room_change(
                        &list[i].time_slot,
                        &list[i].week_range,
                        &b.time_slot,
                        &b.week_range,
                        list[i].classroom_id == b.classroom_id,
                    );
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classroom, Teacher};
    use chrono::NaiveTime;

    fn slot(ordinal: u32, day: u8, hour: u32) -> TimeSlot {
        TimeSlot::new(
            ordinal,
            day,
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(hour + 2, 0, 0).unwrap(),
        )
    }

    fn store() -> ConstraintStore {
        ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_classroom(Classroom::new("R1", 40))
            .with_classroom(Classroom::new("R2", 100))
            .with_slots(vec![slot(0, 1, 8), slot(1, 1, 10), slot(2, 1, 14)])
    }

    #[test]
    fn test_unary_morning_penalty() {
        let w = SoftWeights::default().with_capacity_fit(0.0);
        assert_eq!(w.unary(10, 40, &slot(0, 1, 8)), 0.0);
        assert_eq!(w.unary(10, 40, &slot(2, 1, 14)), 1.0);
    }

    #[test]
    fn test_unary_capacity_fit() {
        let w = SoftWeights::none().with_capacity_fit(1.0);
        assert!((w.unary(40, 40, &slot(0, 1, 8)) - 0.0).abs() < 1e-10);
        assert!((w.unary(50, 100, &slot(0, 1, 8)) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_room_change_only_for_adjacent_slots() {
        let w = SoftWeights::default();
        let weeks = WeekRange::new(1, 16);
        let s0 = slot(0, 1, 8);
        let s1 = slot(1, 1, 10);
        let s2 = slot(2, 1, 14);
        assert_eq!(w.room_change(&s0, &weeks, &s1, &weeks, false), 2.0);
        assert_eq!(w.room_change(&s1, &weeks, &s0, &weeks, false), 2.0);
        assert_eq!(w.room_change(&s0, &weeks, &s1, &weeks, true), 0.0);
        assert_eq!(w.room_change(&s0, &weeks, &s2, &weeks, false), 0.0);
        assert_eq!(
            w.room_change(&s0, &weeks, &s1, &WeekRange::new(17, 18), false),
            0.0
        );
    }

    #[test]
    fn test_state_penalty() {
        let store = store().with_weights(SoftWeights::none().with_room_change(2.0).with_morning(1.0));
        let s1 = Section::new("S1", "T1").with_capacity(30);
        let s2 = Section::new("S2", "T1").with_capacity(30);
        let sections: HashMap<&str, &Section> = [("S1", &s1), ("S2", &s2)].into_iter().collect();

        let state = ScheduleState::from_assignments(
            "F26",
            vec![
                Assignment::new("S1", "R1", slot(0, 1, 8), WeekRange::new(1, 16)),
                Assignment::new("S2", "R2", slot(1, 1, 10), WeekRange::new(1, 16)),
            ],
        );
        let scorer = SoftScorer::new(&store);
        // one room change, both morning
        assert!((scorer.state_penalty(&state, &sections) - 2.0).abs() < 1e-10);

        let state2 = ScheduleState::from_assignments(
            "F26",
            vec![
                Assignment::new("S1", "R1", slot(0, 1, 8), WeekRange::new(1, 16)),
                Assignment::new("S2", "R1", slot(2, 1, 14), WeekRange::new(1, 16)),
            ],
        );
        // afternoon only
        assert!((scorer.state_penalty(&state2, &sections) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_candidate_penalty_skips_self() {
        let store = store().with_weights(SoftWeights::none().with_room_change(3.0));
        let s1 = Section::new("S1", "T1");
        let cand = Assignment::new("S1", "R1", slot(0, 1, 8), WeekRange::new(1, 16));
        let same = cand.clone();
        let neighbour = Assignment::new("S2", "R2", slot(1, 1, 10), WeekRange::new(1, 16));
        let scorer = SoftScorer::new(&store);
        assert_eq!(scorer.candidate_penalty(&s1, &cand, [&same]), 0.0);
        assert_eq!(scorer.candidate_penalty(&s1, &cand, [&same, &neighbour]), 3.0);
    }
}
