//! Constraint store.
//!
//! Holds, per semester, everything a run is checked against: the weekly
//! time grid, teachers and classrooms, resource calendars and soft
//! preference weights.
//!
//! # Calendars
//! - **Teacher blackout slots**: slot ordinals a teacher cannot teach.
//! - **Classroom blackout weeks**: week ranges a room is closed
//!   (maintenance, exams). A room is unusable for a section whose weeks
//!   overlap any of its blackouts.
//!
//! The store is read-only during a run. Jobs take a snapshot when they
//! start, so later edits never race with a running solver.

mod preferences;

pub use preferences::{SoftScorer, SoftWeights};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{Classroom, Section, Teacher, TimeSlot, WeekRange};

/// Hard-constraint data and soft weights for one semester.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintStore {
    /// Semester identifier.
    pub semester: String,
    /// Weeks of the semester.
    pub weeks: WeekRange,
    teachers: BTreeMap<String, Teacher>,
    classrooms: BTreeMap<String, Classroom>,
    /// Sorted by ordinal.
    time_slots: Vec<TimeSlot>,
    teacher_blackouts: HashMap<String, BTreeSet<u32>>,
    room_blackouts: HashMap<String, Vec<WeekRange>>,
    weights: SoftWeights,
}

impl ConstraintStore {
    /// Creates an empty store for a semester of weeks 1..=16.
    pub fn new(semester: impl Into<String>) -> Self {
        Self {
            semester: semester.into(),
            ..Default::default()
        }
    }

    /// Sets the semester weeks.
    pub fn with_weeks(mut self, weeks: WeekRange) -> Self {
        self.weeks = weeks;
        self
    }

    /// Adds a teacher (replacing one with the same ID).
    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.insert(teacher.id.clone(), teacher);
        self
    }

    /// Adds a classroom (replacing one with the same ID).
    pub fn with_classroom(mut self, classroom: Classroom) -> Self {
        self.classrooms.insert(classroom.id.clone(), classroom);
        self
    }

    /// Adds a time slot.
    pub fn with_slot(mut self, slot: TimeSlot) -> Self {
        self.push_slot(slot);
        self
    }

    /// Adds time slots.
    pub fn with_slots(mut self, slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        for slot in slots {
            self.push_slot(slot);
        }
        self
    }

    /// Marks a slot as unavailable for a teacher.
    pub fn with_teacher_blackout(mut self, teacher_id: impl Into<String>, ordinal: u32) -> Self {
        self.teacher_blackouts
            .entry(teacher_id.into())
            .or_default()
            .insert(ordinal);
        self
    }

    /// Closes a classroom for a range of weeks.
    pub fn with_room_blackout(mut self, classroom_id: impl Into<String>, weeks: WeekRange) -> Self {
        self.room_blackouts
            .entry(classroom_id.into())
            .or_default()
            .push(weeks);
        self
    }

    /// Sets the soft preference weights.
    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.weights = weights;
        self
    }

    fn push_slot(&mut self, slot: TimeSlot) {
        match self.time_slots.binary_search(&slot) {
            Ok(pos) => self.time_slots[pos] = slot,
            Err(pos) => self.time_slots.insert(pos, slot),
        }
    }

    /// Builds a regular weekly grid: `days` days (starting Monday) of
    /// `periods` periods, each `period_hours` long, the first starting at
    /// `first_hour`. Ordinals run day by day. Periods ending past midnight
    /// are dropped.
    pub fn weekly_grid(days: u8, periods: u32, first_hour: u32, period_hours: u32) -> Vec<TimeSlot> {
        let mut slots = Vec::new();
        let mut ordinal = 0;
        for day in 1..=days.min(7) {
            for p in 0..periods {
                let start_h = first_hour + p * period_hours;
                let end_h = start_h + period_hours;
                let (Some(start), Some(end)) = (
                    NaiveTime::from_hms_opt(start_h, 0, 0),
                    NaiveTime::from_hms_opt(end_h, 0, 0),
                ) else {
                    continue;
                };
                slots.push(TimeSlot::new(ordinal, day, start, end));
                ordinal += 1;
            }
        }
        slots
    }

    /// Looks up a teacher.
    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teachers.get(id)
    }

    /// Looks up a classroom.
    pub fn classroom(&self, id: &str) -> Option<&Classroom> {
        self.classrooms.get(id)
    }

    /// Looks up a slot by ordinal.
    pub fn slot(&self, ordinal: u32) -> Option<&TimeSlot> {
        self.time_slots
            .binary_search_by_key(&ordinal, |s| s.ordinal)
            .ok()
            .map(|i| &self.time_slots[i])
    }

    /// Teachers ordered by ID.
    pub fn teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.teachers.values()
    }

    /// Classrooms ordered by ID.
    pub fn classrooms(&self) -> impl Iterator<Item = &Classroom> {
        self.classrooms.values()
    }

    /// Time slots ordered by ordinal.
    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    /// Soft preference weights.
    pub fn weights(&self) -> &SoftWeights {
        &self.weights
    }

    /// Replaces the soft weights in place.
    pub fn set_weights(&mut self, weights: SoftWeights) {
        self.weights = weights;
    }

    /// Teacher IDs referenced by blackout entries.
    pub fn blackout_teacher_ids(&self) -> impl Iterator<Item = &str> {
        self.teacher_blackouts.keys().map(String::as_str)
    }

    /// Classroom IDs referenced by blackout entries.
    pub fn blackout_classroom_ids(&self) -> impl Iterator<Item = &str> {
        self.room_blackouts.keys().map(String::as_str)
    }

    /// Whether a teacher can teach at a slot.
    pub fn teacher_available(&self, teacher_id: &str, ordinal: u32) -> bool {
        self.teacher_blackouts
            .get(teacher_id)
            .map_or(true, |set| !set.contains(&ordinal))
    }

    /// Whether a classroom is open for every week of `weeks`.
    pub fn room_available(&self, classroom_id: &str, weeks: &WeekRange) -> bool {
        self.room_blackouts
            .get(classroom_id)
            .map_or(true, |closed| !closed.iter().any(|c| c.overlaps(weeks)))
    }

    /// Whether a (classroom, slot) pair can host a section without
    /// violating capacity or a calendar.
    pub fn is_compatible(&self, section: &Section, classroom: &Classroom, slot: &TimeSlot) -> bool {
        classroom.fits(section.required_capacity)
            && self.teacher_available(&section.teacher_id, slot.ordinal)
            && self.room_available(&classroom.id, &section.weeks)
    }

    /// All compatible (classroom, slot) pairs of a section, ordered by
    /// slot ordinal then classroom ID.
    pub fn compatible_candidates(&self, section: &Section) -> Vec<(&Classroom, &TimeSlot)> {
        let rooms: Vec<&Classroom> = self
            .classrooms
            .values()
            .filter(|r| {
                r.fits(section.required_capacity) && self.room_available(&r.id, &section.weeks)
            })
            .collect();

        self.time_slots
            .iter()
            .filter(|s| self.teacher_available(&section.teacher_id, s.ordinal))
            .flat_map(|s| rooms.iter().map(move |r| (*r, s)))
            .collect()
    }
}
