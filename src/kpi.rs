//! Schedule quality metrics (KPIs).
//!
//! Computes timetable indicators from a schedule, its sections and the
//! conflicts found in it.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Assigned / Unassigned | Sections with / without an assignment |
//! | Hard Conflicts | Number of conflicts, also per kind |
//! | Soft Penalty | Weighted soft-preference score (lower is better) |
//! | Morning Rate | Fraction of assignments starting before the cutoff |
//! | Room Utilization | Occupied (room, slot) pairs / all pairs |

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintStore, SoftScorer};
use crate::models::{Conflict, ScheduleState, Section};

/// Timetable performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Sections with an assignment.
    pub assigned: usize,
    /// Sections without one.
    pub unassigned: usize,
    /// Total hard conflicts.
    pub hard_conflicts: usize,
    /// Conflicts per kind slug (`teacher`, `room`, `capacity`, `group`).
    pub conflicts_by_kind: BTreeMap<String, usize>,
    /// Soft penalty under the store's weights.
    pub soft_penalty: f64,
    /// Fraction of assignments in morning slots (0.0..1.0).
    pub morning_rate: f64,
    /// Occupied (room, slot) pairs over all pairs (0.0..1.0).
    pub room_utilization: f64,
}

impl ScheduleKpi {
    /// Computes KPIs.
    ///
    /// # Arguments
    /// * `state` - The schedule.
    /// * `sections` - Sections that should be scheduled.
    /// * `store` - Resources, time grid and soft weights.
    /// * `conflicts` - Conflicts of `state` (from validation).
    pub fn calculate(
        state: &ScheduleState,
        sections: &[Section],
        store: &ConstraintStore,
        conflicts: &[Conflict],
    ) -> Self {
        let assigned = sections.iter().filter(|s| state.contains(&s.id)).count();

        let mut conflicts_by_kind = BTreeMap::new();
        for c in conflicts {
            *conflicts_by_kind.entry(c.kind.slug().to_string()).or_insert(0) += 1;
        }

        let lookup: HashMap<&str, &Section> = sections.iter().map(|s| (s.id.as_str(), s)).collect();
        let soft_penalty = SoftScorer::new(store).state_penalty(state, &lookup);

        let weights = store.weights();
        let morning = state.iter().filter(|a| weights.is_morning(&a.time_slot)).count();
        let morning_rate = if state.is_empty() {
            0.0
        } else {
            morning as f64 / state.len() as f64
        };

        let occupied: HashSet<(&str, u32)> = state
            .iter()
            .map(|a| (a.classroom_id.as_str(), a.time_slot.ordinal))
            .collect();
        let total = store.classrooms().count() * store.time_slots().len();
        let room_utilization = if total == 0 {
            0.0
        } else {
            (occupied.len() as f64 / total as f64).min(1.0)
        };

        Self {
            assigned,
            unassigned: sections.len() - assigned,
            hard_conflicts: conflicts.len(),
            conflicts_by_kind,
            soft_penalty,
            morning_rate,
            room_utilization,
        }
    }

    /// Whether the schedule is complete and conflict-free.
    pub fn is_clean(&self) -> bool {
        self.unassigned == 0 && self.hard_conflicts == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::SoftWeights;
    use crate::detection::{validate_state, SectionIndex};
    use crate::models::{Assignment, Classroom, Teacher, WeekRange};

    fn store() -> ConstraintStore {
        ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_classroom(Classroom::new("R1", 40))
            .with_classroom(Classroom::new("R2", 40))
            .with_slots(ConstraintStore::weekly_grid(1, 4, 8, 2))
            .with_weights(SoftWeights::none().with_morning(1.0))
    }

    #[test]
    fn test_kpi_basic() {
        let store = store();
        let secs = vec![
            Section::new("S1", "T1"),
            Section::new("S2", "T1"),
            Section::new("S3", "T1"),
        ];
        let slot = |o: u32| *store.slot(o).unwrap();
        let state = ScheduleState::from_assignments(
            "F26",
            vec![
                Assignment::new("S1", "R1", slot(1), WeekRange::default()),
                Assignment::new("S2", "R2", slot(3), WeekRange::default()),
            ],
        );
        let index = SectionIndex::new(&secs, &store);
        let conflicts = validate_state(&state, &index).unwrap();

        let kpi = ScheduleKpi::calculate(&state, &secs, &store, &conflicts);
        assert_eq!(kpi.assigned, 2);
        assert_eq!(kpi.unassigned, 1);
        assert_eq!(kpi.hard_conflicts, 0);
        // 8:00 morning, 12:00 afternoon
        assert!((kpi.morning_rate - 0.5).abs() < 1e-10);
        assert!((kpi.soft_penalty - 1.0).abs() < 1e-10);
        // 2 of 2 rooms x 4 slots
        assert!((kpi.room_utilization - 0.25).abs() < 1e-10);
        assert!(!kpi.is_clean());
    }

    #[test]
    fn test_kpi_conflicts_by_kind() {
        let store = store();
        let secs = vec![Section::new("S1", "T1"), Section::new("S2", "T1")];
        let slot = *store.slot(1).unwrap();
        let state = ScheduleState::from_assignments(
            "F26",
            vec![
                Assignment::new("S1", "R1", slot, WeekRange::default()),
                Assignment::new("S2", "R1", slot, WeekRange::default()),
            ],
        );
        let index = SectionIndex::new(&secs, &store);
        let conflicts = validate_state(&state, &index).unwrap();

        let kpi = ScheduleKpi::calculate(&state, &secs, &store, &conflicts);
        assert_eq!(kpi.hard_conflicts, 2);
        assert_eq!(kpi.conflicts_by_kind["teacher"], 1);
        assert_eq!(kpi.conflicts_by_kind["room"], 1);
        assert!((kpi.room_utilization - 0.125).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_empty() {
        let store = store();
        let kpi = ScheduleKpi::calculate(&ScheduleState::new("F26"), &[], &store, &[]);
        assert_eq!(kpi.assigned, 0);
        assert_eq!(kpi.morning_rate, 0.0);
        assert!(kpi.is_clean());
    }
}
