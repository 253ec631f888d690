//! Built-in ordering rules.
//!
//! All rules return lower scores for sections that should be placed first.

use super::{OrderingContext, RuleScore, SectionRule};
use crate::models::Section;

/// Fewest compatible (classroom, slot) pairs first.
///
/// A section with few options is the one most likely to be blocked, so it
/// is placed while its options are still free. Sections missing from the
/// context sort last.
#[derive(Debug, Clone, Copy)]
pub struct Scarcity;

impl SectionRule for Scarcity {
    fn name(&self) -> &'static str {
        "SCARCITY"
    }

    fn evaluate(&self, section: &Section, context: &OrderingContext) -> RuleScore {
        context
            .candidate_counts
            .get(&section.id)
            .map_or(f64::INFINITY, |&n| n as f64)
    }

    fn description(&self) -> &'static str {
        "Fewest compatible candidates"
    }
}

/// Sections of busier teachers first.
#[derive(Debug, Clone, Copy)]
pub struct TeacherLoad;

impl SectionRule for TeacherLoad {
    fn name(&self) -> &'static str {
        "TEACHER_LOAD"
    }

    fn evaluate(&self, section: &Section, context: &OrderingContext) -> RuleScore {
        let load = context
            .teacher_load
            .get(&section.teacher_id)
            .copied()
            .unwrap_or(0);
        -(load as f64)
    }

    fn description(&self) -> &'static str {
        "Most sections per teacher"
    }
}

/// Sections of busier student groups first. Ungrouped sections score 0.
#[derive(Debug, Clone, Copy)]
pub struct GroupLoad;

impl SectionRule for GroupLoad {
    fn name(&self) -> &'static str {
        "GROUP_LOAD"
    }

    fn evaluate(&self, section: &Section, context: &OrderingContext) -> RuleScore {
        if !section.has_group() {
            return 0.0;
        }
        let load = context
            .group_load
            .get(&section.student_group_id)
            .copied()
            .unwrap_or(0);
        -(load as f64)
    }

    fn description(&self) -> &'static str {
        "Most sections per student group"
    }
}

/// Larger sections first; big rooms are the scarcest.
#[derive(Debug, Clone, Copy)]
pub struct CapacityDemand;

impl SectionRule for CapacityDemand {
    fn name(&self) -> &'static str {
        "CAPACITY"
    }

    fn evaluate(&self, section: &Section, _context: &OrderingContext) -> RuleScore {
        -f64::from(section.required_capacity)
    }

    fn description(&self) -> &'static str {
        "Largest required capacity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scarcity_score() {
        let ctx = OrderingContext::default().with_candidates("S1", 4);
        assert_eq!(Scarcity.evaluate(&Section::new("S1", "T1"), &ctx), 4.0);
        assert!(Scarcity.evaluate(&Section::new("S2", "T1"), &ctx).is_infinite());
    }

    #[test]
    fn test_load_scores() {
        let ctx = OrderingContext::default()
            .with_teacher_load("T1", 3)
            .with_group_load("G1", 5);
        let s = Section::new("S1", "T1").with_group("G1");
        assert_eq!(TeacherLoad.evaluate(&s, &ctx), -3.0);
        assert_eq!(GroupLoad.evaluate(&s, &ctx), -5.0);
        assert_eq!(GroupLoad.evaluate(&Section::new("S2", "T1"), &ctx), 0.0);
    }

    #[test]
    fn test_capacity_demand() {
        let ctx = OrderingContext::default();
        let big = Section::new("A", "T").with_capacity(200);
        let small = Section::new("B", "T").with_capacity(20);
        assert!(CapacityDemand.evaluate(&big, &ctx) < CapacityDemand.evaluate(&small, &ctx));
    }
}
