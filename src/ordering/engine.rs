//! Rule engine for multi-criteria section ordering.
//!
//! Applies ordering rules in sequence, falling through to the next rule
//! only on ties.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{rules, OrderingContext, RuleScore, SectionRule};
use crate::models::Section;

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order.
    #[default]
    NextRule,
    /// Deterministic by section ID (lexicographic).
    ById,
}

/// A composable rule engine for section ordering.
///
/// # Example
/// ```
/// use u_timetable::ordering::{rules, RuleEngine, TieBreaker};
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::Scarcity)
///     .with_tie_breaker(rules::CapacityDemand)
///     .with_final_tie_breaker(TieBreaker::ById);
/// assert_eq!(engine.rule_names(), vec!["SCARCITY", "CAPACITY"]);
/// ```
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Arc<dyn SectionRule>>,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            tie_breaker: TieBreaker::NextRule,
            epsilon: 1e-9,
        }
    }

    /// The ordering used by the constructive solvers: scarcity, teacher
    /// load, group load, capacity demand, then section ID.
    pub fn scarcity_first() -> Self {
        Self::new()
            .with_rule(rules::Scarcity)
            .with_tie_breaker(rules::TeacherLoad)
            .with_tie_breaker(rules::GroupLoad)
            .with_tie_breaker(rules::CapacityDemand)
            .with_final_tie_breaker(TieBreaker::ById)
    }

    /// Adds a primary rule.
    pub fn with_rule<R: SectionRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Adds a rule consulted only when every earlier rule ties.
    pub fn with_tie_breaker<R: SectionRule + 'static>(self, rule: R) -> Self {
        self.with_rule(rule)
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Sorts sections by placement priority (first = place first).
    ///
    /// Returns indices into the original slice.
    pub fn sort_indices(&self, sections: &[Section], context: &OrderingContext) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..sections.len()).collect();
        if sections.is_empty() {
            return indices;
        }

        let scores: Vec<Vec<RuleScore>> = sections
            .iter()
            .map(|s| self.rules.iter().map(|rule| rule.evaluate(s, context)).collect())
            .collect();
        indices.sort_by(|&a, &b| {
            self.compare_sequential(&scores[a], &scores[b])
                .then_with(|| self.final_tie(&sections[a], &sections[b]))
        });
        indices
    }

    fn compare_sequential(&self, a: &[RuleScore], b: &[RuleScore]) -> Ordering {
        for (sa, sb) in a.iter().zip(b) {
            if sa == sb {
                continue;
            }
            if (sa - sb).abs() > self.epsilon || sa.is_infinite() || sb.is_infinite() {
                return sa.partial_cmp(sb).unwrap_or(Ordering::Equal);
            }
        }
        Ordering::Equal
    }

    fn final_tie(&self, a: &Section, b: &Section) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::NextRule => Ordering::Equal,
            TieBreaker::ById => a.id.cmp(&b.id),
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintStore;
    use crate::models::{Classroom, Teacher};
    use crate::solver::SchedulingProblem;

    #[test]
    fn test_scarcity_ordering() {
        let sections = vec![
            Section::new("easy", "T1"),
            Section::new("hard", "T1"),
            Section::new("medium", "T1"),
        ];
        let ctx = OrderingContext::default()
            .with_candidates("easy", 40)
            .with_candidates("hard", 2)
            .with_candidates("medium", 10);
        let engine = RuleEngine::new().with_rule(rules::Scarcity);

        let indices = engine.sort_indices(&sections, &ctx);
        assert_eq!(sections[indices[0]].id, "hard");
        assert_eq!(sections[indices[1]].id, "medium");
        assert_eq!(sections[indices[2]].id, "easy");
    }

    #[test]
    fn test_sequential_with_tie_breaker() {
        let sections = vec![
            Section::new("A", "T1").with_capacity(20),
            Section::new("B", "T1").with_capacity(80),
        ];
        let ctx = OrderingContext::default()
            .with_candidates("A", 5)
            .with_candidates("B", 5);
        let engine = RuleEngine::new()
            .with_rule(rules::Scarcity)
            .with_tie_breaker(rules::CapacityDemand);

        let indices = engine.sort_indices(&sections, &ctx);
        // scarcity ties, larger section first
        assert_eq!(sections[indices[0]].id, "B");
    }

    #[test]
    fn test_by_id_tie_breaker() {
        let sections = vec![Section::new("B", "T1"), Section::new("A", "T1")];
        let ctx = OrderingContext::default();
        let engine = RuleEngine::new()
            .with_rule(rules::CapacityDemand)
            .with_final_tie_breaker(TieBreaker::ById);

        let indices = engine.sort_indices(&sections, &ctx);
        assert_eq!(sections[indices[0]].id, "A");
    }

    #[test]
    fn test_empty_sections() {
        let ctx = OrderingContext::default();
        let engine = RuleEngine::scarcity_first();
        assert!(engine.sort_indices(&[], &ctx).is_empty());
    }

    #[test]
    fn test_scarcity_first_from_store() {
        let store = ConstraintStore::new("F26")
            .with_teacher(Teacher::new("T1"))
            .with_teacher(Teacher::new("T2"))
            .with_classroom(Classroom::new("small", 30))
            .with_classroom(Classroom::new("big", 200))
            .with_slots(ConstraintStore::weekly_grid(1, 4, 8, 2))
            .with_teacher_blackout("T2", 0);
        let sections = vec![
            Section::new("S1", "T1").with_capacity(20),
            Section::new("S2", "T2").with_capacity(20),
            Section::new("S3", "T1").with_capacity(150),
        ];
        let problem = SchedulingProblem::new(&sections, &store).unwrap();
        let ctx = problem.ordering_context();
        assert_eq!(ctx.candidate_counts["S1"], 8);
        assert_eq!(ctx.candidate_counts["S2"], 6);
        assert_eq!(ctx.candidate_counts["S3"], 4);

        let order: Vec<&str> = RuleEngine::scarcity_first()
            .sort_indices(&sections, &ctx)
            .into_iter()
            .map(|i| sections[i].id.as_str())
            .collect();
        assert_eq!(order, vec!["S3", "S2", "S1"]);
    }
}
