//! Section ordering rules and rule engine.
//!
//! Decides the order in which constructive solvers place sections. Hard
//! to place sections go first so they are not starved by easy ones.
//!
//! # Usage
//!
//! ```
//! use u_timetable::ordering::{rules, OrderingContext, RuleEngine};
//!
//! let engine = RuleEngine::new()
//!     .with_rule(rules::Scarcity)
//!     .with_tie_breaker(rules::TeacherLoad);
//!
//! let context = OrderingContext::default();
//! // let order = engine.sort_indices(&sections, &context);
//! ```
//!
//! # References
//!
//! - Brélaz (1979), "New methods to color the vertices of a graph" (DSATUR)
//! - Carter, Laporte & Lee (1996), "Examination timetabling: Algorithmic strategies and applications"

mod context;
mod engine;
pub mod rules;

pub use context::OrderingContext;
pub use engine::{RuleEngine, TieBreaker};

use crate::models::Section;
use std::fmt::Debug;

/// Score returned by an ordering rule.
///
/// Lower scores = placed earlier.
pub type RuleScore = f64;

/// A rule that evaluates how urgently a section should be placed.
///
/// # Score Convention
/// **Lower score = placed first.**
pub trait SectionRule: Send + Sync + Debug {
    /// Rule name (e.g., "SCARCITY").
    fn name(&self) -> &'static str;

    /// Evaluates a section given the precomputed context.
    fn evaluate(&self, section: &Section, context: &OrderingContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
