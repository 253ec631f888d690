//! Direct-encoding chromosome for timetabling.
//!
//! # Encoding
//! One gene per section: the index of its candidate (classroom, slot) in
//! the problem's compatible-candidate list. Every gene is valid by
//! construction, so capacity and calendars never need repair; only
//! double bookings do.

use super::runner::Individual;
use crate::solver::Placement;

/// Candidate index per section.
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableChromosome {
    /// Candidate index per section.
    pub genes: Vec<usize>,
    /// Hard conflicts at last evaluation.
    pub hard: usize,
    /// Soft penalty at last evaluation.
    pub soft: f64,
    /// `-(hard * W_hard + soft * W_soft)`; higher is better.
    pub fitness: f64,
}

impl Individual for TimetableChromosome {
    fn fitness(&self) -> f64 {
        self.fitness
    }
}

impl TimetableChromosome {
    /// Creates an unevaluated chromosome.
    pub fn new(genes: Vec<usize>) -> Self {
        Self {
            genes,
            hard: usize::MAX,
            soft: f64::INFINITY,
            fitness: f64::NEG_INFINITY,
        }
    }

    /// Takes a placement; unplaced sections get their first candidate.
    pub fn from_placement(placement: &[Option<usize>]) -> Self {
        Self::new(placement.iter().map(|c| c.unwrap_or(0)).collect())
    }

    /// Genes as a placement.
    pub fn placement(&self) -> Placement {
        self.genes.iter().copied().map(Some).collect()
    }

    /// Marks the fitness stale after an in-place change.
    pub fn invalidate(&mut self) {
        self.hard = usize::MAX;
        self.soft = f64::INFINITY;
        self.fitness = f64::NEG_INFINITY;
    }

    /// Whether the chromosome has been evaluated since its last change.
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_finite()
    }
}
