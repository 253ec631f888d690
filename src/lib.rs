//! Timetable conflict detection and auto-scheduling.
//!
//! Given course sections that each need a (classroom, time slot, week
//! range) assignment, this crate detects conflicts in manually edited
//! schedules, proposes fixes, and builds schedules automatically with a
//! caller-chosen algorithm running as a cancellable job.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Teacher`, `Classroom`, `TimeSlot`,
//!   `WeekRange`, `Section`, `Assignment`, `ScheduleState`, `Conflict`
//! - **`constraints`**: Time grid, resource calendars, soft preferences
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling refs)
//! - **`detection`**: Conflict detection for one assignment or a whole schedule
//! - **`ordering`**: Section ordering rules for constructive placement
//! - **`solver`**: Greedy and backtracking strategies, budgets, outcomes
//! - **`ga`**: Genetic strategy
//! - **`advisor`**: Ranked alternatives for a conflict
//! - **`kpi`**: Schedule quality metrics
//! - **`jobs`**: Bounded pool of cancellable scheduling jobs
//! - **`engine`**: Per-semester facade over all of the above
//!
//! # Example
//!
//! ```
//! use u_timetable::constraints::ConstraintStore;
//! use u_timetable::models::{Classroom, Section, Teacher};
//! use u_timetable::solver::{solve, SolveBudget, Strategy};
//!
//! let store = ConstraintStore::new("F26")
//!     .with_teacher(Teacher::new("T1"))
//!     .with_classroom(Classroom::new("R1", 40))
//!     .with_slots(ConstraintStore::weekly_grid(5, 4, 8, 2));
//! let sections = vec![
//!     Section::new("CS101-A", "T1").with_capacity(35),
//!     Section::new("CS101-B", "T1").with_capacity(35),
//! ];
//!
//! let outcome = solve(&Strategy::Greedy, &sections, &store, SolveBudget::default()).unwrap();
//! assert!(outcome.is_feasible());
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"

pub mod advisor;
pub mod config;
pub mod constraints;
pub mod detection;
pub mod engine;
pub mod error;
pub mod ga;
pub mod jobs;
pub mod kpi;
pub mod models;
pub mod ordering;
pub mod solver;
pub mod validation;

pub use config::EngineConfig;
pub use engine::{JobParams, TimetableEngine};
pub use error::{EngineError, EngineResult};
