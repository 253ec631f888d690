//! Timetabling domain models.
//!
//! Immutable value types for resources, time and assignments. No
//! scheduling logic lives here.
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School |
//! |-------------|------------|--------|
//! | Section | Course offering | Class period |
//! | Classroom | Lecture hall | Room |
//! | StudentGroup | Cohort / program year | Homeroom |
//! | WeekRange | Semester weeks | Term weeks |

mod conflict;
mod resource;
mod schedule;
mod section;
mod time;

pub use conflict::{Conflict, ConflictKind};
pub use resource::{Classroom, Teacher};
pub use schedule::{Assignment, ScheduleState};
pub use section::Section;
pub use time::{TimeSlot, WeekRange};
