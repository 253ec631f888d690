//! Time model: weekly time slots and semester week ranges.
//!
//! # Time Model
//! A semester is a grid of recurring weekly [`TimeSlot`]s (day × period),
//! repeated over a numbered range of weeks. A class occupies one slot on
//! every week of its [`WeekRange`].
//!
//! Two placements collide iff they use the same slot ordinal AND their
//! week ranges overlap.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// A recurring weekly time slot.
///
/// The `ordinal` identifies the slot across the whole weekly grid, so
/// period 1 on Monday and period 1 on Tuesday have different ordinals.
/// Equality, hashing and ordering look at the ordinal only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Grid-wide unique slot index.
    pub ordinal: u32,
    /// Day of week (1 = Monday .. 7 = Sunday).
    pub day: u8,
    /// Start time of day.
    pub start: NaiveTime,
    /// End time of day.
    pub end: NaiveTime,
}

impl TimeSlot {
    /// Creates a new time slot.
    pub fn new(ordinal: u32, day: u8, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            ordinal,
            day,
            start,
            end,
        }
    }

    /// Whether the day-of-week is within 1..=7 and start precedes end.
    pub fn is_well_formed(&self) -> bool {
        (1..=7).contains(&self.day) && self.start < self.end
    }

    /// Hour of day at which the slot starts.
    #[inline]
    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }

    /// Whether `other` immediately follows this slot on the same day.
    pub fn is_followed_by(&self, other: &Self) -> bool {
        self.day == other.day && self.ordinal.checked_add(1) == Some(other.ordinal)
    }
}

impl PartialEq for TimeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

impl Eq for TimeSlot {}

impl Hash for TimeSlot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordinal.hash(state);
    }
}

impl PartialOrd for TimeSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal.cmp(&other.ordinal)
    }
}

/// An inclusive interval of semester week numbers `[start, end]`.
///
/// Defaults to weeks 1..=16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekRange {
    /// First week (inclusive).
    pub start: u32,
    /// Last week (inclusive).
    pub end: u32,
}

impl Default for WeekRange {
    fn default() -> Self {
        Self::new(1, 16)
    }
}

impl WeekRange {
    /// Creates a new week range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A single week.
    pub fn single(week: u32) -> Self {
        Self::new(week, week)
    }

    /// Whether `start <= end`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Number of weeks covered (0 if invalid).
    #[inline]
    pub fn len(&self) -> u32 {
        if self.is_valid() {
            self.end - self.start + 1
        } else {
            0
        }
    }

    /// Whether the range covers no week.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a week number falls within this range.
    #[inline]
    pub fn contains(&self, week: u32) -> bool {
        week >= self.start && week <= self.end
    }

    /// Whether two ranges share at least one week.
    ///
    /// `max(startA, startB) <= min(endA, endB)`.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start.max(other.start) <= self.end.min(other.end)
    }

    /// Whether `other` lies completely inside this range.
    pub fn covers(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}
