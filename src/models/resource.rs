//! Resource model.
//!
//! Resources are the people and places a section binds to: the teacher
//! who owns it and the classroom it is placed in. Identity is by id.

use serde::{Deserialize, Serialize};

/// A teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    /// Unique classroom identifier.
    pub id: String,
    /// Number of seats.
    pub capacity: u32,
    /// Building the room belongs to.
    pub building: String,
}

impl Teacher {
    /// Creates a teacher.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Classroom {
    /// Creates a classroom with the given seat count.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            building: String::new(),
        }
    }

    /// Sets the building.
    pub fn with_building(mut self, building: impl Into<String>) -> Self {
        self.building = building.into();
        self
    }

    /// Whether the room seats at least `required` students.
    #[inline]
    pub fn fits(&self, required: u32) -> bool {
        required <= self.capacity
    }
}
