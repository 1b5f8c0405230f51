//! Classroom model.
//!
//! Classrooms are the rooms sessions are held in. Each room has a seating
//! capacity, a room type, and a set of facilities that subjects may require.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A room that sessions can be assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    /// Unique room identifier.
    pub id: String,
    /// Human-readable name (e.g., "Room 101").
    #[serde(default)]
    pub name: String,
    /// Building or block (e.g., "Block A").
    #[serde(default)]
    pub building: String,
    /// Floor label (e.g., "Ground Floor").
    #[serde(default)]
    pub floor: String,
    /// Number of seats. Must be positive.
    pub capacity: u32,
    /// Room classification.
    pub room_type: RoomType,
    /// Installed facilities.
    #[serde(default)]
    pub facilities: BTreeSet<Facility>,
}

/// Room classification.
///
/// Subjects declare which room types they can be taught in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoomType {
    LectureHall,
    Laboratory,
    SeminarRoom,
    ComputerLab,
    Auditorium,
}

/// A facility installed in a room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Facility {
    WiFi,
    SmartBoard,
    Projector,
    AirConditioning,
    /// Domain-specific facility.
    Custom(String),
}

impl Classroom {
    /// Creates a new classroom.
    pub fn new(id: impl Into<String>, room_type: RoomType, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            building: String::new(),
            floor: String::new(),
            capacity,
            room_type,
            facilities: BTreeSet::new(),
        }
    }

    /// Creates a lecture hall.
    pub fn lecture_hall(id: impl Into<String>, capacity: u32) -> Self {
        Self::new(id, RoomType::LectureHall, capacity)
    }

    /// Creates a laboratory.
    pub fn laboratory(id: impl Into<String>, capacity: u32) -> Self {
        Self::new(id, RoomType::Laboratory, capacity)
    }

    /// Sets the room name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets building and floor.
    pub fn with_location(mut self, building: impl Into<String>, floor: impl Into<String>) -> Self {
        self.building = building.into();
        self.floor = floor.into();
        self
    }

    /// Adds a facility.
    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facilities.insert(facility);
        self
    }

    /// Whether every required facility is installed.
    pub fn has_facilities(&self, required: &BTreeSet<Facility>) -> bool {
        required.is_subset(&self.facilities)
    }

    /// Whether the room seats a group of the given size.
    #[inline]
    pub fn seats(&self, size: u32) -> bool {
        self.capacity >= size
    }

    /// Name for messages: the display name, or the ID if unnamed.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classroom_builder() {
        let r = Classroom::lecture_hall("R101", 60)
            .with_name("Room 101")
            .with_location("Block A", "Ground Floor")
            .with_facility(Facility::WiFi)
            .with_facility(Facility::SmartBoard);

        assert_eq!(r.id, "R101");
        assert_eq!(r.label(), "Room 101");
        assert_eq!(r.building, "Block A");
        assert_eq!(r.room_type, RoomType::LectureHall);
        assert_eq!(r.facilities.len(), 2);
        assert!(r.seats(60));
        assert!(!r.seats(61));
    }

    #[test]
    fn test_facility_subset() {
        let r = Classroom::laboratory("L1", 30).with_facility(Facility::Projector);
        let mut need = BTreeSet::new();
        assert!(r.has_facilities(&need));
        need.insert(Facility::Projector);
        assert!(r.has_facilities(&need));
        need.insert(Facility::Custom("fume hood".into()));
        assert!(!r.has_facilities(&need));
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let r = Classroom::lecture_hall("R7", 10);
        assert_eq!(r.label(), "R7");
    }
}
