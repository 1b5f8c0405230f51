//! Subject model.
//!
//! A subject is taught to each batch that studies it as a fixed number of
//! sessions per week, each lasting a fixed number of consecutive periods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Facility, RoomType};

/// A subject (course) to be timetabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique subject identifier.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Catalogue code (e.g., "CS201").
    #[serde(default)]
    pub code: String,
    pub subject_type: SubjectType,
    #[serde(default)]
    pub department: String,
    /// Sessions required per week for each batch.
    pub sessions_per_week: u32,
    /// Length of one session in periods.
    #[serde(default = "default_duration")]
    pub session_duration: u32,
    /// Room types the subject can be taught in.
    /// Empty = the defaults for `subject_type`.
    #[serde(default)]
    pub room_types: BTreeSet<RoomType>,
    /// Facilities the room must have.
    #[serde(default)]
    pub required_facilities: BTreeSet<Facility>,
    /// Explicit eligible faculty. Empty = any qualified member.
    #[serde(default)]
    pub faculty_ids: Vec<String>,
    /// Explicit eligible rooms. Empty = any room of an eligible type.
    #[serde(default)]
    pub room_ids: Vec<String>,
}

fn default_duration() -> u32 {
    1
}

/// Subject delivery type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectType {
    Theory,
    Practical,
    Tutorial,
}

impl SubjectType {
    /// Room types a subject of this type uses unless told otherwise.
    pub fn default_room_types(&self) -> BTreeSet<RoomType> {
        let types: &[RoomType] = match self {
            SubjectType::Theory => &[
                RoomType::LectureHall,
                RoomType::SeminarRoom,
                RoomType::Auditorium,
            ],
            SubjectType::Practical => &[RoomType::Laboratory, RoomType::ComputerLab],
            SubjectType::Tutorial => &[RoomType::SeminarRoom, RoomType::LectureHall],
        };
        types.iter().copied().collect()
    }
}

impl Subject {
    /// Creates a subject with the default room types for its type.
    pub fn new(id: impl Into<String>, subject_type: SubjectType, sessions_per_week: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            code: String::new(),
            subject_type,
            department: String::new(),
            sessions_per_week,
            session_duration: 1,
            room_types: subject_type.default_room_types(),
            required_facilities: BTreeSet::new(),
            faculty_ids: Vec::new(),
            room_ids: Vec::new(),
        }
    }

    /// Creates a theory subject.
    pub fn theory(id: impl Into<String>, sessions_per_week: u32) -> Self {
        Self::new(id, SubjectType::Theory, sessions_per_week)
    }

    /// Creates a practical subject.
    pub fn practical(id: impl Into<String>, sessions_per_week: u32) -> Self {
        Self::new(id, SubjectType::Practical, sessions_per_week)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// Sets the session length in periods.
    pub fn with_duration(mut self, periods: u32) -> Self {
        self.session_duration = periods;
        self
    }

    /// Replaces the eligible room types.
    pub fn with_room_types(mut self, types: impl IntoIterator<Item = RoomType>) -> Self {
        self.room_types = types.into_iter().collect();
        self
    }

    /// Adds a required facility.
    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.required_facilities.insert(facility);
        self
    }

    /// Restricts teaching to the given faculty.
    pub fn with_faculty(mut self, ids: Vec<String>) -> Self {
        self.faculty_ids = ids;
        self
    }

    /// Restricts teaching to the given rooms.
    pub fn with_rooms(mut self, ids: Vec<String>) -> Self {
        self.room_ids = ids;
        self
    }

    /// Whether a room type is allowed.
    pub fn allows_room_type(&self, room_type: RoomType) -> bool {
        if self.room_types.is_empty() {
            self.subject_type.default_room_types().contains(&room_type)
        } else {
            self.room_types.contains(&room_type)
        }
    }

    /// Name for messages: code, then name, then ID.
    pub fn label(&self) -> &str {
        if !self.code.is_empty() {
            &self.code
        } else if !self.name.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }
}
