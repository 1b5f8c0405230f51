//! Faculty model.
//!
//! A faculty member teaches the subjects they are qualified for, within
//! daily and weekly hour caps and an optional availability mask.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::TimeSlot;

/// A faculty member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    /// Unique faculty identifier.
    pub id: String,
    /// Human-readable name (e.g., "Dr. John Smith").
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    /// IDs of subjects this member may teach.
    #[serde(default)]
    pub subjects: BTreeSet<String>,
    /// Teaching hours cap per day.
    pub max_hours_per_day: u32,
    /// Teaching hours cap per week.
    pub max_hours_per_week: u32,
    /// Cells this member can teach in. `None` = every cell.
    #[serde(default)]
    pub availability: Option<BTreeSet<TimeSlot>>,
    /// Cells this member prefers (soft). Empty = no preference.
    #[serde(default)]
    pub preferred: BTreeSet<TimeSlot>,
}

impl Faculty {
    /// Creates a faculty member with the given caps.
    pub fn new(id: impl Into<String>, max_hours_per_day: u32, max_hours_per_week: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            department: String::new(),
            subjects: BTreeSet::new(),
            max_hours_per_day,
            max_hours_per_week,
            availability: None,
            preferred: BTreeSet::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// Adds a qualified subject.
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subjects.insert(subject_id.into());
        self
    }

    /// Restricts availability to the given cells.
    pub fn with_availability(mut self, slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        self.availability = Some(slots.into_iter().collect());
        self
    }

    /// Adds preferred cells.
    pub fn with_preferred(mut self, slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        self.preferred.extend(slots);
        self
    }

    /// Whether this member is qualified for a subject.
    pub fn is_qualified(&self, subject_id: &str) -> bool {
        self.subjects.contains(subject_id)
    }

    /// Whether this member can teach in a cell.
    pub fn is_available(&self, slot: TimeSlot) -> bool {
        match &self.availability {
            None => true,
            Some(cells) => cells.contains(&slot),
        }
    }

    /// Whether a cell goes against a stated preference.
    pub fn dislikes(&self, slot: TimeSlot) -> bool {
        !self.preferred.is_empty() && !self.preferred.contains(&slot)
    }

    /// Daily cap in minutes.
    #[inline]
    pub fn max_minutes_per_day(&self) -> u32 {
        self.max_hours_per_day.saturating_mul(60)
    }

    /// Weekly cap in minutes.
    #[inline]
    pub fn max_minutes_per_week(&self) -> u32 {
        self.max_hours_per_week.saturating_mul(60)
    }

    /// Name for messages.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
