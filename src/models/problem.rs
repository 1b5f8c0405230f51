//! Input bundle for one generation call.

use serde::{Deserialize, Serialize};

use super::{Batch, Classroom, Faculty, SlotGrid, Subject};

/// Institution data for one timetable generation.
///
/// Borrowed read-only by the engine for the duration of a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimetableProblem {
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
    #[serde(default)]
    pub faculty: Vec<Faculty>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    /// Weekly grid. Defaults to [`SlotGrid::weekly_default`].
    #[serde(default)]
    pub grid: SlotGrid,
}

impl TimetableProblem {
    /// Creates an empty problem on the default weekly grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slot grid.
    pub fn with_grid(mut self, grid: SlotGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_classroom(mut self, classroom: Classroom) -> Self {
        self.classrooms.push(classroom);
        self
    }

    pub fn with_faculty(mut self, faculty: Faculty) -> Self {
        self.faculty.push(faculty);
        self
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batches.push(batch);
        self
    }

    pub fn classroom(&self, id: &str) -> Option<&Classroom> {
        self.classrooms.iter().find(|c| c.id == id)
    }

    pub fn faculty_member(&self, id: &str) -> Option<&Faculty> {
        self.faculty.iter().find(|f| f.id == id)
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn batch(&self, id: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == id)
    }

    /// Total number of sessions to schedule per week.
    pub fn required_sessions(&self) -> usize {
        self.batches
            .iter()
            .flat_map(|b| b.subjects.iter())
            .filter_map(|sid| self.subject(sid))
            .map(|s| s.sessions_per_week as usize)
            .sum()
    }
}
