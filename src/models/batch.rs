//! Student batch model.

use serde::{Deserialize, Serialize};

/// A group of students that attends sessions together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch identifier.
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub semester: u32,
    /// Number of students. Must fit the assigned room.
    pub size: u32,
    /// IDs of subjects this batch studies.
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Cap on sessions per day. `None` = uncapped.
    #[serde(default)]
    pub max_sessions_per_day: Option<u32>,
}

impl Batch {
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            department: String::new(),
            semester: 0,
            size,
            subjects: Vec::new(),
            max_sessions_per_day: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn with_semester(mut self, semester: u32) -> Self {
        self.semester = semester;
        self
    }

    /// Adds a subject to the curriculum.
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subjects.push(subject_id.into());
        self
    }

    /// Caps sessions per day.
    pub fn with_max_sessions_per_day(mut self, max: u32) -> Self {
        self.max_sessions_per_day = Some(max);
        self
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder() {
        let b = Batch::new("CSE-3A", 45)
            .with_name("CSE 3rd Sem A")
            .with_department("Computer Science")
            .with_semester(3)
            .with_subject("DS")
            .with_subject("OS")
            .with_max_sessions_per_day(6);

        assert_eq!(b.label(), "CSE 3rd Sem A");
        assert_eq!(b.size, 45);
        assert_eq!(b.semester, 3);
        assert_eq!(b.subjects, vec!["DS", "OS"]);
        assert_eq!(b.max_sessions_per_day, Some(6));
    }
}
