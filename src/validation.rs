//! Input validation for timetable problems.
//!
//! Checks structural integrity of the reference data before generation.
//! Detects:
//! - Malformed slot grids (no days, empty or overlapping periods)
//! - Duplicate IDs
//! - Non-positive capacities, batch sizes, session counts and durations
//! - References to classrooms, faculty or subjects that don't exist
//! - Availability, preference or reserved cells outside the grid
//!
//! Infeasibility (e.g., more sessions than free slots) is not a validation
//! error; it surfaces as unplaceable sessions in the generated candidate.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::{SlotGrid, TimeSlot, TimetableProblem};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities of one kind share an ID.
    DuplicateId,
    /// An ID refers to an entity that doesn't exist.
    InvalidReference,
    /// A count or size that must be positive is zero.
    InvalidValue,
    /// The slot grid itself is malformed.
    InvalidGrid,
    /// A cell lies outside the slot grid.
    InvalidSlot,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a timetable problem.
///
/// Checks:
/// 1. The grid has days, periods, and well-formed non-overlapping periods
/// 2. No duplicate classroom, faculty, subject or batch IDs
/// 3. Capacities, batch sizes, sessions per week and durations are positive
/// 4. Every subject, faculty and classroom reference resolves
/// 5. Every availability, preference and reserved cell is on the grid
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_problem(problem: &TimetableProblem) -> ValidationResult {
    let mut errors = Vec::new();

    validate_grid(&problem.grid, &mut errors);

    let classroom_ids = collect_ids(
        problem.classrooms.iter().map(|c| c.id.as_str()),
        "classroom",
        &mut errors,
    );
    let faculty_ids = collect_ids(
        problem.faculty.iter().map(|f| f.id.as_str()),
        "faculty",
        &mut errors,
    );
    let subject_ids = collect_ids(
        problem.subjects.iter().map(|s| s.id.as_str()),
        "subject",
        &mut errors,
    );
    collect_ids(
        problem.batches.iter().map(|b| b.id.as_str()),
        "batch",
        &mut errors,
    );

    for room in &problem.classrooms {
        if room.capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidValue,
                format!("Classroom '{}' has zero capacity", room.id),
            ));
        }
    }

    for subject in &problem.subjects {
        if subject.sessions_per_week == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidValue,
                format!("Subject '{}' requires no sessions per week", subject.id),
            ));
        }
        if subject.session_duration == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidValue,
                format!("Subject '{}' has zero session duration", subject.id),
            ));
        }
        for fid in &subject.faculty_ids {
            if !faculty_ids.contains(fid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Subject '{}' references unknown faculty '{}'", subject.id, fid),
                ));
            }
        }
        for rid in &subject.room_ids {
            if !classroom_ids.contains(rid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Subject '{}' references unknown classroom '{}'", subject.id, rid),
                ));
            }
        }
    }

    for member in &problem.faculty {
        for sid in &member.subjects {
            if !subject_ids.contains(sid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Faculty '{}' references unknown subject '{}'", member.id, sid),
                ));
            }
        }
        let cells = member
            .availability
            .iter()
            .flatten()
            .chain(member.preferred.iter());
        for slot in cells {
            check_on_grid(&problem.grid, *slot, &format!("Faculty '{}'", member.id), &mut errors);
        }
    }

    for batch in &problem.batches {
        if batch.size == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidValue,
                format!("Batch '{}' has zero students", batch.id),
            ));
        }
        let mut seen = HashSet::new();
        for sid in &batch.subjects {
            if !subject_ids.contains(sid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Batch '{}' references unknown subject '{}'", batch.id, sid),
                ));
            } else if !seen.insert(sid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateId,
                    format!("Batch '{}' lists subject '{}' twice", batch.id, sid),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_ids<'a>(
    ids: impl Iterator<Item = &'a str>,
    entity: &str,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
    seen
}

fn validate_grid(grid: &SlotGrid, errors: &mut Vec<ValidationError>) {
    if grid.days.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidGrid,
            "Slot grid has no days",
        ));
    }
    let mut days = HashSet::new();
    for day in &grid.days {
        if !days.insert(*day) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidGrid,
                format!("Slot grid lists {day} twice"),
            ));
        }
    }
    if grid.periods.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidGrid,
            "Slot grid has no periods",
        ));
    }
    for (i, period) in grid.periods.iter().enumerate() {
        if period.end_minute <= period.start_minute {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidGrid,
                format!("Period {} ends before it starts", i + 1),
            ));
        }
        if period.end_minute > 24 * 60 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidGrid,
                format!("Period {} ends after midnight", i + 1),
            ));
        }
    }
    for (i, pair) in grid.periods.windows(2).enumerate() {
        if pair[1].start_minute < pair[0].end_minute {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidGrid,
                format!("Period {} overlaps or precedes period {}", i + 2, i + 1),
            ));
        }
    }
    for slot in &grid.reserved {
        check_on_grid(grid, *slot, "Reserved cell", errors);
    }
}

fn check_on_grid(grid: &SlotGrid, slot: TimeSlot, owner: &str, errors: &mut Vec<ValidationError>) {
    if !grid.contains(slot) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidSlot,
            format!("{owner} refers to {slot}, which is not on the grid"),
        ));
    }
}
