//! Timetable (solution) model.
//!
//! A candidate timetable is a set of session assignments produced by one
//! generation run, together with its conflicts and quality figures.
//! Candidates are owned by the caller once returned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use super::{format_minute, Day, SlotGrid, TimeSlot};
use crate::constraints::SoftPenalty;
use crate::generator::HeuristicProfile;

/// One scheduled session: a subject taught to a batch by a faculty member
/// in a classroom, starting at a slot and lasting `duration` periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionAssignment {
    pub subject_id: String,
    pub batch_id: String,
    /// Which of the subject's weekly sessions this is (0-indexed).
    pub session_index: u32,
    pub faculty_id: String,
    pub classroom_id: String,
    /// First occupied cell.
    pub slot: TimeSlot,
    /// Number of consecutive periods.
    pub duration: u32,
}

impl SessionAssignment {
    /// Creates a one-period assignment.
    pub fn new(
        subject_id: impl Into<String>,
        batch_id: impl Into<String>,
        faculty_id: impl Into<String>,
        classroom_id: impl Into<String>,
        slot: TimeSlot,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            batch_id: batch_id.into(),
            session_index: 0,
            faculty_id: faculty_id.into(),
            classroom_id: classroom_id.into(),
            slot,
            duration: 1,
        }
    }

    /// Sets the duration in periods.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the session index.
    pub fn with_session_index(mut self, index: u32) -> Self {
        self.session_index = index;
        self
    }

    /// Period indices covered on `slot.day`.
    #[inline]
    pub fn periods(&self) -> Range<usize> {
        self.slot.period..self.slot.period.saturating_add(self.duration as usize)
    }

    /// Cells covered, in order.
    pub fn slots(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.periods().map(move |p| TimeSlot::new(self.slot.day, p))
    }

    /// Whether this assignment covers a cell.
    pub fn covers(&self, slot: TimeSlot) -> bool {
        slot.day == self.slot.day && self.periods().contains(&slot.period)
    }

    /// Whether two assignments share at least one cell.
    pub fn overlaps(&self, other: &Self) -> bool {
        let (a, b) = (self.periods(), other.periods());
        self.slot.day == other.slot.day && a.start < b.end && b.start < a.end
    }

    /// Sort key independent of the session index, used to compare
    /// assignment multisets.
    pub(crate) fn identity(&self) -> (&str, &str, &str, &str, TimeSlot, u32) {
        (
            &self.subject_id,
            &self.batch_id,
            &self.faculty_id,
            &self.classroom_id,
            self.slot,
            self.duration,
        )
    }
}

/// Classification of timetable conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Two sessions in one room at the same time.
    RoomDoubleBooked,
    /// A faculty member teaching two sessions at the same time.
    FacultyDoubleBooked,
    /// A batch attending two sessions at the same time.
    BatchDoubleBooked,
    /// A faculty member over their daily or weekly hour cap.
    FacultyOverload,
    /// A batch over its sessions-per-day cap.
    BatchOverload,
    /// Batch larger than the room.
    RoomCapacityExceeded,
    /// Room type, facilities, or explicit room list not matching the subject.
    RoomUnsuitable,
    /// Faculty member not qualified or not listed for the subject.
    FacultyUnqualified,
    /// Session outside the faculty member's availability.
    FacultyUnavailable,
    /// Session in a break, reserved, or off-grid cell.
    ReservedSlot,
    /// A required session could not be placed.
    UnplaceableSession,
    /// A session the batch doesn't need, or one scheduled twice.
    SurplusSession,
}

impl ConflictKind {
    /// Default severity for this kind.
    pub fn severity(&self) -> Severity {
        match self {
            ConflictKind::RoomDoubleBooked
            | ConflictKind::FacultyDoubleBooked
            | ConflictKind::BatchDoubleBooked
            | ConflictKind::RoomCapacityExceeded
            | ConflictKind::ReservedSlot
            | ConflictKind::UnplaceableSession => Severity::High,
            ConflictKind::FacultyOverload
            | ConflictKind::SurplusSession
            | ConflictKind::FacultyUnqualified
            | ConflictKind::FacultyUnavailable => Severity::Medium,
            ConflictKind::BatchOverload | ConflictKind::RoomUnsuitable => Severity::Low,
        }
    }

    /// Short display name (e.g., "Room Conflict").
    pub fn title(&self) -> &'static str {
        match self {
            ConflictKind::RoomDoubleBooked => "Room Conflict",
            ConflictKind::FacultyDoubleBooked => "Faculty Conflict",
            ConflictKind::BatchDoubleBooked => "Batch Conflict",
            ConflictKind::FacultyOverload => "Faculty Overload",
            ConflictKind::BatchOverload => "Batch Overload",
            ConflictKind::RoomCapacityExceeded => "Room Too Small",
            ConflictKind::RoomUnsuitable => "Unsuitable Room",
            ConflictKind::FacultyUnqualified => "Unqualified Faculty",
            ConflictKind::FacultyUnavailable => "Faculty Unavailable",
            ConflictKind::ReservedSlot => "Reserved Slot",
            ConflictKind::UnplaceableSession => "Unplaceable Session",
            ConflictKind::SurplusSession => "Extra Session",
        }
    }
}

/// Conflict severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A hard-constraint violation or an unplaced session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Human-readable description.
    pub description: String,
    pub severity: Severity,
    /// Suggested fixes (at most two from the reporter).
    #[serde(default)]
    pub suggestions: Vec<Remedy>,
    /// Indices of the involved assignments in the candidate.
    #[serde(default)]
    pub assignments: Vec<usize>,
    /// The unplaced session, for `UnplaceableSession`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<UnplacedSession>,
}

impl Conflict {
    /// Creates a conflict with the kind's default severity.
    pub fn new(kind: ConflictKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            severity: kind.severity(),
            suggestions: Vec::new(),
            assignments: Vec::new(),
            session: None,
        }
    }

    /// Creates an unplaceable-session conflict.
    pub fn unplaceable(session: UnplacedSession, description: impl Into<String>) -> Self {
        let mut c = Self::new(ConflictKind::UnplaceableSession, description);
        c.session = Some(session);
        c
    }

    /// Sets the involved assignment indices.
    pub fn with_assignments(mut self, indices: Vec<usize>) -> Self {
        self.assignments = indices;
        self
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.title(), self.description)
    }
}

/// A suggested fix for one conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remedy {
    pub action: RemedyAction,
    /// Human-readable suggestion (e.g., "Use Room 102").
    pub description: String,
}

/// What a remedy changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemedyAction {
    /// Move the assignment to another room, same time and faculty member.
    UseRoom { assignment: usize, classroom_id: String },
    /// Move the assignment to another start slot, same room and faculty member.
    MoveTo { assignment: usize, slot: TimeSlot },
    /// Give the assignment to another faculty member.
    ReassignFaculty { assignment: usize, faculty_id: String },
    /// Place an unplaced session.
    Place {
        faculty_id: String,
        classroom_id: String,
        slot: TimeSlot,
    },
    /// Drop a surplus assignment.
    Remove { assignment: usize },
}

/// A required session that has no assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnplacedSession {
    pub subject_id: String,
    pub batch_id: String,
    pub session_index: u32,
    pub reason: UnplacedReason,
}

/// Why a session is unplaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnplacedReason {
    /// No faculty member is qualified and listed for the subject.
    NoQualifiedFaculty,
    /// No room fits the batch, subject type, and facilities.
    NoSuitableRoom,
    /// The grid has no start slot long enough for the session.
    NoUsableSlot,
    /// Every combination collides with sessions already placed.
    NoFeasiblePlacement,
    /// The search budget ran out first.
    BudgetExceeded,
    /// Generation was cancelled first.
    Cancelled,
    /// The session's assignment was removed after generation.
    Unassigned,
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnplacedReason::NoQualifiedFaculty => "no qualified faculty",
            UnplacedReason::NoSuitableRoom => "no suitable room",
            UnplacedReason::NoUsableSlot => "no usable time slot",
            UnplacedReason::NoFeasiblePlacement => {
                "no free faculty/room/slot combination within hour caps and availability"
            }
            UnplacedReason::BudgetExceeded => "search budget exhausted",
            UnplacedReason::Cancelled => "generation cancelled",
            UnplacedReason::Unassigned => "no assignment",
        };
        f.write_str(s)
    }
}

/// How a generation run ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    /// Every session was either placed or proven unplaceable.
    #[default]
    Complete,
    /// Node or time budget ran out; best partial state returned.
    BudgetExceeded,
    /// The caller cancelled; partial state returned.
    Cancelled,
}

/// One candidate timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Display label (e.g., "Option A").
    pub label: String,
    /// Run index within a ranking call.
    pub run: usize,
    pub seed: u64,
    pub profile: HeuristicProfile,
    pub status: GenerationStatus,
    /// Assignments in canonical (day, period, batch, subject) order.
    pub assignments: Vec<SessionAssignment>,
    /// Hard conflicts, including unplaced sessions.
    pub conflicts: Vec<Conflict>,
    /// Soft-constraint breakdown.
    pub soft: SoftPenalty,
    /// Weighted soft penalty.
    pub soft_penalty: f64,
    /// Quality score in [0, 100].
    pub score: f64,
    /// Assigned room-cells / available room-cells (0.0..1.0).
    pub room_utilization: f64,
    /// Search nodes expanded.
    pub nodes_explored: u64,
}

impl Candidate {
    /// Creates an empty candidate for a run.
    pub fn new(run: usize, seed: u64, profile: HeuristicProfile) -> Self {
        Self {
            label: String::new(),
            run,
            seed,
            profile,
            status: GenerationStatus::Complete,
            assignments: Vec::new(),
            conflicts: Vec::new(),
            soft: SoftPenalty::default(),
            soft_penalty: 0.0,
            score: 0.0,
            room_utilization: 0.0,
            nodes_explored: 0,
        }
    }

    /// Number of hard conflicts.
    #[inline]
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Whether the candidate has no hard conflicts.
    pub fn is_conflict_free(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Whether every session was placed and the search finished.
    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Complete && self.unplaced().next().is_none()
    }

    /// Unplaced sessions.
    pub fn unplaced(&self) -> impl Iterator<Item = &UnplacedSession> {
        self.conflicts.iter().filter_map(|c| c.session.as_ref())
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Assignments of one batch.
    pub fn assignments_for_batch(&self, batch_id: &str) -> Vec<&SessionAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.batch_id == batch_id)
            .collect()
    }

    /// Assignments of one faculty member.
    pub fn assignments_for_faculty(&self, faculty_id: &str) -> Vec<&SessionAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.faculty_id == faculty_id)
            .collect()
    }

    /// Assignments in one classroom.
    pub fn assignments_for_classroom(&self, classroom_id: &str) -> Vec<&SessionAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.classroom_id == classroom_id)
            .collect()
    }

    /// Sorts assignments into canonical order.
    pub(crate) fn sort_assignments(&mut self) {
        self.assignments.sort_by(|a, b| {
            (a.slot, &a.batch_id, &a.subject_id, a.session_index).cmp(&(
                b.slot,
                &b.batch_id,
                &b.subject_id,
                b.session_index,
            ))
        });
    }

    /// Assignment multiset key (ignores session indices and order).
    pub(crate) fn assignment_key(&self) -> Vec<(&str, &str, &str, &str, TimeSlot, u32)> {
        let mut key: Vec<_> = self.assignments.iter().map(|a| a.identity()).collect();
        key.sort();
        key
    }

    /// Flat export records with formatted times.
    pub fn to_records(&self, grid: &SlotGrid) -> Vec<AssignmentRecord> {
        self.assignments
            .iter()
            .map(|a| AssignmentRecord::from_assignment(a, grid))
            .collect()
    }

    /// Day × period grid over all batches.
    pub fn to_grid(&self, grid: &SlotGrid) -> TimetableGrid {
        TimetableGrid::build(grid, self.assignments.iter())
    }

    /// Day × period grid for one batch.
    pub fn batch_grid(&self, grid: &SlotGrid, batch_id: &str) -> TimetableGrid {
        TimetableGrid::build(
            grid,
            self.assignments.iter().filter(|a| a.batch_id == batch_id),
        )
    }
}

/// Flat, export-friendly view of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub subject_id: String,
    pub batch_id: String,
    pub session_index: u32,
    pub faculty_id: String,
    pub classroom_id: String,
    pub day: Day,
    pub period: usize,
    pub duration: u32,
    /// "HH:MM".
    pub start: String,
    /// "HH:MM".
    pub end: String,
}

impl AssignmentRecord {
    fn from_assignment(a: &SessionAssignment, grid: &SlotGrid) -> Self {
        let last = TimeSlot::new(a.slot.day, a.periods().end.saturating_sub(1));
        let start = grid.bounds(a.slot).map(|(s, _)| format_minute(s));
        let end = grid.bounds(last).map(|(_, e)| format_minute(e));
        Self {
            subject_id: a.subject_id.clone(),
            batch_id: a.batch_id.clone(),
            session_index: a.session_index,
            faculty_id: a.faculty_id.clone(),
            classroom_id: a.classroom_id.clone(),
            day: a.slot.day,
            period: a.slot.period,
            duration: a.duration,
            start: start.unwrap_or_default(),
            end: end.unwrap_or_default(),
        }
    }
}

/// Day × period rendering of a timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableGrid {
    pub days: Vec<Day>,
    /// One row per period.
    pub rows: Vec<GridRow>,
}

/// One period across all days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    /// Period label (e.g., "09:00-10:00").
    pub period: String,
    /// One cell per day, in `TimetableGrid::days` order.
    pub cells: Vec<GridCell>,
}

/// Contents of one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridCell {
    /// Break or reserved cell.
    Reserved { label: String },
    Free,
    Sessions(Vec<GridEntry>),
}

/// A session occupying a grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub subject_id: String,
    pub batch_id: String,
    pub faculty_id: String,
    pub classroom_id: String,
    /// True on every cell after the session's first.
    pub continuation: bool,
}

impl TimetableGrid {
    fn build<'a>(grid: &SlotGrid, assignments: impl Iterator<Item = &'a SessionAssignment>) -> Self {
        let mut cells: Vec<Vec<Vec<GridEntry>>> =
            vec![vec![Vec::new(); grid.day_count()]; grid.period_count()];

        for a in assignments {
            let Some(d) = grid.day_position(a.slot.day) else {
                continue;
            };
            let on_grid = a.periods().start..a.periods().end.min(grid.period_count());
            for p in on_grid {
                if let Some(row) = cells.get_mut(p) {
                    row[d].push(GridEntry {
                        subject_id: a.subject_id.clone(),
                        batch_id: a.batch_id.clone(),
                        faculty_id: a.faculty_id.clone(),
                        classroom_id: a.classroom_id.clone(),
                        continuation: p != a.slot.period,
                    });
                }
            }
        }

        let rows = cells
            .into_iter()
            .enumerate()
            .map(|(p, row)| {
                let period = &grid.periods[p];
                let cells = row
                    .into_iter()
                    .enumerate()
                    .map(|(d, entries)| {
                        let slot = TimeSlot::new(grid.days[d], p);
                        if !entries.is_empty() {
                            GridCell::Sessions(entries)
                        } else if period.is_break() {
                            GridCell::Reserved {
                                label: period.display_label(),
                            }
                        } else if grid.reserved.contains(&slot) {
                            GridCell::Reserved {
                                label: "RESERVED".into(),
                            }
                        } else {
                            GridCell::Free
                        }
                    })
                    .collect();
                GridRow {
                    period: period.display_label(),
                    cells,
                }
            })
            .collect();

        Self {
            days: grid.days.clone(),
            rows,
        }
    }

    /// Cell at (day, period).
    pub fn cell(&self, slot: TimeSlot) -> Option<&GridCell> {
        let d = self.days.iter().position(|x| *x == slot.day)?;
        self.rows.get(slot.period).and_then(|r| r.cells.get(d))
    }
}
