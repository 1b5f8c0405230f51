//! Timetabling domain models.
//!
//! Provides the reference data a timetable is built from (classrooms,
//! faculty, subjects, batches, the weekly slot grid) and the result types
//! the engine hands back (session assignments, candidates, conflicts).
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School | Training Center |
//! |-------------|-----------|--------|-----------------|
//! | Classroom | Lecture hall / lab | Classroom | Training room |
//! | Faculty | Professor | Teacher | Trainer |
//! | Subject | Course | Subject | Module |
//! | Batch | Section / cohort | Class / grade | Group |

mod batch;
mod classroom;
mod faculty;
mod grid;
mod problem;
mod subject;
mod timetable;

pub use batch::Batch;
pub use classroom::{Classroom, Facility, RoomType};
pub use faculty::Faculty;
pub use grid::{format_minute, Day, Period, PeriodKind, SlotGrid, TimeSlot};
pub use problem::TimetableProblem;
pub use subject::{Subject, SubjectType};
pub use timetable::{
    AssignmentRecord, Candidate, Conflict, ConflictKind, GenerationStatus, GridCell, GridEntry,
    GridRow, Remedy, RemedyAction, SessionAssignment, Severity, TimetableGrid, UnplacedReason,
    UnplacedSession,
};
