//! Index-based view of a problem.
//!
//! Maps IDs to positions and precomputes per-cell tables so the search and
//! the ledger work on integers instead of strings. Cells use the grid's
//! row-major layout: `day * periods + period`.

use std::collections::HashMap;
use std::ops::Range;

use crate::models::{SessionAssignment, SlotGrid, TimeSlot, TimetableProblem};

/// A session assignment resolved to entity and grid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub subject: usize,
    pub batch: usize,
    pub faculty: usize,
    pub room: usize,
    /// Day position in the grid.
    pub day: usize,
    /// First period.
    pub start: usize,
    pub duration: usize,
    /// Teaching minutes covered.
    pub minutes: u32,
}

impl Placement {
    /// Flat cells covered.
    #[inline]
    pub fn cells(&self, periods: usize) -> Range<usize> {
        let first = self.day * periods + self.start;
        first..first + self.duration
    }
}

pub(crate) struct ProblemIndex<'a> {
    pub problem: &'a TimetableProblem,
    rooms: HashMap<&'a str, usize>,
    faculty: HashMap<&'a str, usize>,
    subjects: HashMap<&'a str, usize>,
    batches: HashMap<&'a str, usize>,
    pub days: usize,
    pub periods: usize,
    period_minutes: Vec<u32>,
    /// Period `p` starts when period `p - 1` ends.
    joins_previous: Vec<bool>,
    assignable: Vec<bool>,
    /// Faculty × cell.
    open: Vec<bool>,
    /// Faculty × cell.
    disliked: Vec<bool>,
}

fn positions<'a>(ids: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    let mut map = HashMap::new();
    for (i, id) in ids.enumerate() {
        map.entry(id).or_insert(i);
    }
    map
}

impl<'a> ProblemIndex<'a> {
    pub fn new(problem: &'a TimetableProblem) -> Self {
        let grid = &problem.grid;
        let days = grid.day_count();
        let periods = grid.period_count();

        let period_minutes = grid.periods.iter().map(|p| p.duration_minutes()).collect();
        let joins_previous = (0..periods)
            .map(|p| p > 0 && grid.periods[p - 1].end_minute == grid.periods[p].start_minute)
            .collect();
        let assignable = grid.slots().map(|s| grid.is_assignable(s)).collect();

        let mut open = Vec::with_capacity(problem.faculty.len() * days * periods);
        let mut disliked = Vec::with_capacity(problem.faculty.len() * days * periods);
        for member in &problem.faculty {
            for slot in grid.slots() {
                open.push(member.is_available(slot));
                disliked.push(member.dislikes(slot));
            }
        }

        Self {
            problem,
            rooms: positions(problem.classrooms.iter().map(|c| c.id.as_str())),
            faculty: positions(problem.faculty.iter().map(|f| f.id.as_str())),
            subjects: positions(problem.subjects.iter().map(|s| s.id.as_str())),
            batches: positions(problem.batches.iter().map(|b| b.id.as_str())),
            days,
            periods,
            period_minutes,
            joins_previous,
            assignable,
            open,
            disliked,
        }
    }

    #[inline]
    pub fn grid(&self) -> &'a SlotGrid {
        &self.problem.grid
    }

    #[inline]
    pub fn cells(&self) -> usize {
        self.days * self.periods
    }

    pub fn room(&self, id: &str) -> Option<usize> {
        self.rooms.get(id).copied()
    }

    pub fn faculty(&self, id: &str) -> Option<usize> {
        self.faculty.get(id).copied()
    }

    pub fn subject(&self, id: &str) -> Option<usize> {
        self.subjects.get(id).copied()
    }

    pub fn batch(&self, id: &str) -> Option<usize> {
        self.batches.get(id).copied()
    }

    #[inline]
    pub fn period_minutes(&self, period: usize) -> u32 {
        self.period_minutes.get(period).copied().unwrap_or(0)
    }

    #[inline]
    pub fn joins_previous(&self, period: usize) -> bool {
        self.joins_previous.get(period).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_assignable(&self, cell: usize) -> bool {
        self.assignable.get(cell).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_open(&self, faculty: usize, cell: usize) -> bool {
        self.open[faculty * self.cells() + cell]
    }

    #[inline]
    pub fn is_disliked(&self, faculty: usize, cell: usize) -> bool {
        self.disliked[faculty * self.cells() + cell]
    }

    /// Teaching minutes of `duration` periods from `start`.
    pub fn span_minutes(&self, start: usize, duration: usize) -> u32 {
        (start..start + duration).map(|p| self.period_minutes(p)).sum()
    }

    /// Whether a faculty member may teach a subject: qualified, and listed
    /// when the subject names its faculty.
    pub fn faculty_eligible(&self, faculty: usize, subject: usize) -> bool {
        let member = &self.problem.faculty[faculty];
        let subject = &self.problem.subjects[subject];
        member.is_qualified(&subject.id)
            && (subject.faculty_ids.is_empty() || subject.faculty_ids.contains(&member.id))
    }

    /// Whether a room matches a subject's type, facilities and room list.
    pub fn room_suits(&self, room: usize, subject: usize) -> bool {
        let room = &self.problem.classrooms[room];
        let subject = &self.problem.subjects[subject];
        subject.allows_room_type(room.room_type)
            && room.has_facilities(&subject.required_facilities)
            && (subject.room_ids.is_empty() || subject.room_ids.contains(&room.id))
    }

    pub fn room_eligible(&self, room: usize, subject: usize, batch: usize) -> bool {
        self.problem.classrooms[room].seats(self.problem.batches[batch].size)
            && self.room_suits(room, subject)
    }

    pub fn eligible_faculty(&self, subject: usize) -> Vec<usize> {
        (0..self.problem.faculty.len())
            .filter(|&f| self.faculty_eligible(f, subject))
            .collect()
    }

    pub fn eligible_rooms(&self, subject: usize, batch: usize) -> Vec<usize> {
        (0..self.problem.classrooms.len())
            .filter(|&r| self.room_eligible(r, subject, batch))
            .collect()
    }

    /// (day, period) starts where a session of `duration` periods fits.
    pub fn valid_starts(&self, duration: usize) -> Vec<(usize, usize)> {
        let grid = self.grid();
        let mut starts = Vec::new();
        for (d, &day) in grid.days.iter().enumerate() {
            for p in 0..self.periods {
                if grid.session_span(TimeSlot::new(day, p), duration).is_some() {
                    starts.push((d, p));
                }
            }
        }
        starts
    }

    /// Resolves an assignment, or `None` if an ID is unknown or the session
    /// runs off the grid.
    pub fn resolve(&self, a: &SessionAssignment) -> Option<Placement> {
        let day = self.grid().day_position(a.slot.day)?;
        let duration = a.duration as usize;
        if duration == 0 || a.slot.period.saturating_add(duration) > self.periods {
            return None;
        }
        Some(Placement {
            subject: self.subject(&a.subject_id)?,
            batch: self.batch(&a.batch_id)?,
            faculty: self.faculty(&a.faculty_id)?,
            room: self.room(&a.classroom_id)?,
            day,
            start: a.slot.period,
            duration,
            minutes: self.span_minutes(a.slot.period, duration),
        })
    }

    /// Converts a placement back to an owned assignment.
    pub fn assignment(&self, p: &Placement, session_index: u32) -> SessionAssignment {
        let problem = self.problem;
        SessionAssignment::new(
            problem.subjects[p.subject].id.clone(),
            problem.batches[p.batch].id.clone(),
            problem.faculty[p.faculty].id.clone(),
            problem.classrooms[p.room].id.clone(),
            TimeSlot::new(self.grid().days[p.day], p.start),
        )
        .with_duration(p.duration as u32)
        .with_session_index(session_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classroom, Day, Facility, Faculty, Subject};
    use crate::test_utils::department_problem;

    #[test]
    fn test_id_lookup_and_resolve() {
        let problem = department_problem();
        let index = ProblemIndex::new(&problem);
        assert_eq!(index.days, 5);
        assert_eq!(index.periods, 6);
        assert!(index.room("R101").is_some());
        assert!(index.faculty("nobody").is_none());

        let a = SessionAssignment::new("DS", "CSE-A", "F-ANU", "R101", TimeSlot::new(Day::Tuesday, 0))
            .with_duration(2);
        let p = index.resolve(&a).unwrap();
        assert_eq!(p.day, 1);
        assert_eq!(p.minutes, 120);
        assert_eq!(p.cells(index.periods), 6..8);
        assert_eq!(index.assignment(&p, 0), a);

        let off = SessionAssignment::new("DS", "CSE-A", "F-ANU", "R101", TimeSlot::new(Day::Monday, 5))
            .with_duration(2);
        assert!(index.resolve(&off).is_none());
    }

    #[test]
    fn test_valid_starts_skip_breaks() {
        let problem = department_problem();
        let index = ProblemIndex::new(&problem);
        // 5 teaching periods per day
        assert_eq!(index.valid_starts(1).len(), 25);
        // Two-period starts: 09, 10, 14 on each day
        assert_eq!(index.valid_starts(2).len(), 15);
        assert!(!index.is_assignable(3));
        assert!(index.joins_previous(1));
        assert!(!index.joins_previous(4));
    }

    #[test]
    fn test_eligibility() {
        let problem = TimetableProblem::new()
            .with_classroom(Classroom::lecture_hall("R1", 60))
            .with_classroom(Classroom::lecture_hall("R2", 20))
            .with_classroom(Classroom::laboratory("L1", 60).with_facility(Facility::Projector))
            .with_faculty(Faculty::new("F1", 6, 20).with_subject("S"))
            .with_faculty(Faculty::new("F2", 6, 20).with_subject("S"))
            .with_faculty(Faculty::new("F3", 6, 20))
            .with_subject(Subject::theory("S", 2).with_faculty(vec!["F2".into()]))
            .with_subject(Subject::practical("P", 1).with_facility(Facility::Projector))
            .with_batch(crate::models::Batch::new("B", 40).with_subject("S"));
        let index = ProblemIndex::new(&problem);
        let s = index.subject("S").unwrap();
        let p = index.subject("P").unwrap();
        let b = index.batch("B").unwrap();

        assert_eq!(index.eligible_faculty(s), vec![1]);
        assert!(index.eligible_faculty(p).is_empty());
        // R2 too small, L1 wrong type
        assert_eq!(index.eligible_rooms(s, b), vec![0]);
        assert_eq!(index.eligible_rooms(p, b), vec![2]);
    }

    #[test]
    fn test_availability_tables() {
        let problem = TimetableProblem::new().with_faculty(
            Faculty::new("F1", 6, 20)
                .with_availability([TimeSlot::new(Day::Monday, 0)])
                .with_preferred([TimeSlot::new(Day::Monday, 1)]),
        );
        let index = ProblemIndex::new(&problem);
        assert!(index.is_open(0, 0));
        assert!(!index.is_open(0, 1));
        assert!(index.is_disliked(0, 0));
        assert!(!index.is_disliked(0, 1));
    }
}
