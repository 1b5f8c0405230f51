//! Hard and soft constraint evaluation.
//!
//! # Hard Constraints
//! | Constraint | Conflict |
//! |------------|----------|
//! | One session per room, faculty member and batch per cell | `*DoubleBooked` |
//! | Room seats the batch | `RoomCapacityExceeded` |
//! | Room type, facilities and explicit room list | `RoomUnsuitable` |
//! | Faculty qualified and listed | `FacultyUnqualified` |
//! | Faculty availability | `FacultyUnavailable` |
//! | Faculty daily and weekly hour caps | `FacultyOverload` |
//! | Batch sessions per day | `BatchOverload` |
//! | No break, reserved or off-grid cells | `ReservedSlot` |
//!
//! # Soft Constraints
//! See [`SoftPenalty`]. Each component has a weight in [`SoftWeights`].
//!
//! Evaluation is pure: nothing here mutates its inputs.
//!
//! # Reference
//! Schaerf (1999), "A Survey of Automated Timetabling"

mod index;
mod ledger;
mod soft;

pub(crate) use index::{Placement, ProblemIndex};
pub(crate) use ledger::Occupancy;
pub use soft::{SoftPenalty, SoftWeights};

use std::collections::BTreeMap;

use crate::config::{EngineConfig, ScoringConfig};
use crate::models::{Candidate, Conflict, ConflictKind, SessionAssignment, TimetableProblem};

/// Evaluates assignments against one problem's constraints.
///
/// # Example
///
/// ```
/// use u_timetable::constraints::ConstraintChecker;
/// use u_timetable::models::*;
///
/// let problem = TimetableProblem::new()
///     .with_classroom(Classroom::lecture_hall("R1", 40))
///     .with_faculty(Faculty::new("F1", 6, 20).with_subject("DS"))
///     .with_subject(Subject::theory("DS", 2))
///     .with_batch(Batch::new("B1", 30).with_subject("DS"));
/// let checker = ConstraintChecker::new(&problem);
///
/// let first = SessionAssignment::new("DS", "B1", "F1", "R1", TimeSlot::new(Day::Monday, 0));
/// let clash = first.clone().with_session_index(1);
/// let conflicts = checker.violations(&[first], &clash);
/// assert!(conflicts.iter().any(|c| c.kind == ConflictKind::RoomDoubleBooked));
/// ```
pub struct ConstraintChecker<'a> {
    index: ProblemIndex<'a>,
    weights: SoftWeights,
    scoring: ScoringConfig,
}

impl<'a> ConstraintChecker<'a> {
    /// Creates a checker with default weights.
    pub fn new(problem: &'a TimetableProblem) -> Self {
        Self {
            index: ProblemIndex::new(problem),
            weights: SoftWeights::default(),
            scoring: ScoringConfig::default(),
        }
    }

    /// Creates a checker using the configured weights.
    pub fn from_config(problem: &'a TimetableProblem, config: &EngineConfig) -> Self {
        Self::new(problem)
            .with_weights(config.soft_weights.clone())
            .with_scoring(config.scoring.clone())
    }

    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn weights(&self) -> &SoftWeights {
        &self.weights
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub(crate) fn index(&self) -> &ProblemIndex<'a> {
        &self.index
    }

    /// Hard violations that adding `new` to `partial` would cause.
    ///
    /// `new` is reported as if appended, at index `partial.len()`. Conflicts
    /// already present among `partial` are not reported.
    pub fn violations(
        &self,
        partial: &[SessionAssignment],
        new: &SessionAssignment,
    ) -> Vec<Conflict> {
        let n = partial.len();
        let mut conflicts = self.static_conflicts(n, new);

        for (i, other) in partial.iter().enumerate() {
            if other.overlaps(new) {
                conflicts.extend(pair_conflicts(i, other, n, new));
            }
        }

        let problem = self.index.problem;
        let grid = self.index.grid();
        if let Some(member) = problem.faculty_member(&new.faculty_id) {
            let minutes = |a: &SessionAssignment| grid.span_minutes(a.periods());
            let mine: Vec<usize> = (0..n)
                .filter(|&i| partial[i].faculty_id == new.faculty_id)
                .collect();
            let same_day: Vec<usize> = mine
                .iter()
                .copied()
                .filter(|&i| partial[i].slot.day == new.slot.day)
                .collect();

            let day_total: u32 =
                same_day.iter().map(|&i| minutes(&partial[i])).sum::<u32>() + minutes(new);
            if day_total > member.max_minutes_per_day() {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::FacultyOverload,
                        format!(
                            "{} would teach {} on {} (max {}h per day)",
                            member.label(),
                            hours_text(day_total),
                            new.slot.day,
                            member.max_hours_per_day
                        ),
                    )
                    .with_assignments(with_new(same_day, n)),
                );
            }

            let week_total: u32 =
                mine.iter().map(|&i| minutes(&partial[i])).sum::<u32>() + minutes(new);
            if week_total > member.max_minutes_per_week() {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::FacultyOverload,
                        format!(
                            "{} would teach {} this week (max {}h per week)",
                            member.label(),
                            hours_text(week_total),
                            member.max_hours_per_week
                        ),
                    )
                    .with_assignments(with_new(mine, n)),
                );
            }
        }

        if let Some(max) = problem
            .batch(&new.batch_id)
            .and_then(|b| b.max_sessions_per_day)
        {
            let same_day: Vec<usize> = (0..n)
                .filter(|&i| partial[i].batch_id == new.batch_id && partial[i].slot.day == new.slot.day)
                .collect();
            if same_day.len() as u32 + 1 > max {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::BatchOverload,
                        format!(
                            "Batch {} would have {} sessions on {} (max {max})",
                            new.batch_id,
                            same_day.len() + 1,
                            new.slot.day
                        ),
                    )
                    .with_assignments(with_new(same_day, n)),
                );
            }
        }

        conflicts
    }

    /// Whether `new` can join `partial` without any hard violation.
    pub fn is_feasible(&self, partial: &[SessionAssignment], new: &SessionAssignment) -> bool {
        self.violations(partial, new).is_empty()
    }

    /// Every hard violation in a complete assignment set.
    ///
    /// Order: per-assignment checks, then pairwise double bookings, then
    /// faculty and batch aggregates.
    pub fn hard_violations(&self, assignments: &[SessionAssignment]) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for (i, a) in assignments.iter().enumerate() {
            conflicts.extend(self.static_conflicts(i, a));
        }

        for i in 0..assignments.len() {
            for j in i + 1..assignments.len() {
                let (a, b) = (&assignments[i], &assignments[j]);
                if a.overlaps(b) {
                    conflicts.extend(pair_conflicts(i, a, j, b));
                }
            }
        }

        let problem = self.index.problem;
        let grid = self.index.grid();
        let mut faculty_days: BTreeMap<(&str, usize), (u32, Vec<usize>)> = BTreeMap::new();
        let mut faculty_weeks: BTreeMap<&str, (u32, Vec<usize>)> = BTreeMap::new();
        let mut batch_days: BTreeMap<(&str, usize), Vec<usize>> = BTreeMap::new();
        for (i, a) in assignments.iter().enumerate() {
            let Some(day) = grid.day_position(a.slot.day) else {
                continue;
            };
            let minutes = grid.span_minutes(a.periods());
            let entry = faculty_days.entry((a.faculty_id.as_str(), day)).or_default();
            entry.0 += minutes;
            entry.1.push(i);
            let entry = faculty_weeks.entry(a.faculty_id.as_str()).or_default();
            entry.0 += minutes;
            entry.1.push(i);
            batch_days.entry((a.batch_id.as_str(), day)).or_default().push(i);
        }

        for ((fid, day), (minutes, indices)) in faculty_days {
            let Some(member) = problem.faculty_member(fid) else {
                continue;
            };
            if minutes > member.max_minutes_per_day() {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::FacultyOverload,
                        format!(
                            "{} teaches {} on {} (max {}h per day)",
                            member.label(),
                            hours_text(minutes),
                            grid.days[day],
                            member.max_hours_per_day
                        ),
                    )
                    .with_assignments(indices),
                );
            }
        }
        for (fid, (minutes, indices)) in faculty_weeks {
            let Some(member) = problem.faculty_member(fid) else {
                continue;
            };
            if minutes > member.max_minutes_per_week() {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::FacultyOverload,
                        format!(
                            "{} teaches {} this week (max {}h per week)",
                            member.label(),
                            hours_text(minutes),
                            member.max_hours_per_week
                        ),
                    )
                    .with_assignments(indices),
                );
            }
        }
        for ((bid, day), indices) in batch_days {
            let Some(max) = problem.batch(bid).and_then(|b| b.max_sessions_per_day) else {
                continue;
            };
            if indices.len() as u32 > max {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::BatchOverload,
                        format!(
                            "Batch {bid} has {} sessions on {} (max {max})",
                            indices.len(),
                            grid.days[day]
                        ),
                    )
                    .with_assignments(indices),
                );
            }
        }

        conflicts
    }

    /// Checks that involve one assignment only. Checks needing an entity
    /// the problem doesn't define are skipped.
    fn static_conflicts(&self, i: usize, a: &SessionAssignment) -> Vec<Conflict> {
        let problem = self.index.problem;
        let grid = self.index.grid();
        let mut conflicts = Vec::new();
        let subject = problem.subject(&a.subject_id);
        let what = subject.map_or(a.subject_id.as_str(), |s| s.label());

        if grid.session_span(a.slot, a.duration as usize).is_none() {
            conflicts.push(
                Conflict::new(
                    ConflictKind::ReservedSlot,
                    format!(
                        "{what} for batch {} at {} covers a break, reserved or off-grid cell",
                        a.batch_id, a.slot
                    ),
                )
                .with_assignments(vec![i]),
            );
        }

        if let Some(room) = problem.classroom(&a.classroom_id) {
            if let Some(batch) = problem.batch(&a.batch_id) {
                if !room.seats(batch.size) {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::RoomCapacityExceeded,
                            format!(
                                "{} seats {} but batch {} has {} students",
                                room.label(),
                                room.capacity,
                                batch.id,
                                batch.size
                            ),
                        )
                        .with_assignments(vec![i]),
                    );
                }
            }
            if let (Some(r), Some(s)) = (self.index.room(&room.id), self.index.subject(&a.subject_id)) {
                if !self.index.room_suits(r, s) {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::RoomUnsuitable,
                            format!("{} is not suitable for {what}", room.label()),
                        )
                        .with_assignments(vec![i]),
                    );
                }
            }
        }

        if let Some(member) = problem.faculty_member(&a.faculty_id) {
            if let (Some(f), Some(s)) = (self.index.faculty(&member.id), self.index.subject(&a.subject_id)) {
                if !self.index.faculty_eligible(f, s) {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::FacultyUnqualified,
                            format!("{} is not assigned to teach {what}", member.label()),
                        )
                        .with_assignments(vec![i]),
                    );
                }
            }
            let unavailable = a
                .slots()
                .take_while(|s| s.period < grid.period_count())
                .find(|s| !member.is_available(*s));
            if let Some(slot) = unavailable {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::FacultyUnavailable,
                        format!("{} is not available at {slot}", member.label()),
                    )
                    .with_assignments(vec![i]),
                );
            }
        }

        conflicts
    }

    /// Soft penalty breakdown. Assignments with unknown references or
    /// off-grid cells are left out.
    pub fn soft_breakdown(&self, assignments: &[SessionAssignment]) -> SoftPenalty {
        self.ledger_of(assignments)
            .soft_totals(&self.index, self.scoring.max_consecutive_hours)
    }

    /// Weighted soft penalty.
    pub fn penalty(&self, assignments: &[SessionAssignment]) -> f64 {
        self.soft_breakdown(assignments).weighted(&self.weights)
    }

    /// Assigned room-cells over assignable room-cells.
    pub fn room_utilization(&self, assignments: &[SessionAssignment]) -> f64 {
        let available = self.index.grid().assignable_cell_count() * self.index.problem.classrooms.len();
        if available == 0 {
            return 0.0;
        }
        let used: usize = assignments
            .iter()
            .filter(|a| self.index.room(&a.classroom_id).is_some())
            .map(|a| a.duration as usize)
            .sum();
        (used as f64 / available as f64).min(1.0)
    }

    /// Refreshes a candidate's soft breakdown, score and utilization from
    /// its assignments and current conflict list.
    pub fn evaluate(&self, candidate: &mut Candidate) {
        candidate.soft = self.soft_breakdown(&candidate.assignments);
        candidate.soft_penalty = candidate.soft.weighted(&self.weights);
        candidate.score = self
            .scoring
            .score(candidate.conflict_count(), candidate.soft_penalty);
        candidate.room_utilization = self.room_utilization(&candidate.assignments);
    }

    fn ledger_of(&self, assignments: &[SessionAssignment]) -> Occupancy {
        let mut ledger = Occupancy::new(&self.index);
        for p in assignments.iter().filter_map(|a| self.index.resolve(a)) {
            ledger.place(&self.index, &p);
        }
        ledger
    }
}

fn pair_conflicts(
    i: usize,
    a: &SessionAssignment,
    j: usize,
    b: &SessionAssignment,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let day = a.slot.day;
    if a.classroom_id == b.classroom_id {
        conflicts.push(
            Conflict::new(
                ConflictKind::RoomDoubleBooked,
                format!(
                    "Room {} is double-booked on {day} ({} and {})",
                    a.classroom_id, a.subject_id, b.subject_id
                ),
            )
            .with_assignments(vec![i, j]),
        );
    }
    if a.faculty_id == b.faculty_id {
        conflicts.push(
            Conflict::new(
                ConflictKind::FacultyDoubleBooked,
                format!(
                    "{} is assigned to {} and {} at the same time on {day}",
                    a.faculty_id, a.subject_id, b.subject_id
                ),
            )
            .with_assignments(vec![i, j]),
        );
    }
    if a.batch_id == b.batch_id {
        conflicts.push(
            Conflict::new(
                ConflictKind::BatchDoubleBooked,
                format!(
                    "Batch {} has {} and {} at the same time on {day}",
                    a.batch_id, a.subject_id, b.subject_id
                ),
            )
            .with_assignments(vec![i, j]),
        );
    }
    conflicts
}

fn with_new(mut indices: Vec<usize>, n: usize) -> Vec<usize> {
    indices.push(n);
    indices
}

fn hours_text(minutes: u32) -> String {
    if minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{:.1}h", f64::from(minutes) / 60.0)
    }
}
