//! Run-local occupancy ledger.
//!
//! Tracks which room, faculty and batch cells are taken, the teaching
//! minutes each faculty member has accumulated per day and week, and the
//! aggregates the soft components need. Placing and removing a placement is
//! O(duration); admission and soft deltas are O(periods).

use std::collections::HashMap;
use std::ops::Range;

use super::index::{Placement, ProblemIndex};
use super::soft::{excess_hours, std_dev, SoftPenalty, SoftWeights};

#[derive(Debug, Clone)]
pub(crate) struct Occupancy {
    days: usize,
    periods: usize,
    room_busy: Vec<bool>,
    faculty_busy: Vec<bool>,
    batch_busy: Vec<bool>,
    /// Faculty × day.
    faculty_day_minutes: Vec<u32>,
    faculty_week_minutes: Vec<u32>,
    /// Batch × day.
    batch_day_sessions: Vec<u32>,
    room_load: Vec<u64>,
    load_sum: u64,
    load_sq_sum: u64,
    /// (subject, batch, day) → sessions.
    subject_days: HashMap<(usize, usize, usize), u32>,
    preference_misses: u32,
}

impl Occupancy {
    pub fn new(index: &ProblemIndex<'_>) -> Self {
        let problem = index.problem;
        let cells = index.cells();
        Self {
            days: index.days,
            periods: index.periods,
            room_busy: vec![false; problem.classrooms.len() * cells],
            faculty_busy: vec![false; problem.faculty.len() * cells],
            batch_busy: vec![false; problem.batches.len() * cells],
            faculty_day_minutes: vec![0; problem.faculty.len() * index.days],
            faculty_week_minutes: vec![0; problem.faculty.len()],
            batch_day_sessions: vec![0; problem.batches.len() * index.days],
            room_load: vec![0; problem.classrooms.len()],
            load_sum: 0,
            load_sq_sum: 0,
            subject_days: HashMap::new(),
            preference_misses: 0,
        }
    }

    #[inline]
    fn cells(&self) -> usize {
        self.days * self.periods
    }

    #[inline]
    fn batch_cell(&self, batch: usize, day: usize, period: usize) -> bool {
        self.batch_busy[batch * self.cells() + day * self.periods + period]
    }

    #[inline]
    fn faculty_cell(&self, faculty: usize, day: usize, period: usize) -> bool {
        self.faculty_busy[faculty * self.cells() + day * self.periods + period]
    }

    /// Whether a placement respects every hard constraint given what is
    /// already placed. Static eligibility (qualification, room fit, valid
    /// start) is the caller's job.
    pub fn admits(&self, index: &ProblemIndex<'_>, p: &Placement) -> bool {
        let cells = self.cells();
        for c in p.cells(self.periods) {
            if self.batch_busy[p.batch * cells + c]
                || self.faculty_busy[p.faculty * cells + c]
                || self.room_busy[p.room * cells + c]
                || !index.is_open(p.faculty, c)
            {
                return false;
            }
        }

        let member = &index.problem.faculty[p.faculty];
        let day_minutes = self.faculty_day_minutes[p.faculty * self.days + p.day];
        if day_minutes + p.minutes > member.max_minutes_per_day()
            || self.faculty_week_minutes[p.faculty] + p.minutes > member.max_minutes_per_week()
        {
            return false;
        }

        match index.problem.batches[p.batch].max_sessions_per_day {
            Some(max) => self.batch_day_sessions[p.batch * self.days + p.day] < max,
            None => true,
        }
    }

    pub fn place(&mut self, index: &ProblemIndex<'_>, p: &Placement) {
        self.mark(index, p, true);
        self.faculty_day_minutes[p.faculty * self.days + p.day] += p.minutes;
        self.faculty_week_minutes[p.faculty] += p.minutes;
        self.batch_day_sessions[p.batch * self.days + p.day] += 1;

        let d = p.duration as u64;
        let load = self.room_load[p.room];
        self.load_sum += d;
        self.load_sq_sum += 2 * load * d + d * d;
        self.room_load[p.room] = load + d;

        *self.subject_days.entry((p.subject, p.batch, p.day)).or_insert(0) += 1;
    }

    /// Undoes a previous `place` of the same placement.
    pub fn remove(&mut self, index: &ProblemIndex<'_>, p: &Placement) {
        self.mark(index, p, false);
        self.faculty_day_minutes[p.faculty * self.days + p.day] -= p.minutes;
        self.faculty_week_minutes[p.faculty] -= p.minutes;
        self.batch_day_sessions[p.batch * self.days + p.day] -= 1;

        let d = p.duration as u64;
        let load = self.room_load[p.room] - d;
        self.load_sum -= d;
        self.load_sq_sum -= 2 * load * d + d * d;
        self.room_load[p.room] = load;

        if let Some(k) = self.subject_days.get_mut(&(p.subject, p.batch, p.day)) {
            *k -= 1;
            if *k == 0 {
                self.subject_days.remove(&(p.subject, p.batch, p.day));
            }
        }
    }

    fn mark(&mut self, index: &ProblemIndex<'_>, p: &Placement, busy: bool) {
        let cells = self.cells();
        let mut misses = 0;
        for c in p.cells(self.periods) {
            self.room_busy[p.room * cells + c] = busy;
            self.faculty_busy[p.faculty * cells + c] = busy;
            self.batch_busy[p.batch * cells + c] = busy;
            if index.is_disliked(p.faculty, c) {
                misses += 1;
            }
        }
        if busy {
            self.preference_misses += misses;
        } else {
            self.preference_misses -= misses;
        }
    }

    /// Free assignable periods between a batch's first and last session of
    /// a day, counting `extra` periods as occupied.
    fn day_gaps(&self, index: &ProblemIndex<'_>, batch: usize, day: usize, extra: &Range<usize>) -> u32 {
        let busy = |p: usize| self.batch_cell(batch, day, p) || extra.contains(&p);
        let Some(first) = (0..self.periods).find(|&p| busy(p)) else {
            return 0;
        };
        let last = (0..self.periods).rev().find(|&p| busy(p)).unwrap_or(first);
        (first..=last)
            .filter(|&p| !busy(p) && index.is_assignable(day * self.periods + p))
            .count() as u32
    }

    /// Hours above `limit` across a faculty member's back-to-back runs on a
    /// day, counting `extra` periods as occupied.
    fn day_excess(
        &self,
        index: &ProblemIndex<'_>,
        faculty: usize,
        day: usize,
        extra: &Range<usize>,
        limit: u32,
    ) -> u32 {
        let mut excess = 0;
        let mut run = 0;
        for p in 0..self.periods {
            let busy = self.faculty_cell(faculty, day, p) || extra.contains(&p);
            if !busy {
                excess += excess_hours(run, limit);
                run = 0;
                continue;
            }
            if run > 0 && !index.joins_previous(p) {
                excess += excess_hours(run, limit);
                run = 0;
            }
            run += index.period_minutes(p);
        }
        excess + excess_hours(run, limit)
    }

    fn room_imbalance(&self) -> f64 {
        std_dev(
            self.load_sum as f64,
            self.load_sq_sum as f64,
            self.room_load.len(),
        )
    }

    /// Change in weighted soft penalty if `p` were placed.
    pub fn soft_delta(
        &self,
        index: &ProblemIndex<'_>,
        p: &Placement,
        weights: &SoftWeights,
        consecutive_limit: u32,
    ) -> f64 {
        let none = 0..0;
        let span = p.start..p.start + p.duration;

        let gaps = f64::from(self.day_gaps(index, p.batch, p.day, &span))
            - f64::from(self.day_gaps(index, p.batch, p.day, &none));

        let excess = f64::from(self.day_excess(index, p.faculty, p.day, &span, consecutive_limit))
            - f64::from(self.day_excess(index, p.faculty, p.day, &none, consecutive_limit));

        let d = p.duration as u64;
        let load = self.room_load[p.room];
        let imbalance = std_dev(
            (self.load_sum + d) as f64,
            (self.load_sq_sum + 2 * load * d + d * d) as f64,
            self.room_load.len(),
        ) - self.room_imbalance();

        let clustering = match self.subject_days.get(&(p.subject, p.batch, p.day)) {
            Some(&k) if k > 0 => 1.0,
            _ => 0.0,
        };

        let misses = p
            .cells(self.periods)
            .filter(|&c| index.is_disliked(p.faculty, c))
            .count() as f64;

        gaps * weights.gap
            + excess * weights.consecutive
            + imbalance * weights.room_balance
            + clustering * weights.clustering
            + misses * weights.preference
    }

    /// Soft penalty of everything placed.
    pub fn soft_totals(&self, index: &ProblemIndex<'_>, consecutive_limit: u32) -> SoftPenalty {
        let none = 0..0;
        let mut gaps = 0;
        for b in 0..index.problem.batches.len() {
            for d in 0..self.days {
                gaps += self.day_gaps(index, b, d, &none);
            }
        }
        let mut consecutive_excess = 0;
        for f in 0..index.problem.faculty.len() {
            for d in 0..self.days {
                consecutive_excess += self.day_excess(index, f, d, &none, consecutive_limit);
            }
        }
        SoftPenalty {
            gaps,
            consecutive_excess,
            room_imbalance: self.room_imbalance(),
            clustering: self.subject_days.values().map(|k| k.saturating_sub(1)).sum(),
            preference_misses: self.preference_misses,
        }
    }

    /// Occupied room-cells.
    pub fn room_cells(&self) -> u64 {
        self.load_sum
    }

    /// Teaching minutes assigned to a faculty member this week.
    pub fn week_minutes(&self, faculty: usize) -> u32 {
        self.faculty_week_minutes[faculty]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Batch, Classroom, Day, Faculty, SessionAssignment, Subject, TimeSlot, TimetableProblem};

    fn problem() -> TimetableProblem {
        TimetableProblem::new()
            .with_classroom(Classroom::lecture_hall("R1", 60))
            .with_classroom(Classroom::lecture_hall("R2", 60))
            .with_faculty(
                Faculty::new("F1", 3, 5)
                    .with_subject("S")
                    .with_preferred([TimeSlot::new(Day::Monday, 0)]),
            )
            .with_subject(Subject::theory("S", 5))
            .with_batch(Batch::new("B", 30).with_subject("S").with_max_sessions_per_day(3))
    }

    fn at(index: &ProblemIndex<'_>, room: &str, day: Day, period: usize) -> Placement {
        index
            .resolve(&SessionAssignment::new("S", "B", "F1", room, TimeSlot::new(day, period)))
            .unwrap()
    }

    #[test]
    fn test_place_blocks_cells() {
        let p = problem();
        let index = ProblemIndex::new(&p);
        let mut ledger = Occupancy::new(&index);
        let a = at(&index, "R1", Day::Monday, 0);
        assert!(ledger.admits(&index, &a));
        ledger.place(&index, &a);

        // Same batch and faculty, other room
        assert!(!ledger.admits(&index, &at(&index, "R2", Day::Monday, 0)));
        assert!(ledger.admits(&index, &at(&index, "R2", Day::Monday, 1)));

        ledger.remove(&index, &a);
        assert!(ledger.admits(&index, &at(&index, "R2", Day::Monday, 0)));
        assert_eq!(ledger.room_cells(), 0);
        assert_eq!(ledger.week_minutes(0), 0);
    }

    #[test]
    fn test_hour_caps() {
        let p = problem();
        let index = ProblemIndex::new(&p);
        let mut ledger = Occupancy::new(&index);
        for period in [0, 1, 2] {
            let a = at(&index, "R1", Day::Monday, period);
            assert!(ledger.admits(&index, &a));
            ledger.place(&index, &a);
        }
        // Daily cap of 3 hours reached
        assert!(!ledger.admits(&index, &at(&index, "R1", Day::Monday, 4)));

        ledger.place(&index, &at(&index, "R1", Day::Tuesday, 0));
        ledger.place(&index, &at(&index, "R1", Day::Tuesday, 1));
        // Weekly cap of 5 hours reached
        assert!(!ledger.admits(&index, &at(&index, "R1", Day::Wednesday, 0)));
        assert_eq!(ledger.week_minutes(0), 300);
    }

    #[test]
    fn test_soft_delta_matches_totals() {
        let p = problem();
        let index = ProblemIndex::new(&p);
        let weights = SoftWeights::default();
        let mut ledger = Occupancy::new(&index);
        let mut running = 0.0;
        for (day, period) in [(Day::Monday, 0), (Day::Monday, 2), (Day::Tuesday, 4), (Day::Monday, 1)] {
            let a = at(&index, "R1", day, period);
            running += ledger.soft_delta(&index, &a, &weights, 2);
            ledger.place(&index, &a);
            let total = ledger.soft_totals(&index, 2).weighted(&weights);
            assert!((running - total).abs() < 1e-9, "{running} vs {total}");
        }
        let totals = ledger.soft_totals(&index, 2);
        // Monday 0..3 closes the gap and runs 3h against a 2h limit
        assert_eq!(totals.gaps, 0);
        assert_eq!(totals.consecutive_excess, 1);
        assert_eq!(totals.clustering, 2);
        // Only Monday period 0 is preferred
        assert_eq!(totals.preference_misses, 3);
        // Loads 4 and 0
        assert!((totals.room_imbalance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_excludes_breaks() {
        let p = problem();
        let index = ProblemIndex::new(&p);
        let mut ledger = Occupancy::new(&index);
        // 11-12 and 14-15 with lunch between
        ledger.place(&index, &at(&index, "R1", Day::Friday, 2));
        ledger.place(&index, &at(&index, "R1", Day::Friday, 4));
        assert_eq!(ledger.soft_totals(&index, 3).gaps, 0);
    }
}
