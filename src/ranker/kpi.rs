//! Timetable quality metrics (KPIs).
//!
//! Summarizes a candidate the way a review screen shows it.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Efficiency | Candidate score (0..100) |
//! | Room Utilization | Occupied room-cells / assignable room-cells |
//! | Per-Room Utilization | Occupied cells / assignable cells, per room |
//! | Faculty Load | Weekly teaching hours / weekly cap, per faculty member |
//! | Placement Rate | Placed sessions / required sessions |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Candidate, TimetableProblem};

/// Weekly load of one faculty member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyLoad {
    pub hours: f64,
    pub max_hours: u32,
    /// `hours / max_hours` (0.0 when the cap is zero).
    pub ratio: f64,
}

/// Timetable performance indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableKpi {
    /// Candidate score (0..100).
    pub efficiency: f64,
    /// Fraction of room-cells occupied (0.0..1.0).
    pub room_utilization: f64,
    /// Per-room utilization.
    pub utilization_by_room: HashMap<String, f64>,
    /// Per-faculty weekly load.
    pub faculty_load: HashMap<String, FacultyLoad>,
    /// Mean faculty load ratio.
    pub avg_faculty_load: f64,
    /// Fraction of required sessions placed (0.0..1.0).
    pub placement_rate: f64,
    pub conflict_count: usize,
    pub unplaced_count: usize,
}

impl TimetableKpi {
    /// Computes KPIs from a candidate and the problem it was built for.
    pub fn calculate(candidate: &Candidate, problem: &TimetableProblem) -> Self {
        let grid = &problem.grid;
        let assignable = grid.assignable_cell_count();

        let mut room_cells: HashMap<&str, usize> = HashMap::new();
        let mut faculty_minutes: HashMap<&str, u32> = HashMap::new();
        for a in &candidate.assignments {
            *room_cells.entry(a.classroom_id.as_str()).or_default() += a.duration as usize;
            *faculty_minutes.entry(a.faculty_id.as_str()).or_default() += grid.span_minutes(a.periods());
        }

        let utilization_by_room = problem
            .classrooms
            .iter()
            .map(|room| {
                let used = room_cells.get(room.id.as_str()).copied().unwrap_or(0);
                let util = if assignable == 0 {
                    0.0
                } else {
                    (used as f64 / assignable as f64).min(1.0)
                };
                (room.id.clone(), util)
            })
            .collect();

        let faculty_load: HashMap<String, FacultyLoad> = problem
            .faculty
            .iter()
            .map(|member| {
                let minutes = faculty_minutes.get(member.id.as_str()).copied().unwrap_or(0);
                let hours = f64::from(minutes) / 60.0;
                let ratio = if member.max_hours_per_week == 0 {
                    0.0
                } else {
                    hours / f64::from(member.max_hours_per_week)
                };
                (
                    member.id.clone(),
                    FacultyLoad {
                        hours,
                        max_hours: member.max_hours_per_week,
                        ratio,
                    },
                )
            })
            .collect();
        let avg_faculty_load = if faculty_load.is_empty() {
            0.0
        } else {
            faculty_load.values().map(|l| l.ratio).sum::<f64>() / faculty_load.len() as f64
        };

        let unplaced_count = candidate.unplaced().count();
        let required = candidate.assignments.len() + unplaced_count;
        let placement_rate = if required == 0 {
            1.0
        } else {
            candidate.assignments.len() as f64 / required as f64
        };

        Self {
            efficiency: candidate.score,
            room_utilization: candidate.room_utilization,
            utilization_by_room,
            faculty_load,
            avg_faculty_load,
            placement_rate,
            conflict_count: candidate.conflict_count(),
            unplaced_count,
        }
    }

    /// Whether the candidate meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_efficiency: f64, min_placement_rate: f64) -> bool {
        self.efficiency >= min_efficiency && self.placement_rate >= min_placement_rate
    }

    /// Faculty members above `ratio` of their weekly cap, most loaded first.
    pub fn overloaded_faculty(&self, ratio: f64) -> Vec<(&str, f64)> {
        let mut loaded: Vec<(&str, f64)> = self
            .faculty_load
            .iter()
            .filter(|(_, l)| l.ratio > ratio)
            .map(|(id, l)| (id.as_str(), l.ratio))
            .collect();
        loaded.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
        loaded
    }
}
