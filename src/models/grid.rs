//! Weekly slot grid.
//!
//! The grid is the fixed set of (day, period) cells a timetable is laid out
//! on. Each period has a start and end minute and a kind; break periods and
//! explicitly reserved cells are never assignable.
//!
//! # Time Model
//! Times are minutes after midnight. A session spanning several periods must
//! occupy periods that are consecutive both by index and in time
//! (`periods[k].end_minute == periods[k + 1].start_minute`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// Monday through Friday.
    pub const WEEKDAYS: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    /// English day name.
    pub fn name(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a period can hold sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodKind {
    #[default]
    Teaching,
    /// Reserved on every day (e.g., lunch).
    Break,
}

/// One row of the daily grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Display label (e.g., "LUNCH BREAK"). Empty = derived from times.
    #[serde(default)]
    pub label: String,
    /// Start minute after midnight (inclusive).
    pub start_minute: u16,
    /// End minute after midnight (exclusive).
    pub end_minute: u16,
    #[serde(default)]
    pub kind: PeriodKind,
}

impl Period {
    /// Creates a teaching period.
    pub fn teaching(start_minute: u16, end_minute: u16) -> Self {
        Self {
            label: String::new(),
            start_minute,
            end_minute,
            kind: PeriodKind::Teaching,
        }
    }

    /// Creates a break period.
    pub fn break_period(label: impl Into<String>, start_minute: u16, end_minute: u16) -> Self {
        Self {
            label: label.into(),
            start_minute,
            end_minute,
            kind: PeriodKind::Break,
        }
    }

    /// Creates a teaching period from whole hours.
    pub fn hours(start_hour: u16, end_hour: u16) -> Self {
        Self::teaching(start_hour.saturating_mul(60), end_hour.saturating_mul(60))
    }

    #[inline]
    pub fn duration_minutes(&self) -> u32 {
        u32::from(self.end_minute.saturating_sub(self.start_minute))
    }

    #[inline]
    pub fn is_break(&self) -> bool {
        self.kind == PeriodKind::Break
    }

    /// Label for display: the explicit label, or "HH:MM-HH:MM".
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            format!(
                "{}-{}",
                format_minute(self.start_minute),
                format_minute(self.end_minute)
            )
        } else {
            self.label.clone()
        }
    }
}

/// A (day, period) cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: Day,
    /// Period index into [`SlotGrid::periods`].
    pub period: usize,
}

impl TimeSlot {
    pub fn new(day: Day, period: usize) -> Self {
        Self { day, period }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} period {}", self.day, self.period.saturating_add(1))
    }
}

/// The fixed weekly grid.
///
/// Cells are indexed row-major by day: `day_position * period_count + period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotGrid {
    /// Teaching days in display order.
    pub days: Vec<Day>,
    /// Daily periods in time order.
    pub periods: Vec<Period>,
    /// Extra non-assignable cells (assemblies, holidays).
    #[serde(default)]
    pub reserved: BTreeSet<TimeSlot>,
}

impl SlotGrid {
    pub fn new(days: Vec<Day>, periods: Vec<Period>) -> Self {
        Self {
            days,
            periods,
            reserved: BTreeSet::new(),
        }
    }

    /// Monday to Friday, 09:00-16:00 in one-hour periods with a
    /// 12:00-13:00 lunch break and no 13:00-14:00 period.
    pub fn weekly_default() -> Self {
        Self::new(
            Day::WEEKDAYS.to_vec(),
            vec![
                Period::hours(9, 10),
                Period::hours(10, 11),
                Period::hours(11, 12),
                Period::break_period("LUNCH BREAK", 12 * 60, 13 * 60),
                Period::hours(14, 15),
                Period::hours(15, 16),
            ],
        )
    }

    /// Reserves a cell.
    pub fn with_reserved(mut self, slot: TimeSlot) -> Self {
        self.reserved.insert(slot);
        self
    }

    #[inline]
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    #[inline]
    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.days.len() * self.periods.len()
    }

    /// Position of a day within the grid.
    pub fn day_position(&self, day: Day) -> Option<usize> {
        self.days.iter().position(|d| *d == day)
    }

    /// Whether the slot lies on the grid (ignores breaks).
    pub fn contains(&self, slot: TimeSlot) -> bool {
        slot.period < self.periods.len() && self.day_position(slot.day).is_some()
    }

    /// Flat cell index of a slot.
    pub fn cell_index(&self, slot: TimeSlot) -> Option<usize> {
        if slot.period >= self.periods.len() {
            return None;
        }
        self.day_position(slot.day)
            .map(|d| d * self.periods.len() + slot.period)
    }

    /// Slot at a flat cell index.
    pub fn slot_at(&self, cell: usize) -> Option<TimeSlot> {
        let periods = self.periods.len();
        if periods == 0 {
            return None;
        }
        self.days
            .get(cell / periods)
            .map(|&day| TimeSlot::new(day, cell % periods))
    }

    /// Whether a session may occupy this cell.
    pub fn is_assignable(&self, slot: TimeSlot) -> bool {
        self.contains(slot) && !self.periods[slot.period].is_break() && !self.reserved.contains(&slot)
    }

    /// Number of assignable cells in the week.
    pub fn assignable_cell_count(&self) -> usize {
        self.slots().filter(|s| self.is_assignable(*s)).count()
    }

    /// All cells in row-major order.
    pub fn slots(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.days.iter().flat_map(move |&day| {
            (0..self.periods.len()).map(move |period| TimeSlot::new(day, period))
        })
    }

    /// Periods occupied by a session of `duration` periods starting at `start`.
    ///
    /// Returns `None` if any covered cell is unassignable, the span runs past
    /// the end of the day, or two covered periods are not back to back.
    pub fn session_span(&self, start: TimeSlot, duration: usize) -> Option<Range<usize>> {
        if duration == 0 {
            return None;
        }
        let end = start.period.checked_add(duration)?;
        if end > self.periods.len() {
            return None;
        }
        for p in start.period..end {
            if !self.is_assignable(TimeSlot::new(start.day, p)) {
                return None;
            }
            if p + 1 < end && self.periods[p].end_minute != self.periods[p + 1].start_minute {
                return None;
            }
        }
        Some(start.period..end)
    }

    /// Total teaching minutes in a period range.
    pub fn span_minutes(&self, span: Range<usize>) -> u32 {
        self.periods
            .get(span)
            .map_or(0, |ps| ps.iter().map(Period::duration_minutes).sum())
    }

    /// Start and end minute of a slot.
    pub fn bounds(&self, slot: TimeSlot) -> Option<(u16, u16)> {
        self.periods
            .get(slot.period)
            .map(|p| (p.start_minute, p.end_minute))
    }
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self::weekly_default()
    }
}

/// Formats minutes after midnight as "HH:MM".
pub fn format_minute(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
